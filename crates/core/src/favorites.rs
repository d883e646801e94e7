//! Favorite products.
//!
//! Storage keeps favorites as `(user_id, product_id)` pairs, so membership is
//! a set. [`FavoriteSet`] mirrors those semantics in memory: it keeps
//! insertion order for display but never holds the same product twice.

use serde::Serialize;

use crate::catalog::Product;
use crate::types::ProductId;

/// Outcome of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Added,
    Removed,
}

impl Toggle {
    /// Whether the product is a favorite after the toggle.
    #[must_use]
    pub const fn is_favorite(self) -> bool {
        matches!(self, Self::Added)
    }
}

/// A user's favorites in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FavoriteSet(Vec<ProductId>);

impl FavoriteSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Remove `id` if present, otherwise append it.
    pub fn toggle(&mut self, id: ProductId) -> Toggle {
        if let Some(pos) = self.0.iter().position(|existing| *existing == id) {
            self.0.remove(pos);
            Toggle::Removed
        } else {
            self.0.push(id);
            Toggle::Added
        }
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.0.contains(id)
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve ids against a product list, in favorite order.
    ///
    /// Ids whose product no longer exists are skipped.
    #[must_use]
    pub fn resolve<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        self.0
            .iter()
            .filter_map(|id| products.iter().find(|p| p.id == *id))
            .collect()
    }
}

impl FromIterator<ProductId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = ProductId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            if !set.contains(&id) {
                set.0.push(id);
            }
        }
        set
    }
}
