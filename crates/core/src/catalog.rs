//! Product catalog: categories, product records, availability and search.
//!
//! Categories are a closed set. Writes go through [`Category::parse`], which
//! accepts any casing and yields the lowercase slug that is persisted. Reads
//! compare the stored slug against the raw query case-insensitively
//! ([`in_category`]), so a category nobody stocks is just an empty listing.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Error returned for a category outside the supported set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Electronic,
    Jackets,
    Vests,
    Pants,
    Hoodies,
    Shoes,
    Sweater,
    Trackies,
    Jerseys,
    TShirts,
    Shorts,
    Bags,
    Hats,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Self; 13] = [
        Self::Electronic,
        Self::Jackets,
        Self::Vests,
        Self::Pants,
        Self::Hoodies,
        Self::Shoes,
        Self::Sweater,
        Self::Trackies,
        Self::Jerseys,
        Self::TShirts,
        Self::Shorts,
        Self::Bags,
        Self::Hats,
    ];

    /// Parse a category, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError`] if the input names no known category.
    pub fn parse(s: &str) -> Result<Self, CategoryError> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CategoryError(wanted.to_owned()))
    }

    /// Lowercase slug used in storage and URLs.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Electronic => "electronic",
            Self::Jackets => "jackets",
            Self::Vests => "vests",
            Self::Pants => "pants",
            Self::Hoodies => "hoodies",
            Self::Shoes => "shoes",
            Self::Sweater => "sweater",
            Self::Trackies => "trackies",
            Self::Jerseys => "jerseys",
            Self::TShirts => "t-shirts",
            Self::Shorts => "shorts",
            Self::Bags => "bags",
            Self::Hats => "hats",
        }
    }

    /// Human-readable label for menus.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electronic => "Electronic",
            Self::Jackets => "Jackets",
            Self::Vests => "Vests",
            Self::Pants => "Pants",
            Self::Hoodies => "Hoodies",
            Self::Shoes => "Shoes",
            Self::Sweater => "Sweater",
            Self::Trackies => "Trackies",
            Self::Jerseys => "Jerseys",
            Self::TShirts => "T-Shirts",
            Self::Shorts => "Shorts",
            Self::Bags => "Bags",
            Self::Hats => "Hats",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Category {
    type Error = CategoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.slug().to_owned()
    }
}

/// A catalog product.
///
/// `category` is kept as the stored text rather than [`Category`] so rows
/// written before the category set existed still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub stock: u32,
}

impl Product {
    /// Whether the product can be bought at all.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock > 0
    }

    /// Clamp a requested quantity into what can be bought.
    #[must_use]
    pub const fn clamp_quantity(&self, requested: u32) -> QuantityCheck {
        if self.stock == 0 {
            return QuantityCheck::Unavailable;
        }
        let granted = if requested == 0 {
            1
        } else if requested > self.stock {
            self.stock
        } else {
            requested
        };
        QuantityCheck::Available {
            requested,
            granted,
        }
    }

    /// Check a requested quantity without adjusting it.
    ///
    /// # Errors
    ///
    /// Returns [`StockError`] when the product is out of stock, the quantity
    /// is zero, or the quantity exceeds the stock.
    pub const fn check_quantity(&self, requested: u32) -> Result<u32, StockError> {
        if self.stock == 0 {
            return Err(StockError::OutOfStock);
        }
        if requested == 0 {
            return Err(StockError::ZeroQuantity);
        }
        if requested > self.stock {
            return Err(StockError::Exceeds {
                requested,
                stock: self.stock,
            });
        }
        Ok(requested)
    }
}

/// Result of clamping a requested quantity against stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuantityCheck {
    /// Stock is zero; nothing can be bought.
    Unavailable,
    /// `granted` is the requested quantity clamped into `1..=stock`.
    Available { requested: u32, granted: u32 },
}

impl QuantityCheck {
    /// Whether the requested quantity had to be adjusted.
    #[must_use]
    pub const fn was_clamped(&self) -> bool {
        match self {
            Self::Unavailable => true,
            Self::Available { requested, granted } => *requested != *granted,
        }
    }
}

/// Strict quantity validation failures.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockError {
    #[error("product is out of stock")]
    OutOfStock,
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("only {stock} in stock, {requested} requested")]
    Exceeds { requested: u32, stock: u32 },
}

/// Whether a product's stored category equals `category`, ignoring case.
#[must_use]
pub fn in_category(product: &Product, category: &str) -> bool {
    product.category.to_lowercase() == category.trim().to_lowercase()
}

/// Whether a product's name or category contains `query`, ignoring case.
///
/// An empty (or whitespace-only) query matches nothing.
#[must_use]
pub fn matches_query(product: &Product, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    product.name.to_lowercase().contains(&needle)
        || product.category.to_lowercase().contains(&needle)
}

/// Filter a product list down to search hits, preserving order.
#[must_use]
pub fn search<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    products.iter().filter(|p| matches_query(p, query)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use rust_decimal::Decimal;

    use super::*;

    pub(crate) fn product(id: &str, name: &str, category: &str, stock: u32) -> Product {
        Product {
            id: ProductId::parse(id).unwrap(),
            name: name.to_owned(),
            price: Price::new(Decimal::new(2500, 2)).unwrap(),
            description: String::new(),
            image_url: String::new(),
            category: category.to_owned(),
            stock,
        }
    }

    #[test]
    fn category_parse_ignores_case() {
        assert_eq!(Category::parse("T-Shirts").unwrap(), Category::TShirts);
        assert_eq!(Category::parse(" HOODIES ").unwrap(), Category::Hoodies);
        assert_eq!(
            Category::parse("socks"),
            Err(CategoryError("socks".to_owned()))
        );
    }

    #[test]
    fn category_serializes_as_slug() {
        assert_eq!(
            serde_json::to_string(&Category::TShirts).unwrap(),
            "\"t-shirts\""
        );
        let parsed: Category = serde_json::from_str("\"Bags\"").unwrap();
        assert_eq!(parsed, Category::Bags);
    }

    #[test]
    fn every_slug_parses_back() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.slug()).unwrap(), category);
            assert_eq!(Category::parse(category.label()).unwrap(), category);
        }
    }

    #[test]
    fn category_filter_is_exact_and_case_insensitive() {
        let products = [
            product("a", "Air Max", "shoes", 3),
            product("b", "Runner", "Shoes", 1),
            product("c", "Shoe Bag", "bags", 2),
        ];
        for query in ["shoes", "SHOES", "Shoes"] {
            let hits: Vec<_> = products
                .iter()
                .filter(|p| in_category(p, query))
                .map(|p| p.id.as_str())
                .collect();
            assert_eq!(hits, ["a", "b"]);
        }
        assert!(!products.iter().any(|p| in_category(p, "shoe")));
    }

    #[test]
    fn search_matches_name_or_category_substring() {
        let products = [
            product("a", "Black Hoodie", "hoodies", 3),
            product("b", "Cap", "hats", 1),
            product("c", "Zip Jacket", "jackets", 0),
        ];
        let ids = |q: &str| -> Vec<&str> { search(&products, q).iter().map(|p| p.id.as_str()).collect() };
        assert_eq!(ids("HOOD"), ["a"]);
        assert_eq!(ids("hat"), ["b"]);
        assert_eq!(ids("ja"), ["c"]);
        assert!(ids("   ").is_empty());
    }

    #[test]
    fn zero_stock_is_unavailable_for_any_quantity() {
        let p = product("x", "Vest", "vests", 0);
        assert!(!p.is_available());
        for qty in [0, 1, 5, u32::MAX] {
            assert_eq!(p.clamp_quantity(qty), QuantityCheck::Unavailable);
            assert_eq!(p.check_quantity(qty), Err(StockError::OutOfStock));
        }
    }

    #[test]
    fn quantity_above_stock_is_clamped_or_rejected() {
        let p = product("x", "Vest", "vests", 4);
        assert_eq!(
            p.clamp_quantity(9),
            QuantityCheck::Available {
                requested: 9,
                granted: 4
            }
        );
        assert!(p.clamp_quantity(9).was_clamped());
        assert!(!p.clamp_quantity(2).was_clamped());
        assert_eq!(
            p.check_quantity(9),
            Err(StockError::Exceeds {
                requested: 9,
                stock: 4
            })
        );
        assert_eq!(p.check_quantity(4), Ok(4));
        assert_eq!(p.check_quantity(0), Err(StockError::ZeroQuantity));
    }
}
