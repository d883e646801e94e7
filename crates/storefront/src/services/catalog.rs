//! Catalog snapshot cache.
//!
//! Search runs in memory over the full product list. The list is loaded once
//! and cached with `moka` (5-minute TTL); product writes invalidate it.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

use vitrine_core::catalog::{self, Product};

use crate::db::{ProductRepository, RepositoryError};

/// Default number of search results returned.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Largest `limit` a caller may ask for.
pub const MAX_SEARCH_LIMIT: usize = 200;

const SNAPSHOT_TTL: Duration = Duration::from_secs(300);

/// Search hits, bounded by a limit, with the full match count.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub total: usize,
    pub products: Vec<Product>,
}

/// Clamp a requested limit into `1..=MAX_SEARCH_LIMIT`.
#[must_use]
pub fn effective_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

fn search_snapshot(products: &[Product], query: &str, limit: usize) -> SearchResults {
    let hits = catalog::search(products, query);
    SearchResults {
        query: query.trim().to_owned(),
        total: hits.len(),
        products: hits.into_iter().take(limit).cloned().collect(),
    }
}

fn category_snapshot(products: &[Product], category: &str) -> Vec<Product> {
    products
        .iter()
        .filter(|p| catalog::in_category(p, category))
        .cloned()
        .collect()
}

/// Cached view of the whole catalog.
#[derive(Clone)]
pub struct CatalogService {
    cache: Cache<(), Arc<Vec<Product>>>,
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogService {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(SNAPSHOT_TTL)
            .build();
        Self { cache }
    }

    /// The full product list, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the list has to be loaded and the query fails.
    #[instrument(skip(self, pool))]
    pub async fn snapshot(&self, pool: &PgPool) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(&()).await {
            debug!("catalog cache hit");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(pool).list_all().await?);
        debug!(count = products.len(), "catalog snapshot loaded");
        self.cache.insert((), Arc::clone(&products)).await;
        Ok(products)
    }

    /// Search product names and categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the snapshot cannot be loaded.
    pub async fn search(
        &self,
        pool: &PgPool,
        query: &str,
        limit: usize,
    ) -> Result<SearchResults, RepositoryError> {
        // Blank queries never match, so skip the load.
        if query.trim().is_empty() {
            return Ok(search_snapshot(&[], query, limit));
        }
        let products = self.snapshot(pool).await?;
        Ok(search_snapshot(&products, query, limit))
    }

    /// Products whose stored category equals `category`, ignoring case,
    /// ordered by name then id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the snapshot cannot be loaded.
    pub async fn by_category(
        &self,
        pool: &PgPool,
        category: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.snapshot(pool).await?;
        Ok(category_snapshot(&products, category))
    }

    /// Drop the cached snapshot after a product write.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("catalog cache invalidated");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::{Price, ProductId};

    use super::*;

    fn product(id: &str, name: &str, category: &str) -> Product {
        Product {
            id: ProductId::parse(id).unwrap(),
            name: name.to_owned(),
            price: Price::new(Decimal::new(1999, 2)).unwrap(),
            description: String::new(),
            image_url: String::new(),
            category: category.to_owned(),
            stock: 3,
        }
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(effective_limit(None), DEFAULT_SEARCH_LIMIT);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(5)), 5);
        assert_eq!(effective_limit(Some(10_000)), MAX_SEARCH_LIMIT);
    }

    #[test]
    fn results_carry_total_beyond_limit() {
        let products = vec![
            product("p1", "Tent two-person", "camping"),
            product("p2", "Tent stakes", "camping"),
            product("p3", "Headlamp", "camping"),
            product("p4", "Kettle", "kitchen"),
        ];
        let results = search_snapshot(&products, " TENT ", 1);
        assert_eq!(results.query, "TENT");
        assert_eq!(results.total, 2);
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].id.as_str(), "p1");

        let results = search_snapshot(&products, "camp", 50);
        assert_eq!(results.total, 3);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let products = vec![product("p1", "Tent", "camping")];
        let results = search_snapshot(&products, "   ", 50);
        assert_eq!(results.total, 0);
        assert!(results.products.is_empty());
    }

    #[test]
    fn category_filter_ignores_case_and_keeps_order() {
        let products = vec![
            product("p1", "Anorak", "jackets"),
            product("p2", "Legacy Parka", "JACKETS"),
            product("p3", "Beanie", "hats"),
            product("p4", "Windbreaker", "Jackets"),
        ];
        let ids: Vec<_> = category_snapshot(&products, " Jackets ")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(
            ids.iter().map(ProductId::as_str).collect::<Vec<_>>(),
            ["p1", "p2", "p4"]
        );
        assert!(category_snapshot(&products, "jacket").is_empty());
        assert!(category_snapshot(&products, "spaceships").is_empty());
    }

    #[tokio::test]
    async fn invalidate_empties_cache() {
        let service = CatalogService::new();
        service
            .cache
            .insert((), Arc::new(vec![product("p1", "Tent", "camping")]))
            .await;
        assert!(service.cache.get(&()).await.is_some());
        service.invalidate().await;
        assert!(service.cache.get(&()).await.is_none());
    }
}
