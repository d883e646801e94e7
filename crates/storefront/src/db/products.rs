//! Product repository.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use vitrine_core::catalog::{Category, Product};
use vitrine_core::{Price, ProductId};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, name, price, description, image_url, category, stock";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price: Decimal,
    description: String,
    image_url: String,
    category: String,
    stock: i32,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::parse(&r.id).map_err(|e| RepositoryError::corrupt("product id", e))?,
            name: r.name,
            price: Price::new(r.price).map_err(|e| RepositoryError::corrupt("price", e))?,
            description: r.description,
            image_url: r.image_url,
            category: r.category,
            stock: u32::try_from(r.stock).map_err(|e| RepositoryError::corrupt("stock", e))?,
        })
    }
}

/// Id and name, for the admin product picker.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
}

/// A validated whole-record product write.
#[derive(Debug, Clone)]
pub struct ProductWrite {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_url: String,
    pub category: Category,
    pub stock: u32,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, ordered by name then id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY name, id");
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM storefront.product WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_summaries(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSummary>(
            "SELECT id, name FROM storefront.product ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create or replace a product. Returns the stored product and whether it
    /// was newly created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, product: &ProductWrite) -> Result<(Product, bool), RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct UpsertRow {
            #[sqlx(flatten)]
            product: ProductRow,
            inserted: bool,
        }

        let stock = i32::try_from(product.stock)
            .map_err(|_| RepositoryError::Conflict("stock is out of range".to_owned()))?;

        let sql = format!(
            "INSERT INTO storefront.product \
                 (id, name, price, description, image_url, category, stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, price = EXCLUDED.price, \
                 description = EXCLUDED.description, image_url = EXCLUDED.image_url, \
                 category = EXCLUDED.category, stock = EXCLUDED.stock, updated_at = now() \
             RETURNING {PRODUCT_COLUMNS}, (xmax = 0) AS inserted"
        );
        let row = sqlx::query_as::<_, UpsertRow>(&sql)
            .bind(&product.id)
            .bind(&product.name)
            .bind(product.price.amount())
            .bind(&product.description)
            .bind(&product.image_url)
            .bind(product.category.slug())
            .bind(stock)
            .fetch_one(self.pool)
            .await?;

        Ok((Product::try_from(row.product)?, row.inserted))
    }

    /// Replace the image URL of an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_image_url(
        &self,
        id: &ProductId,
        url: &str,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.product SET image_url = $2, updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(url)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(Product::try_from)
    }
}
