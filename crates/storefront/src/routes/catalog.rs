//! Public catalog routes: categories, product listing, search and availability.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::ProductId;
use vitrine_core::catalog::{Category, Product, QuantityCheck};

use crate::db::{FavoriteRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::middleware::extract::{Json, Path, Query};
use crate::services::catalog::{SearchResults, effective_limit};
use crate::state::AppState;

/// A category as listed to clients.
#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub slug: &'static str,
    pub label: &'static str,
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

/// Availability query parameters.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub quantity: Option<u32>,
    /// Reject instead of clamping an out-of-range quantity.
    #[serde(default)]
    pub strict: bool,
}

/// Availability of a product for a requested quantity.
#[derive(Debug, Serialize)]
pub struct Availability {
    pub product_id: ProductId,
    pub stock: u32,
    #[serde(flatten)]
    pub check: QuantityCheck,
    pub adjusted: bool,
}

/// Parse a product id from the path; malformed ids simply don't exist.
pub(crate) fn product_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).map_err(|_| AppError::NotFound("Product".to_string()))
}

/// The supported categories.
pub async fn categories() -> Json<Vec<CategoryInfo>> {
    Json(
        Category::ALL
            .iter()
            .map(|c| CategoryInfo {
                slug: c.slug(),
                label: c.label(),
            })
            .collect(),
    )
}

/// Products whose category matches the path segment, ignoring case.
#[instrument(skip(state))]
pub async fn category_products(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let products = state
        .catalog()
        .by_category(state.pool(), &category)
        .await?;
    Ok(Json(products))
}

/// Every product, from the catalog snapshot.
#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().snapshot(state.pool()).await?;
    Ok(Json(products.to_vec()))
}

/// Substring search over product names and categories.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>> {
    let results = state
        .catalog()
        .search(state.pool(), &query.q, effective_limit(query.limit))
        .await?;
    Ok(Json(results))
}

/// Product detail, with the viewer's favorite flag when signed in.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

/// Product detail.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>> {
    let id = product_id(&id)?;
    let product = ProductRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let favorite = match user {
        Some(user) => FavoriteRepository::new(state.pool())
            .list(user.id)
            .await?
            .map(|favorites| favorites.contains(&product.id)),
        None => None,
    };
    Ok(Json(ProductDetail { product, favorite }))
}

/// Check a quantity against stock.
///
/// By default the quantity is clamped into `1..=stock`; with `strict=true`
/// an out-of-range quantity is a 400.
#[instrument(skip(state))]
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>> {
    let id = product_id(&id)?;
    let product = ProductRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let requested = query.quantity.unwrap_or(1);
    if query.strict {
        product.check_quantity(requested)?;
    }
    let check = product.clamp_quantity(requested);

    Ok(Json(Availability {
        product_id: product.id,
        stock: product.stock,
        adjusted: check.was_clamped(),
        check,
    }))
}
