//! Favorites route handlers (requires auth).

use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use vitrine_core::ProductId;
use vitrine_core::catalog::Product;
use vitrine_core::favorites::FavoriteSet;

use crate::db::{FavoriteRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::middleware::extract::{Json, Path};
use crate::routes::catalog::product_id;
use crate::state::AppState;

/// Result of a favorite toggle.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub product_id: ProductId,
    pub favorite: bool,
    pub favorites: FavoriteSet,
}

/// The user's favorite products, oldest favorite first.
///
/// Favorites whose product no longer exists are skipped.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    let favorites = FavoriteRepository::new(state.pool())
        .list(user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if favorites.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let products = state.catalog().snapshot(state.pool()).await?;
    Ok(Json(
        favorites.resolve(&products).into_iter().cloned().collect(),
    ))
}

/// Add the product to favorites, or remove it if already there.
///
/// A session whose user record is gone is answered with 401.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>> {
    let id = product_id(&id)?;
    let (outcome, favorites) = FavoriteRepository::new(state.pool())
        .toggle(user.id, &id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Product".to_string()),
            other => other.into(),
        })?
        .ok_or(AppError::Unauthorized)?;
    tracing::info!(product_id = %id, ?outcome, "favorite toggled");
    add_breadcrumb(
        "favorites",
        "Toggled favorite",
        Some(&[("product_id", id.as_str())]),
    );

    Ok(Json(ToggleResponse {
        product_id: id,
        favorite: outcome.is_favorite(),
        favorites,
    }))
}
