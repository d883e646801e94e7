//! Administrator routes: ticket console and product management.
//!
//! Every handler takes [`RequireAdmin`], which re-reads the role from the
//! database on each request.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::catalog::{Category, Product};
use vitrine_core::support::Ticket;
use vitrine_core::{MessageAuthor, Price, ProductId, TicketId, TicketStatus};

use crate::db::products::{ProductSummary, ProductWrite};
use crate::db::tickets::{TicketFilter, TicketSummary};
use crate::db::{ProductRepository, TicketRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::middleware::extract::{Json, Multipart, Path, Query};
use crate::routes::catalog::product_id;
use crate::routes::upload::read_image;
use crate::state::AppState;

/// Longest product name accepted.
const MAX_PRODUCT_NAME_LENGTH: usize = 200;

// =============================================================================
// Tickets
// =============================================================================

/// Ticket console filter.
#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
}

/// Result of a close request.
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    /// False when the ticket was already closed.
    pub changed: bool,
}

/// Every ticket, newest first, with unread counts for the admin side.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn tickets(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<TicketSummary>>> {
    let filter = TicketFilter {
        owner: None,
        status: query.status,
    };
    let tickets = TicketRepository::new(state.pool())
        .list(filter, MessageAuthor::Admin)
        .await?;
    Ok(Json(tickets))
}

/// Close a ticket. Closing a closed ticket changes nothing.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn close_ticket(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<CloseResponse>> {
    let (ticket, changed) = TicketRepository::new(state.pool())
        .close(TicketId::new(id))
        .await?;
    if changed {
        tracing::info!(ticket_id = %ticket.id, "ticket closed");
    }
    Ok(Json(CloseResponse { ticket, changed }))
}

// =============================================================================
// Products
// =============================================================================

/// Whole-record product write.
#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub stock: u32,
}

impl ProductInput {
    /// Trim and check the input, producing a write for `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a blank or overlong name, a
    /// negative price, an unknown category or an out-of-range stock.
    pub fn validate(self, id: ProductId) -> Result<ProductWrite> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_PRODUCT_NAME_LENGTH {
            return Err(AppError::BadRequest(format!(
                "name must be at most {MAX_PRODUCT_NAME_LENGTH} characters"
            )));
        }
        if i32::try_from(self.stock).is_err() {
            return Err(AppError::BadRequest("stock is out of range".to_string()));
        }

        Ok(ProductWrite {
            id,
            name: name.to_owned(),
            price: Price::new(self.price)?,
            description: self.description.trim().to_owned(),
            image_url: self.image_url.unwrap_or_default().trim().to_owned(),
            category: Category::parse(&self.category)?,
            stock: self.stock,
        })
    }
}

/// Id and name of every product.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<ProductSummary>>> {
    Ok(Json(
        ProductRepository::new(state.pool()).list_summaries().await?,
    ))
}

/// Create or replace a product. 201 when created, 200 when replaced.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn put_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let id = ProductId::parse(&id)?;
    let write = body.validate(id)?;

    let (product, inserted) = ProductRepository::new(state.pool()).upsert(&write).await?;
    state.catalog().invalidate().await;
    tracing::info!(product_id = %product.id, inserted, "product written");

    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(product)))
}

/// Upload a product image and set it on an existing product.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_product_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Multipart(multipart): Multipart,
) -> Result<Json<Product>> {
    let id = product_id(&id)?;
    let media = state.media()?;

    let repo = ProductRepository::new(state.pool());
    if !repo.exists(&id).await? {
        return Err(AppError::NotFound("Product".to_string()));
    }

    let file = read_image(multipart).await?;
    let url = media.upload(file).await.map_err(|e| {
        tracing::warn!(product_id = %id, error = %e, "product image upload failed");
        AppError::from(e)
    })?;

    let product = repo.set_image_url(&id, &url).await?;
    state.catalog().invalidate().await;
    tracing::info!(product_id = %product.id, "product image updated");
    Ok(Json(product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "  Rain Shell  ".to_string(),
            price: Decimal::new(12_950, 2),
            description: "Packable".to_string(),
            image_url: None,
            category: "Jackets".to_string(),
            stock: 4,
        }
    }

    #[test]
    fn validates_and_normalizes_product_input() {
        let write = input().validate(ProductId::parse("rain-shell").unwrap()).unwrap();
        assert_eq!(write.name, "Rain Shell");
        assert_eq!(write.category, Category::Jackets);
        assert_eq!(write.image_url, "");
        assert_eq!(write.stock, 4);
    }

    #[test]
    fn rejects_blank_name_and_unknown_category() {
        let id = ProductId::parse("x").unwrap();

        let mut blank = input();
        blank.name = "   ".to_string();
        assert!(matches!(
            blank.validate(id.clone()),
            Err(AppError::BadRequest(_))
        ));

        let mut unknown = input();
        unknown.category = "spaceships".to_string();
        assert!(matches!(
            unknown.validate(id.clone()),
            Err(AppError::BadRequest(_))
        ));

        let mut negative = input();
        negative.price = Decimal::new(-1, 0);
        assert!(matches!(negative.validate(id), Err(AppError::BadRequest(_))));
    }
}
