//! Order history route (requires auth).

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use vitrine_core::orders::Order;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// An order with its total item count.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: u64,
}

/// The signed-in user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?
        .into_iter()
        .map(|order| OrderView {
            item_count: order.item_count(),
            order,
        })
        .collect();
    Ok(Json(orders))
}
