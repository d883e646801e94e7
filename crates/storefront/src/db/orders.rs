//! Order history repository (read-only).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vitrine_core::orders::{Order, OrderLine};
use vitrine_core::{OrderId, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    ordered_at: DateTime<Utc>,
    status: String,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    order_id: i32,
    product_name: String,
    quantity: i32,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's orders, newest first, with their lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails and
    /// `RepositoryError::DataCorruption` for a negative quantity.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, ordered_at, status FROM storefront.customer_order \
             WHERE user_id = $1 ORDER BY ordered_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let lines = sqlx::query_as::<_, LineRow>(
            "SELECT order_id, product_name, quantity FROM storefront.order_line \
             WHERE order_id = ANY($1) ORDER BY order_id, id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for line in lines {
            let quantity =
                u32::try_from(line.quantity).map_err(|e| RepositoryError::corrupt("quantity", e))?;
            by_order.entry(line.order_id).or_default().push(OrderLine {
                product_name: line.product_name,
                quantity,
            });
        }

        Ok(orders
            .into_iter()
            .map(|o| Order {
                lines: by_order.remove(&o.id.as_i32()).unwrap_or_default(),
                id: o.id,
                user_id: o.user_id,
                ordered_at: o.ordered_at,
                status: o.status,
            })
            .collect())
    }
}
