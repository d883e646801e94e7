//! Order history records.
//!
//! Orders are written by an external fulfilment process; the storefront only
//! lists them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{OrderId, UserId};

/// One line of an order: a snapshot of the product name at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub ordered_at: DateTime<Utc>,
    pub status: String,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}
