//! Database operations for storefront `PostgreSQL`.
//!
//! ## Tables (schema `storefront`)
//!
//! - `user` - Profiles, role claim and optimistic-concurrency version
//! - `user_password` - Argon2id password hashes
//! - `product` - Catalog, keyed by administrator-chosen string ids
//! - `favorite` - `(user_id, product_id)` pairs
//! - `customer_order` / `order_line` - Read-only order history
//! - `ticket` / `ticket_message` - Support threads
//!
//! Sessions live in the `tower_sessions` schema, created by the session
//! store's own migration.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vitrine-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` into `FromRow` row
//! structs, then converted into validated domain types. A row that fails
//! validation is reported as [`RepositoryError::DataCorruption`].

pub mod favorites;
pub mod orders;
pub mod products;
pub mod tickets;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use vitrine_core::support::ThreadError;

pub use favorites::FavoriteRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use tickets::TicketRepository;
pub use users::UserRepository;

/// Embedded storefront schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint or state violation (duplicate email, stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A ticket thread refused the change.
    #[error(transparent)]
    Rule(#[from] ThreadError),
}

impl RepositoryError {
    /// Map a unique violation to [`RepositoryError::Conflict`].
    pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }

    pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> Self {
        Self::DataCorruption(format!("invalid {what} in database: {err}"))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
