//! Database migration command.
//!
//! Applies the storefront schema from `crates/storefront/migrations/`, then
//! the session store's own `tower_sessions` schema. The server never runs
//! migrations on startup.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use vitrine_storefront::db::MIGRATOR;

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store migration error: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Run all storefront migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Running session store migrations...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
