//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use vitrine_storefront::config::{ConfigError, database_url_from_env};

/// Failure to reach the storefront database.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the storefront database named by the environment.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}
