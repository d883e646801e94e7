//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::services::catalog::CatalogService;
use crate::services::media::{MediaClient, MediaError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    media: Option<MediaClient>,
    catalog: CatalogService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The media client is only built when media credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the media upload endpoint is invalid.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, MediaError> {
        let media = config.media.as_ref().map(MediaClient::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                media,
                catalog: CatalogService::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The media client, or `AppError::MediaUnavailable` when uploads are off.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MediaUnavailable` if no media account is configured.
    pub fn media(&self) -> Result<&MediaClient, AppError> {
        self.inner.media.as_ref().ok_or(AppError::MediaUnavailable)
    }

    /// Get a reference to the catalog snapshot cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
