//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Database reachability
//!
//! # Auth (register/login rate limited)
//! POST /api/auth/register                       - Create account, sign in
//! POST /api/auth/login                          - Sign in
//! POST /api/auth/logout                         - Destroy session
//! GET  /api/auth/session                        - Current identity
//!
//! # Catalog
//! GET  /api/categories                          - Category set
//! GET  /api/categories/{category}               - Products in a category
//! GET  /api/products                            - All products
//! GET  /api/products/search?q=&limit=           - Substring search
//! GET  /api/products/{id}                       - Product detail
//! GET  /api/products/{id}/availability          - Quantity check
//!
//! # Account (requires auth)
//! GET  /api/account                             - Profile and favorites count
//! PUT  /api/account/address                     - Replace address (versioned)
//! PUT  /api/account/profile                     - Replace name/birth date (versioned)
//! POST /api/account/picture                     - Upload profile picture
//! GET  /api/favorites                           - Favorite products
//! POST /api/favorites/{product_id}              - Toggle favorite
//! GET  /api/orders                              - Order history
//!
//! # Support (owner or admin)
//! GET  /api/support/tickets                     - Own tickets
//! POST /api/support/tickets                     - Open ticket
//! GET  /api/support/tickets/{id}                - Thread (marks read)
//! POST /api/support/tickets/{id}/messages       - Reply
//! POST /api/support/tickets/{id}/read           - Mark read
//!
//! # Admin (role re-checked per request)
//! GET  /api/admin/tickets?status=               - Ticket console
//! POST /api/admin/tickets/{id}/close            - Close ticket
//! GET  /api/admin/products                      - Product picker
//! PUT  /api/admin/products/{id}                 - Create/replace product
//! POST /api/admin/products/{id}/image           - Upload product image
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod favorites;
pub mod health;
pub mod orders;
pub mod support;
mod upload;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::services::media::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for multipart boundaries and headers around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn upload_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::current_session))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(catalog::categories))
        .route("/api/categories/{category}", get(catalog::category_products))
        .route("/api/products", get(catalog::list_products))
        .route("/api/products/search", get(catalog::search))
        .route("/api/products/{id}", get(catalog::show))
        .route("/api/products/{id}/availability", get(catalog::availability))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/account", get(account::show))
        .route("/api/account/address", put(account::update_address))
        .route("/api/account/profile", put(account::update_profile))
        .route(
            "/api/account/picture",
            post(account::upload_picture).layer(upload_limit()),
        )
        .route("/api/favorites", get(favorites::list))
        .route("/api/favorites/{product_id}", post(favorites::toggle))
        .route("/api/orders", get(orders::list))
}

/// Create the support routes router.
pub fn support_routes() -> Router<AppState> {
    Router::new()
        .route("/api/support/tickets", get(support::list).post(support::create))
        .route("/api/support/tickets/{id}", get(support::show))
        .route("/api/support/tickets/{id}/messages", post(support::post_message))
        .route("/api/support/tickets/{id}/read", post(support::mark_read))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/tickets", get(admin::tickets))
        .route("/api/admin/tickets/{id}/close", post(admin::close_ticket))
        .route("/api/admin/products", get(admin::products))
        .route("/api/admin/products/{id}", put(admin::put_product))
        .route(
            "/api/admin/products/{id}/image",
            post(admin::upload_product_image).layer(upload_limit()),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .merge(catalog_routes())
        .merge(account_routes())
        .merge(support_routes())
        .merge(admin_routes())
        .fallback(unknown_route)
}

async fn unknown_route() -> AppError {
    AppError::NotFound("Route".to_string())
}
