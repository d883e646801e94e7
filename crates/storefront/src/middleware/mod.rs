//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID (fills the span field, echoes `x-request-id`)
//! 4. Security headers
//! 5. Session layer (tower-sessions, signed cookie)
//! 6. Rate limiting (auth routes only)
//!
//! [`extract`] holds the request extractors that report rejections as JSON.

pub mod auth;
pub mod extract;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
