//! Session middleware configuration.
//!
//! Production sessions are stored in `PostgreSQL` through
//! `tower-sessions-sqlx-store`; the layer itself is generic over the store so
//! router tests can run against `MemoryStore`. The session id cookie is signed
//! with `STOREFRONT_SESSION_SECRET`.

use secrecy::ExposeSecret;
use tower_sessions::cookie::Key;
use tower_sessions::cookie::KeyError;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vitrine_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// The cookie is `Secure` only when the configured base URL is https.
///
/// # Errors
///
/// Returns `KeyError` if the session secret is too short to sign cookies.
pub fn create_session_layer<Store>(
    store: Store,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<Store, SignedCookie>, KeyError>
where
    Store: SessionStore + Clone,
{
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
