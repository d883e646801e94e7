//! Authentication extractors.
//!
//! - [`RequireAuth`] - a signed-in user, or 401
//! - [`OptionalAuth`] - the signed-in user if any
//! - [`RequireAdmin`] - a signed-in user whose role, re-read from the
//!   database on every request, is `admin`; 401 or 403 otherwise

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a current administrator.
///
/// The session's role snapshot is ignored; the role is read from the
/// database so a revoked admin loses access on their next request.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut user = session_user(parts).await.ok_or(AppError::Unauthorized)?;

        let role = UserRepository::new(state.pool())
            .role(user.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !role.is_admin() {
            tracing::warn!(user_id = %user.id, "admin route refused");
            return Err(AppError::Forbidden);
        }

        user.role = role;
        Ok(Self(user))
    }
}

/// Store the signed-in user in the session.
///
/// The session id is rotated first so an id issued before login cannot be
/// reused after it.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// End the session entirely (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot delete the record.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
