//! Authentication route handlers.
//!
//! Registration and login sign the session in with the user's identity;
//! logout destroys the session record and cookie.

use axum::{extract::State, http::StatusCode};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::profile::{Address, UserProfile};

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::extract::Json;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: Address,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn sign_in(session: &Session, profile: &UserProfile) -> Result<()> {
    let current = CurrentUser::from(profile);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and sign it in.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let profile = AuthService::new(state.pool())
        .register(Registration {
            email: &body.email,
            password: &body.password,
            display_name: &body.display_name,
            birth_date: body.birth_date,
            address: body.address,
        })
        .await?;

    sign_in(&session, &profile).await?;
    tracing::info!(user_id = %profile.id, "user registered");

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Sign in with email and password.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserProfile>> {
    let profile = match AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            return Err(e.into());
        }
    };

    sign_in(&session, &profile).await?;
    tracing::info!(user_id = %profile.id, "user logged in");

    Ok(Json(profile))
}

/// Sign out. Succeeds whether or not a session existed.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in identity, refreshed from the database.
///
/// A session whose user no longer exists is destroyed.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn current_session(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CurrentUser>> {
    let Some(profile) = UserRepository::new(state.pool()).get_by_id(user.id).await? else {
        clear_current_user(&session).await?;
        return Err(AppError::Unauthorized);
    };
    Ok(Json(CurrentUser::from(&profile)))
}
