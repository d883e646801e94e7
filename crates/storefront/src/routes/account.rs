//! Account route handlers (requires auth).
//!
//! Profile writes carry the version the client last saw; a stale version is
//! answered with 409 and nothing is written.

use axum::extract::State;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::profile::{Address, UserProfile, validate_birth_date, validate_display_name};

use crate::db::{FavoriteRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::middleware::extract::{Json, Multipart};
use crate::routes::upload::read_image;
use crate::state::AppState;

/// Account overview.
#[derive(Debug, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub favorites_count: i64,
}

/// Address replacement request.
#[derive(Debug, Deserialize)]
pub struct AddressUpdate {
    pub expected_version: i32,
    pub address: Address,
}

/// Display name and birth date replacement request.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub expected_version: i32,
    pub display_name: String,
    pub birth_date: Option<NaiveDate>,
}

/// Profile, role and favorites count for the signed-in user.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AccountView>> {
    let profile = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let favorites_count = FavoriteRepository::new(state.pool()).count(user.id).await?;

    Ok(Json(AccountView {
        profile,
        favorites_count,
    }))
}

/// Replace the postal address.
#[instrument(skip(state, user, body), fields(user_id = %user.id, expected_version = body.expected_version))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddressUpdate>,
) -> Result<Json<UserProfile>> {
    let address = body.address.normalized()?;
    let profile = UserRepository::new(state.pool())
        .update_address(user.id, body.expected_version, &address)
        .await?;
    tracing::info!(version = profile.version, "address updated");
    Ok(Json(profile))
}

/// Replace display name and birth date.
#[instrument(skip(state, user, body), fields(user_id = %user.id, expected_version = body.expected_version))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let display_name = validate_display_name(&body.display_name)?;
    let birth_date = validate_birth_date(body.birth_date, Utc::now().date_naive())?;

    let profile = UserRepository::new(state.pool())
        .update_details(user.id, body.expected_version, &display_name, birth_date)
        .await?;
    tracing::info!(version = profile.version, "profile updated");
    Ok(Json(profile))
}

/// Upload a profile picture and store its hosted URL.
///
/// On upload failure the stored picture is left as it was.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn upload_picture(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Multipart(multipart): Multipart,
) -> Result<Json<UserProfile>> {
    let media = state.media()?;
    let file = read_image(multipart).await?;

    let url = media.upload(file).await.map_err(|e| {
        tracing::warn!(error = %e, "profile picture upload failed");
        AppError::from(e)
    })?;

    let profile = UserRepository::new(state.pool())
        .set_profile_image(user.id, &url)
        .await?;
    tracing::info!("profile picture updated");
    Ok(Json(profile))
}
