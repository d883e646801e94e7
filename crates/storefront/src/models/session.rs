//! Session-related types.

use serde::{Deserialize, Serialize};

use vitrine_core::profile::UserProfile;
use vitrine_core::{Email, Role, UserId};

/// Session-stored user identity.
///
/// `role` is a snapshot taken at login. It is informational only: privileged
/// handlers re-read the role from the database before acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub role: Role,
}

impl From<&UserProfile> for CurrentUser {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            role: profile.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
