//! Administrator role management.
//!
//! The role lives on the user record and is re-read on every privileged
//! request, so a revoke takes effect on the user's next request without
//! ending their session.

use thiserror::Error;

use vitrine_core::{Email, EmailError, Role};
use vitrine_storefront::db::{RepositoryError, UserRepository};

use super::{ConnectError, connect};

/// Errors that can occur during role changes.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account has this email.
    #[error("No user with email: {0}")]
    UnknownUser(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Set the role of an existing user.
pub async fn set_role(email: &str, role: Role) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, %role, "Role updated");
    Ok(())
}
