//! Authentication service.
//!
//! Email and password accounts with Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use vitrine_core::Email;
use vitrine_core::profile::{Address, UserProfile, validate_birth_date, validate_display_name};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length; Argon2 input beyond this is only a hashing cost.
const MAX_PASSWORD_LENGTH: usize = 256;

/// Registration input as received from the client.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub display_name: &'a str,
    pub birth_date: Option<NaiveDate>,
    pub address: Address,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user. The profile starts with role `user`, no
    /// favorites and version 1.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::InvalidProfile` for bad input, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, input: Registration<'_>) -> Result<UserProfile, AuthError> {
        let user = validate_registration(&input)?;
        let password_hash = hash_password(input.password)?;

        self.users
            .create_with_password(&user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Check every registration field before anything touches the database.
fn validate_registration(input: &Registration<'_>) -> Result<NewUser, AuthError> {
    let email = Email::parse(input.email)?;
    validate_password(input.password)?;
    let display_name = validate_display_name(input.display_name)?;
    let birth_date = validate_birth_date(input.birth_date, Utc::now().date_naive())?;
    let address = input.address.clone().normalized()?;

    Ok(NewUser {
        email,
        display_name,
        birth_date,
        address,
    })
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration(email: &'static str, password: &'static str) -> Registration<'static> {
        Registration {
            email,
            password,
            display_name: "Rita",
            birth_date: None,
            address: Address::default(),
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(matches!(
            validate_registration(&registration("a@b.co", "short")),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password(&"p".repeat(MIN_PASSWORD_LENGTH)).is_ok());
    }

    #[test]
    fn registration_normalizes_fields() {
        let mut input = registration(" New@Shop.IO ", "long enough pw");
        input.display_name = "  Rita  ";
        let user = validate_registration(&input).unwrap();
        assert_eq!(user.email.as_str(), "new@shop.io");
        assert_eq!(user.display_name, "Rita");
    }

    #[test]
    fn registration_rejects_bad_email_and_name() {
        assert!(matches!(
            validate_registration(&registration("nope", "long enough pw")),
            Err(AuthError::InvalidEmail(_))
        ));
        let mut input = registration("a@b.co", "long enough pw");
        input.display_name = " ";
        assert!(matches!(
            validate_registration(&input),
            Err(AuthError::InvalidProfile(_))
        ));
    }
}
