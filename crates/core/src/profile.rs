//! User profile and postal address records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, Role, UserId};

/// Maximum length of a display name.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// Maximum length of any single address field.
pub const MAX_ADDRESS_FIELD_LENGTH: usize = 200;

/// Profile field validation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyDisplayName,
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
    #[error("address field {field} must be at most {max} characters")]
    AddressFieldTooLong { field: &'static str, max: usize },
    #[error("birth date cannot be in the future")]
    BirthDateInFuture,
}

/// Structured postal address. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub city: String,
}

impl Address {
    /// Trim every field and enforce the length limit.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::AddressFieldTooLong`] naming the first field
    /// over the limit.
    pub fn normalized(self) -> Result<Self, ProfileError> {
        let field = |name: &'static str, value: String| {
            let value = value.trim().to_owned();
            if value.chars().count() > MAX_ADDRESS_FIELD_LENGTH {
                Err(ProfileError::AddressFieldTooLong {
                    field: name,
                    max: MAX_ADDRESS_FIELD_LENGTH,
                })
            } else {
                Ok(value)
            }
        };
        Ok(Self {
            street: field("street", self.street)?,
            number: field("number", self.number)?,
            postal_code: field("postal_code", self.postal_code)?,
            city: field("city", self.city)?,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.street.is_empty()
            && self.number.is_empty()
            && self.postal_code.is_empty()
            && self.city.is_empty()
    }
}

/// Validate and trim a display name.
///
/// # Errors
///
/// Returns an error if the trimmed name is empty or too long.
pub fn validate_display_name(name: &str) -> Result<String, ProfileError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::EmptyDisplayName);
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ProfileError::DisplayNameTooLong {
            max: MAX_DISPLAY_NAME_LENGTH,
        });
    }
    Ok(trimmed.to_owned())
}

/// Reject birth dates after `today`.
///
/// # Errors
///
/// Returns [`ProfileError::BirthDateInFuture`].
pub fn validate_birth_date(
    birth_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, ProfileError> {
    match birth_date {
        Some(date) if date > today => Err(ProfileError::BirthDateInFuture),
        other => Ok(other),
    }
}

/// A customer profile as shown in the account area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Address,
    pub role: Role,
    pub profile_image_url: Option<String>,
    /// Incremented on every profile write; clients echo it back as
    /// `expected_version`.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
