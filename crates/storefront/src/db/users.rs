//! User repository: profiles, passwords and role claims.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use vitrine_core::profile::{Address, UserProfile};
use vitrine_core::{Email, Role, UserId};

use super::RepositoryError;

const USER_COLUMNS: &str = "id, email, display_name, birth_date, street, street_number, \
                            postal_code, city, role, profile_image_url, version, \
                            created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    display_name: String,
    birth_date: Option<NaiveDate>,
    street: String,
    street_number: String,
    postal_code: String,
    city: String,
    role: Role,
    profile_image_url: Option<String>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| RepositoryError::corrupt("email", e))?;
        Ok(Self {
            id: r.id,
            email,
            display_name: r.display_name,
            birth_date: r.birth_date,
            address: Address {
                street: r.street,
                number: r.street_number,
                postal_code: r.postal_code,
                city: r.city,
            },
            role: r.role,
            profile_image_url: r.profile_image_url,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Fields collected at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub display_name: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Address,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM storefront.user WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(UserProfile::try_from)
            .transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<UserProfile>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM storefront.user WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?
            .map(UserProfile::try_from)
            .transpose()
    }

    /// Read the current role of a user, or `None` if the user no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn role(&self, id: UserId) -> Result<Option<Role>, RepositoryError> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM storefront.user WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(role)
    }

    /// Create a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<UserProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO storefront.user \
                 (email, display_name, birth_date, street, street_number, postal_code, city) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.birth_date)
            .bind(&user.address.street)
            .bind(&user.address.number)
            .bind(&user.address.postal_code)
            .bind(&user.address.city)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::conflict_on_unique(e, "email already exists"))?;

        sqlx::query(
            "INSERT INTO storefront.user_password (user_id, password_hash) VALUES ($1, $2)",
        )
        .bind(row.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        UserProfile::try_from(row)
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(UserProfile, String)>, RepositoryError> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM storefront.user_password WHERE user_id = $1",
        )
        .bind(user.id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hash.map(|h| (user, h)))
    }

    /// Set the role of the user with the given email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that email.
    pub async fn set_role(&self, email: &Email, role: Role) -> Result<UserProfile, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.user SET role = $2, updated_at = now() \
             WHERE email = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .bind(role)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(UserProfile::try_from)
    }

    /// Overwrite the address if the stored version still matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the version is stale and
    /// `RepositoryError::NotFound` if the user no longer exists.
    pub async fn update_address(
        &self,
        id: UserId,
        expected_version: i32,
        address: &Address,
    ) -> Result<UserProfile, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.user \
             SET street = $3, street_number = $4, postal_code = $5, city = $6, \
                 version = version + 1, updated_at = now() \
             WHERE id = $1 AND version = $2 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(expected_version)
            .bind(&address.street)
            .bind(&address.number)
            .bind(&address.postal_code)
            .bind(&address.city)
            .fetch_optional(self.pool)
            .await?;

        self.versioned_result(id, row).await
    }

    /// Overwrite display name and birth date if the stored version still matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the version is stale and
    /// `RepositoryError::NotFound` if the user no longer exists.
    pub async fn update_details(
        &self,
        id: UserId,
        expected_version: i32,
        display_name: &str,
        birth_date: Option<NaiveDate>,
    ) -> Result<UserProfile, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.user \
             SET display_name = $3, birth_date = $4, \
                 version = version + 1, updated_at = now() \
             WHERE id = $1 AND version = $2 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(expected_version)
            .bind(display_name)
            .bind(birth_date)
            .fetch_optional(self.pool)
            .await?;

        self.versioned_result(id, row).await
    }

    /// Store a new profile picture URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user no longer exists.
    pub async fn set_profile_image(
        &self,
        id: UserId,
        url: &str,
    ) -> Result<UserProfile, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.user \
             SET profile_image_url = $2, version = version + 1, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(url)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(UserProfile::try_from)
    }

    /// Distinguish a stale version from a missing user after a guarded update.
    async fn versioned_result(
        &self,
        id: UserId,
        row: Option<UserRow>,
    ) -> Result<UserProfile, RepositoryError> {
        if let Some(row) = row {
            return UserProfile::try_from(row);
        }
        match self.get_by_id(id).await? {
            Some(current) => Err(RepositoryError::Conflict(format!(
                "profile was modified (current version {})",
                current.version
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}
