//! Favorite repository.
//!
//! Favorites are `(user_id, product_id)` rows. Every write first locks the
//! owning user row, so toggles by one user run one at a time and each sees
//! the previous one's result. The membership decision itself is
//! [`FavoriteSet::toggle`] applied to the locked set.
//!
//! Methods return `Ok(None)` when the user row no longer exists, which the
//! HTTP layer treats as a signed-out session.

use sqlx::{PgConnection, PgPool};

use vitrine_core::favorites::{FavoriteSet, Toggle};
use vitrine_core::{ProductId, UserId};

use super::RepositoryError;

pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's favorites in the order they were added, or `None` if
    /// the user no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Option<FavoriteSet>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        if !user_exists(&mut conn, user_id, "").await? {
            return Ok(None);
        }
        Ok(Some(load_set(&mut conn, user_id).await?))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM storefront.favorite WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Flip membership of `product_id` in the user's favorites and return
    /// the outcome with the resulting set, or `None` if the user no longer
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist and
    /// `RepositoryError::Database` for other failures.
    pub async fn toggle(
        &self,
        user_id: UserId,
        product_id: &ProductId,
    ) -> Result<Option<(Toggle, FavoriteSet)>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !user_exists(&mut tx, user_id, " FOR UPDATE").await? {
            return Ok(None);
        }

        let mut favorites = load_set(&mut tx, user_id).await?;
        let outcome = favorites.toggle(product_id.clone());

        let affected = match outcome {
            Toggle::Removed => sqlx::query(
                "DELETE FROM storefront.favorite WHERE user_id = $1 AND product_id = $2",
            )
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            Toggle::Added => sqlx::query(
                "INSERT INTO storefront.favorite (user_id, product_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, product_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::NotFound
                }
                other => RepositoryError::Database(other),
            })?
            .rows_affected(),
        };

        // The user lock makes this unreachable unless something bypasses it.
        if affected != 1 {
            return Err(RepositoryError::Conflict(
                "favorites changed concurrently".to_owned(),
            ));
        }

        tx.commit().await?;
        Ok(Some((outcome, favorites)))
    }
}

async fn user_exists(
    conn: &mut PgConnection,
    user_id: UserId,
    lock: &str,
) -> Result<bool, RepositoryError> {
    let sql = format!("SELECT 1 FROM storefront.user WHERE id = $1{lock}");
    let row = sqlx::query_scalar::<_, i32>(&sql)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn load_set(conn: &mut PgConnection, user_id: UserId) -> Result<FavoriteSet, RepositoryError> {
    let ids = sqlx::query_scalar::<_, ProductId>(
        "SELECT product_id FROM storefront.favorite \
         WHERE user_id = $1 ORDER BY created_at, product_id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids.into_iter().collect())
}
