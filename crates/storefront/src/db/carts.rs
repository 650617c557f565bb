//! Cart repository: one JSONB document per user, version-guarded.
//!
//! Mutation is a compare-and-swap: load the document, let the
//! [`Cart`](crate::models::Cart) aggregate apply the change, then save with
//! `WHERE version = <seen>`. A concurrent writer makes the save report a
//! conflict and the service retries, so increments are never lost to a
//! read-modify-write race.

use sqlx::types::Json;
use sqlx::{PgPool, Row};

use tangelo_core::UserId;

use super::RepositoryError;
use crate::models::{Cart, CartLine};

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's cart document, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query("SELECT lines, version FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(lines): Json<Vec<CartLine>> = row.try_get("lines")?;
                let version: i32 = row.try_get("version")?;
                Ok(Some(Cart::from_parts(user_id, lines, version)))
            }
            None => Ok(None),
        }
    }

    /// Load a user's cart, creating an empty document on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        if let Some(cart) = self.load(user_id).await? {
            return Ok(cart);
        }

        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        // A concurrent first add may have won the insert; read back either way.
        self.load(user_id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption("cart vanished after insert".to_owned()))
    }

    /// Persist a cart document if nobody else has written it in between.
    ///
    /// # Returns
    ///
    /// Returns `true` on success, `false` when the version guard failed and
    /// the caller should reload and retry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, cart: &Cart) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE carts
             SET lines = $2, version = version + 1, updated_at = now()
             WHERE user_id = $1 AND version = $3",
        )
        .bind(cart.user_id())
        .bind(Json(cart.lines()))
        .bind(cart.version())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empty a user's cart unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE carts
             SET lines = '[]'::jsonb, version = version + 1, updated_at = now()
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
