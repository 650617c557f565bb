//! User repository: accounts and password-reset tokens.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use tangelo_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

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

    /// Create a new user with email and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash)
             VALUES ($1, $2)
             RETURNING id, email, created_at",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        user_from_row(&row)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, created_at FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get a user together with their password hash, by email.
    ///
    /// Returns `None` if no such user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE email = $1")
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hash: String = row.try_get("password_hash")?;
        Ok(Some((user_from_row(&row)?, hash)))
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    // =========================================================================
    // Password reset tokens
    // =========================================================================

    /// Store a reset token for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Look up the user behind an unexpired reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT u.id, u.email, u.created_at
             FROM password_reset_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token = $1 AND t.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Delete a reset token once it has been used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_reset_token(&self, token: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

/// Map a `users` row into the domain type.
fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User, RepositoryError> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(User {
        id: row.try_get("id")?,
        email,
        created_at,
    })
}
