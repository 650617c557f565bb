//! Authentication service.
//!
//! Password registration and login (Argon2id) plus the emailed
//! password-reset flow. Reset tokens are 32 random bytes, hex-encoded,
//! valid for one hour, and deleted after use.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use tangelo_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long an emailed reset link stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .find_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Start a password reset: mint and store a fresh token.
    ///
    /// Returns the user and the raw token so the caller can email the link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account matches the email.
    pub async fn start_password_reset(&self, email: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.users
            .create_reset_token(user.id, &token, expires_at)
            .await?;

        Ok((user, token))
    }

    /// Look up the user behind an unexpired reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown or expired.
    pub async fn find_reset_user(&self, token: &str) -> Result<User, AuthError> {
        self.users
            .find_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Complete a password reset: set the new password, burn the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown or expired.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let user = self.find_reset_user(token).await?;

        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        self.users.set_password_hash(user.id, &password_hash).await?;
        self.users.delete_reset_token(token).await?;

        Ok(())
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
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

/// Mint a reset token: 32 random bytes, hex-encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        // Two mints never collide.
        assert_ne!(token, generate_reset_token());
    }
}
