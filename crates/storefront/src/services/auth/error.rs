//! Authentication error type.

use thiserror::Error;

use tangelo_core::EmailError;

use crate::db::RepositoryError;

/// Errors from registration, login, and password reset.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The password does not meet the requirements.
    #[error("{0}")]
    WeakPassword(String),

    /// Unknown email or wrong password; deliberately indistinct.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// No account exists for the given email.
    #[error("no account with that email found")]
    UserNotFound,

    /// The reset token is unknown or expired.
    #[error("reset link is invalid or has expired")]
    InvalidToken,

    /// Password hashing failed.
    #[error("failed to hash password")]
    PasswordHash,

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
