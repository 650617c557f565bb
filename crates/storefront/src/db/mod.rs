//! Database operations for the storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Site authentication
//! - `password_reset_tokens` - Emailed reset links, 1h expiry
//! - `products` - The catalog, one owner per product
//! - `carts` - One JSONB cart document per user, version-guarded
//! - `orders` / `order_lines` - Immutable purchase snapshots
//! - tower-sessions storage (created by the session store itself)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tangelo-cli -- migrate
//! ```
//!
//! Queries use the sqlx runtime API; rows are mapped into the domain types
//! in [`crate::models`] at this boundary.

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A version-guarded write lost the race too many times.
    #[error("concurrent modification: {0}")]
    WriteConflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
