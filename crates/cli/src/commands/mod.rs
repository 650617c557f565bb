//! CLI commands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("auth error: {0}")]
    Auth(#[from] tangelo_storefront::services::auth::AuthError),

    #[error("repository error: {0}")]
    Repository(#[from] tangelo_storefront::db::RepositoryError),
}

/// Connect to the database configured in the environment.
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` when no database URL is configured,
/// or a database error if the connection fails.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("TANGELO_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("TANGELO_DATABASE_URL"))?;

    let pool = tangelo_storefront::db::create_pool(&SecretString::from(url)).await?;
    Ok(pool)
}
