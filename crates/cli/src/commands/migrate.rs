//! Database migration command.
//!
//! Applies the SQL migrations from `crates/storefront/migrations/`. Run
//! from the workspace root:
//!
//! ```bash
//! cargo run -p tangelo-cli -- migrate
//! ```

use std::path::Path;

use sqlx::migrate::Migrator;

use super::CliError;

/// Migration directory, relative to the workspace root.
const MIGRATIONS_DIR: &str = "crates/storefront/migrations";

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations from {MIGRATIONS_DIR}...");
    let migrator = Migrator::new(Path::new(MIGRATIONS_DIR)).await?;
    migrator.run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
