//! Tangelo CLI - database migrations and seeding.
//!
//! ```bash
//! # Apply migrations
//! cargo run -p tangelo-cli -- migrate
//!
//! # Seed a demo user and catalog
//! cargo run -p tangelo-cli -- seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tangelo", about = "Tangelo management CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run database migrations
    Migrate,
    /// Seed a demo user and a few products
    Seed {
        /// Email of the demo user
        #[arg(long, default_value = "demo@tangelo.shop")]
        email: String,
        /// Password of the demo user
        #[arg(long, default_value = "tangelo-demo")]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run().await,
        Command::Seed { email, password } => commands::seed::run(&email, &password).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
