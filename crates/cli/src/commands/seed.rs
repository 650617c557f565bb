//! Seed command: a demo user and a small catalog to click around in.
//!
//! Idempotent: an existing user is reused, and products are only inserted
//! when the user owns none yet. Seeded products reference a placeholder
//! image name; drop a `placeholder.png` into the image directory to see
//! pictures.

use std::str::FromStr;

use rust_decimal::Decimal;

use tangelo_core::Email;
use tangelo_storefront::db::products::{NewProduct, ProductRepository};
use tangelo_storefront::db::users::UserRepository;
use tangelo_storefront::services::auth::hash_password;

use super::CliError;

const DEMO_PRODUCTS: &[(&str, &str, &str)] = &[
    ("Tangelo Crate", "19.99", "A wooden crate full of fresh tangelos."),
    ("Citrus Juicer", "34.50", "Manual juicer, fits every tangelo ever grown."),
    ("Orchard Poster", "9.95", "A3 print of the Tangelo orchard at dusk."),
];

/// Seed the demo user and catalog.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or an insert fails.
pub async fn run(email: &str, password: &str) -> Result<(), CliError> {
    let pool = super::connect().await?;

    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;

    let users = UserRepository::new(&pool);
    let user = match users.find_by_email(&email).await? {
        Some(user) => {
            tracing::info!(%email, "user already exists");
            user
        }
        None => {
            let password_hash = hash_password(password)?;
            let user = users.create(&email, &password_hash).await?;
            tracing::info!(%email, "demo user created");
            user
        }
    };

    let products = ProductRepository::new(&pool);
    if products.list_by_owner(user.id).await?.is_empty() {
        for (title, price, description) in DEMO_PRODUCTS {
            let price =
                Decimal::from_str(price).map_err(|e| CliError::Invalid(e.to_string()))?;

            products
                .insert(NewProduct {
                    title: (*title).to_owned(),
                    price,
                    description: (*description).to_owned(),
                    image_path: "placeholder.png".to_owned(),
                    owner_user_id: user.id,
                })
                .await?;
        }
        tracing::info!(count = DEMO_PRODUCTS.len(), "demo products created");
    } else {
        tracing::info!("user already owns products, skipping product seed");
    }

    Ok(())
}
