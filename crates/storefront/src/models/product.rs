//! Product domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tangelo_core::{ProductId, UserId};

/// A catalog product.
///
/// Owned by exactly one user (its creator); only the owner may mutate or
/// delete it. Orders hold copies of these fields, not references, so later
/// edits never rewrite history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Unit price in euros, two decimal places.
    pub price: Decimal,
    pub description: String,
    /// File name of the stored image, relative to the image directory.
    pub image_path: String,
    pub owner_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
