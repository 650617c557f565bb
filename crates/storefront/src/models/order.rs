//! Order domain types.
//!
//! An order is an immutable snapshot taken at checkout completion. Its lines
//! carry full copies of the product fields, deliberately denormalized:
//! editing or deleting the source product must never change what a past
//! order (or its invoice) says.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tangelo_core::{Email, OrderId, ProductId, UserId};

use crate::models::product::Product;

/// The purchasing user, as recorded on the order.
#[derive(Debug, Clone)]
pub struct OrderUser {
    pub user_id: UserId,
    pub email: Email,
}

/// Copy of the product fields at the time of purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Id of the source product; a reference for bookkeeping only, the
    /// product may no longer exist.
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_path: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            image_path: product.image_path.clone(),
        }
    }
}

/// One purchased line: a quantity and the product as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub quantity: u32,
    pub product: ProductSnapshot,
}

/// A completed purchase.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user: OrderUser,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of `quantity × unit price` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| Decimal::from(l.quantity) * l.product.price)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn snapshot(id: i32, price: &str) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(id),
            title: format!("product-{id}"),
            price: Decimal::from_str(price).expect("price"),
            description: String::new(),
            image_path: String::new(),
        }
    }

    #[test]
    fn test_total_sums_quantity_times_price() {
        let order = Order {
            id: OrderId::new(1),
            user: OrderUser {
                user_id: UserId::new(1),
                email: Email::parse("u@example.com").expect("email"),
            },
            lines: vec![
                OrderLine {
                    quantity: 2,
                    product: snapshot(1, "10.00"),
                },
                OrderLine {
                    quantity: 1,
                    product: snapshot(2, "19.99"),
                },
            ],
            created_at: Utc::now(),
        };

        assert_eq!(order.total(), Decimal::from_str("39.99").expect("total"));
    }

    #[test]
    fn test_snapshot_copies_product_fields() {
        let product = Product {
            id: ProductId::new(5),
            title: "Tangelo Crate".to_owned(),
            price: Decimal::from_str("12.50").expect("price"),
            description: "A crate of tangelos".to_owned(),
            image_path: "abc.png".to_owned(),
            owner_user_id: UserId::new(9),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let snap = ProductSnapshot::from(&product);
        assert_eq!(snap.product_id, product.id);
        assert_eq!(snap.title, product.title);
        assert_eq!(snap.price, product.price);
        assert_eq!(snap.description, product.description);
        assert_eq!(snap.image_path, product.image_path);
    }
}
