//! Checkout orchestrator.
//!
//! `begin` turns the live cart into a priced line-item list and a payment
//! session; `complete` (reached via the provider's success callback)
//! snapshots the cart into an immutable order and clears it, both inside a
//! single transaction.
//!
//! Attempt lifecycle: started -> payment session created -> (client pays on
//! the hosted page) -> order persisted + cart cleared. An abandoned session
//! simply never reaches the last step and leaves no server-side state.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tangelo_core::{OrderId, to_minor_units};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{CurrentUser, OrderLine, OrderUser, ProductSnapshot};
use crate::services::cart::{CartEntry, CartError, CartService};
use crate::services::payments::{CheckoutLineItem, CheckoutSession, PaymentError, StripeClient};

/// Errors from checkout orchestration.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no (resolvable) lines; nothing to pay for.
    #[error("cart is empty")]
    EmptyCart,

    /// A unit price does not fit into minor units.
    #[error("price of {0} is out of range")]
    AmountOutOfRange(String),

    /// The payment provider rejected or failed the session request.
    #[error("payment provider error: {0}")]
    Payment(#[from] PaymentError),

    /// Cart resolution failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart priced for checkout.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub entries: Vec<CartEntry>,
    /// Sum of quantity times unit price over all entries, in major units.
    pub total: Decimal,
}

/// Result of starting a checkout: what the user is paying for, and the
/// provider session to complete payment out-of-band.
#[derive(Debug, Clone)]
pub struct CheckoutStarted {
    pub cart: PricedCart,
    pub session: CheckoutSession,
}

/// Checkout orchestrator over the cart engine, order store, and payment
/// provider.
pub struct CheckoutService<'a> {
    cart: CartService<'a>,
    orders: OrderRepository<'a>,
    payments: &'a StripeClient,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, payments: &'a StripeClient) -> Self {
        Self {
            cart: CartService::new(pool),
            orders: OrderRepository::new(pool),
            payments,
        }
    }

    /// Start a checkout attempt.
    ///
    /// Prices the cart, rejects an empty one before any provider call, and
    /// creates the payment session.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to pay for,
    /// `CheckoutError::Payment` if the session cannot be created, or the
    /// underlying cart/storage error.
    pub async fn begin(
        &self,
        user: &CurrentUser,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutStarted, CheckoutError> {
        let entries = self.cart.populate(user.id).await?;
        let cart = price_cart(entries)?;
        let line_items = to_line_items(&cart)?;

        let session = self
            .payments
            .create_checkout_session(user.email.as_str(), &line_items, success_url, cancel_url)
            .await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "payment session created");

        Ok(CheckoutStarted { cart, session })
    }

    /// Complete a checkout after the provider reported success.
    ///
    /// Re-reads the cart, deep-copies its lines into an order, and persists
    /// order + cart-clear atomically. Completing with an empty cart (e.g. a
    /// replayed success callback) is a no-op returning `None` instead of an
    /// empty order.
    ///
    /// # Errors
    ///
    /// Returns the underlying cart/storage error; on failure neither the
    /// order nor the cart clear took effect.
    pub async fn complete(&self, user: &CurrentUser) -> Result<Option<OrderId>, CheckoutError> {
        let entries = self.cart.populate(user.id).await?;
        if entries.is_empty() {
            tracing::warn!(user_id = %user.id, "checkout completion with empty cart, nothing to record");
            return Ok(None);
        }

        let lines = snapshot_lines(&entries);
        let order_user = OrderUser {
            user_id: user.id,
            email: user.email.clone(),
        };

        let order_id = self.orders.create_and_clear_cart(&order_user, &lines).await?;

        tracing::info!(user_id = %user.id, %order_id, "order persisted and cart cleared");

        Ok(Some(order_id))
    }
}

/// Price a resolved cart.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` when there are no entries.
pub fn price_cart(entries: Vec<CartEntry>) -> Result<PricedCart, CheckoutError> {
    if entries.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let total = entries
        .iter()
        .map(|e| Decimal::from(e.quantity) * e.product.price)
        .sum();

    Ok(PricedCart { entries, total })
}

/// Build the provider line items, converting unit prices to minor units.
fn to_line_items(cart: &PricedCart) -> Result<Vec<CheckoutLineItem>, CheckoutError> {
    cart.entries
        .iter()
        .map(|e| {
            let unit_amount = to_minor_units(e.product.price)
                .ok_or_else(|| CheckoutError::AmountOutOfRange(e.product.title.clone()))?;

            Ok(CheckoutLineItem {
                name: e.product.title.clone(),
                description: e.product.description.clone(),
                quantity: e.quantity,
                unit_amount,
            })
        })
        .collect()
}

/// Deep-copy resolved cart entries into order lines.
fn snapshot_lines(entries: &[CartEntry]) -> Vec<OrderLine> {
    entries
        .iter()
        .map(|e| OrderLine {
            quantity: e.quantity,
            product: ProductSnapshot::from(&e.product),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;
    use tangelo_core::{ProductId, UserId};

    use crate::models::Product;

    fn product(id: i32, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("product-{id}"),
            price: Decimal::from_str(price).unwrap(),
            description: "desc".to_owned(),
            image_path: format!("{id}.png"),
            owner_user_id: UserId::new(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry(id: i32, price: &str, quantity: u32) -> CartEntry {
        CartEntry {
            quantity,
            product: product(id, price),
        }
    }

    #[test]
    fn test_price_cart_rejects_empty() {
        assert!(matches!(price_cart(Vec::new()), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_price_cart_total() {
        // qty 2 × 10.00 + qty 1 × 19.99 = 39.99
        let cart = price_cart(vec![entry(1, "10.00", 2), entry(2, "19.99", 1)]).unwrap();
        assert_eq!(cart.total, Decimal::from_str("39.99").unwrap());
    }

    #[test]
    fn test_line_items_use_exact_minor_units() {
        let cart = price_cart(vec![entry(1, "19.99", 3)]).unwrap();
        let items = to_line_items(&cart).unwrap();

        assert_eq!(items.len(), 1);
        let item = items.first().unwrap();
        assert_eq!(item.unit_amount, 1999);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.name, "product-1");
    }

    #[test]
    fn test_snapshot_lines_are_deep_copies() {
        let entries = vec![entry(1, "10.00", 2)];
        let lines = snapshot_lines(&entries);

        let line = lines.first().unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.product.product_id, ProductId::new(1));
        assert_eq!(line.product.price, Decimal::from_str("10.00").unwrap());

        // The snapshot carries its own strings; nothing borrows the product.
        assert_eq!(line.product.title, entries.first().unwrap().product.title);
    }
}
