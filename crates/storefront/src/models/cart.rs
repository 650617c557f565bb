//! The per-user cart aggregate.
//!
//! A cart is a single document: a list of `{product_id, quantity}` lines,
//! unique by product id. All merge semantics live here so they can be tested
//! without storage; persistence (including the compare-and-swap version
//! guard) is the cart repository's concern.

use serde::{Deserialize, Serialize};

use tangelo_core::{ProductId, UserId};

/// One line of a cart: a product reference and how many of it.
///
/// Invariant: `quantity >= 1`. A line that would drop to zero is removed
/// from the cart instead of being kept at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's cart document.
///
/// Exactly one cart exists per user, created lazily on first add. The
/// `version` counter is bumped by the repository on every successful save
/// and guards concurrent writers.
#[derive(Debug, Clone)]
pub struct Cart {
    user_id: UserId,
    lines: Vec<CartLine>,
    version: i32,
}

impl Cart {
    /// Create an empty cart for a user (version 0, not yet persisted).
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild a cart from its persisted parts.
    #[must_use]
    pub const fn from_parts(user_id: UserId, lines: Vec<CartLine>, version: i32) -> Self {
        Self {
            user_id,
            lines,
            version,
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add one unit of a product.
    ///
    /// If a line for the product already exists its quantity is incremented;
    /// otherwise a new line with quantity 1 is appended. No two lines ever
    /// share a product id.
    pub fn add(&mut self, product_id: ProductId) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(CartLine {
                product_id,
                quantity: 1,
            });
        }
    }

    /// Remove a product's line entirely, regardless of quantity.
    ///
    /// Removing a product that is not in the cart is a no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Drop all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart::empty(UserId::new(1))
    }

    #[test]
    fn test_add_same_product_twice_merges() {
        let mut cart = cart();
        cart.add(ProductId::new(7));
        cart.add(ProductId::new(7));

        // One line with quantity 2, never two lines.
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(
            cart.lines().first(),
            Some(&CartLine {
                product_id: ProductId::new(7),
                quantity: 2
            })
        );
    }

    #[test]
    fn test_add_distinct_products_appends() {
        let mut cart = cart();
        cart.add(ProductId::new(1));
        cart.add(ProductId::new(2));
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_remove_drops_whole_line() {
        let mut cart = cart();
        cart.add(ProductId::new(1));
        cart.add(ProductId::new(1));
        cart.add(ProductId::new(2));

        cart.remove(ProductId::new(1));

        // The quantity-2 line is gone entirely, not reduced to 1.
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(
            cart.lines().first().map(|l| l.product_id),
            Some(ProductId::new(2))
        );
    }

    #[test]
    fn test_remove_absent_product_is_noop() {
        let mut cart = cart();
        cart.add(ProductId::new(1));
        cart.remove(ProductId::new(99));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cart = cart();
        cart.add(ProductId::new(1));
        cart.add(ProductId::new(2));
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_document_roundtrip() {
        let line = CartLine {
            product_id: ProductId::new(3),
            quantity: 4,
        };
        let json = serde_json::to_string(&line).expect("serialize");
        assert_eq!(json, r#"{"product_id":3,"quantity":4}"#);
        let back: CartLine = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, line);
    }
}
