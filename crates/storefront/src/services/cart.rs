//! Cart engine: loads, mutates, and persists the per-user cart document.
//!
//! All writes go through a compare-and-swap loop so that two concurrent
//! adds from the same user both land (no lost increments under
//! read-modify-write).

use sqlx::PgPool;
use thiserror::Error;

use tangelo_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{Cart, Product};

/// How often a version-guarded save is retried before giving up.
const MAX_SAVE_ATTEMPTS: u32 = 5;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product to add does not exist (anymore).
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart line resolved against the catalog, ready for rendering or pricing.
#[derive(Debug, Clone)]
pub struct CartEntry {
    pub quantity: u32,
    pub product: Product,
}

/// Cart engine over the cart and product repositories.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Add one unit of a product to the user's cart.
    ///
    /// Creates the cart on first use. Adding a product already in the cart
    /// increments its line instead of appending a second one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product doesn't exist,
    /// or `CartError::Repository` on storage failure.
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        self.products
            .find_by_id(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        for _ in 0..MAX_SAVE_ATTEMPTS {
            let mut cart = self.carts.load_or_create(user_id).await?;
            cart.add(product_id);

            if self.carts.save(&cart).await? {
                return Ok(cart);
            }

            tracing::debug!(%user_id, "cart version conflict on add, retrying");
        }

        Err(RepositoryError::WriteConflict(format!("cart of user {user_id}")).into())
    }

    /// Remove a product's line from the user's cart, whatever its quantity.
    ///
    /// Removing something that isn't there (or having no cart at all) is a
    /// successful no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub async fn remove_from_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), CartError> {
        for _ in 0..MAX_SAVE_ATTEMPTS {
            let Some(mut cart) = self.carts.load(user_id).await? else {
                return Ok(());
            };

            if !cart.lines().iter().any(|l| l.product_id == product_id) {
                return Ok(());
            }

            cart.remove(product_id);

            if self.carts.save(&cart).await? {
                return Ok(());
            }

            tracing::debug!(%user_id, "cart version conflict on remove, retrying");
        }

        Err(RepositoryError::WriteConflict(format!("cart of user {user_id}")).into())
    }

    /// Empty the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub async fn clear_cart(&self, user_id: UserId) -> Result<(), CartError> {
        self.carts.clear(user_id).await?;
        Ok(())
    }

    /// Resolve every cart line against the catalog.
    ///
    /// A line whose product has been deleted since it was added is skipped
    /// with a warning; it never prices into a checkout and never crashes a
    /// render.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub async fn populate(&self, user_id: UserId) -> Result<Vec<CartEntry>, CartError> {
        let Some(cart) = self.carts.load(user_id).await? else {
            return Ok(Vec::new());
        };

        let ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
        let products = self.products.find_many(&ids).await?;

        let mut entries = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            match products.iter().find(|p| p.id == line.product_id) {
                Some(product) => entries.push(CartEntry {
                    quantity: line.quantity,
                    product: product.clone(),
                }),
                None => {
                    tracing::warn!(
                        %user_id,
                        product_id = %line.product_id,
                        "skipping cart line whose product no longer exists"
                    );
                }
            }
        }

        Ok(entries)
    }
}
