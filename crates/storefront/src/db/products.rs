//! Product repository for catalog access.

use rust_decimal::Decimal;
use sqlx::PgPool;

use tangelo_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::Product;

/// Fields for a new product.
#[derive(Debug)]
pub struct NewProduct {
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_path: String,
    pub owner_user_id: UserId,
}

/// Fields for a product update. `image_path` is `None` when the stored
/// image is kept as is.
#[derive(Debug)]
pub struct ProductUpdate {
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_path: Option<String>,
}

const PRODUCT_COLUMNS: &str =
    "id, title, price, description, image_path, owner_user_id, created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get all products whose id is in `ids`, in no particular order.
    ///
    /// Missing ids are simply absent from the result; callers decide how to
    /// treat dangling references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// One page of the catalog (newest last) plus the total product count.
    ///
    /// `page` is 1-based; `per_page` must be positive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_page(
        &self,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;

        let offset = (page.max(1) - 1) * per_page;
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((products, total))
    }

    /// All products owned by a user, for the admin list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE owner_user_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (title, price, description, image_path, owner_user_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(new.title)
        .bind(new.price)
        .bind(new.description)
        .bind(new.image_path)
        .bind(new.owner_user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Update a product, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matches the id/owner
    /// pair; callers are expected to have distinguished "absent" from
    /// "not yours" beforehand.
    pub async fn update(
        &self,
        id: ProductId,
        owner: UserId,
        update: ProductUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products
             SET title = $3,
                 price = $4,
                 description = $5,
                 image_path = COALESCE($6, image_path),
                 updated_at = now()
             WHERE id = $1 AND owner_user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .bind(update.title)
        .bind(update.price)
        .bind(update.description)
        .bind(update.image_path)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a product, scoped to its owner.
    ///
    /// # Returns
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId, owner: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND owner_user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
