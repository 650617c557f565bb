//! Order repository: logically append-only purchase snapshots.
//!
//! Orders are written exactly once, inside a transaction that also clears
//! the buyer's cart, and are only ever read afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use tangelo_core::{Email, OrderId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderLine, OrderUser, ProductSnapshot};

const LINE_COLUMNS: &str =
    "order_id, quantity, product_id, product_title, product_price, product_description, product_image_path";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order and clear the buyer's cart in one transaction.
    ///
    /// Either the order exists and the cart is empty, or neither happened;
    /// there is no state where the order was written but the stale cart
    /// survived.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails (the
    /// transaction is rolled back).
    pub async fn create_and_clear_cart(
        &self,
        user: &OrderUser,
        lines: &[OrderLine],
    ) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("INSERT INTO orders (user_id, user_email) VALUES ($1, $2) RETURNING id")
            .bind(user.user_id)
            .bind(user.email.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let order_id: OrderId = row.try_get("id")?;

        for line in lines {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("quantity {} overflows", line.quantity))
            })?;

            sqlx::query(
                "INSERT INTO order_lines
                 (order_id, quantity, product_id, product_title, product_price,
                  product_description, product_image_path)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(order_id)
            .bind(quantity)
            .bind(line.product.product_id)
            .bind(&line.product.title)
            .bind(line.product.price)
            .bind(&line.product.description)
            .bind(&line.product.image_path)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE carts
             SET lines = '[]'::jsonb, version = version + 1, updated_at = now()
             WHERE user_id = $1",
        )
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order_id)
    }

    /// Get an order with its lines by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if stored data cannot be mapped.
    pub async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query("SELECT id, user_id, user_email, created_at FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut order = order_from_row(&row)?;
        order.lines = self
            .lines_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(Some(order))
    }

    /// All orders belonging to a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if stored data cannot be mapped.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, user_email, created_at FROM orders WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(order_from_row(row)?);
        }

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut lines = self.lines_for(&ids).await?;
        for order in &mut orders {
            order.lines = lines.remove(&order.id).unwrap_or_default();
        }

        Ok(orders)
    }

    /// Load the lines of a set of orders, grouped by order id.
    async fn lines_for(
        &self,
        ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id: OrderId = row.try_get("order_id")?;
            let quantity: i32 = row.try_get("quantity")?;
            let quantity = u32::try_from(quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("negative quantity on order {order_id}"))
            })?;

            let product_id: ProductId = row.try_get("product_id")?;
            let price: Decimal = row.try_get("product_price")?;

            grouped.entry(order_id).or_default().push(OrderLine {
                quantity,
                product: ProductSnapshot {
                    product_id,
                    title: row.try_get("product_title")?,
                    price,
                    description: row.try_get("product_description")?,
                    image_path: row.try_get("product_image_path")?,
                },
            });
        }

        Ok(grouped)
    }
}

/// Map an `orders` row (without lines) into the domain type.
fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order, RepositoryError> {
    let email: String = row.try_get("user_email")?;
    let email = Email::parse(&email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Order {
        id: row.try_get("id")?,
        user: OrderUser {
            user_id: row.try_get("user_id")?,
            email,
        },
        lines: Vec::new(),
        created_at,
    })
}
