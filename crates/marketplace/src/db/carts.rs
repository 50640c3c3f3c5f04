//! Database cart repository.
//!
//! Line prices are snapshots taken when a product is first added; later
//! additions only change the quantity.

use sqlx::PgPool;

use shanghuyun_core::{CartId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem, CartLine, CartTotals};
use crate::models::catalog::Product;

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row too.
        let cart = sqlx::query_as::<_, Cart>(
            r"
            INSERT INTO marketplace.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at, updated_at
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(cart)
    }

    /// The user's cart if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM marketplace.cart WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(cart)
    }

    /// Cart lines joined with product and vendor, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(
            r"
            SELECT ci.id, ci.product_id, ci.quantity, ci.price,
                   p.name AS product_name, p.image AS product_image, p.stock,
                   v.id AS vendor_id, v.name AS vendor_name
            FROM marketplace.cart_item ci
            JOIN marketplace.product p ON p.id = ci.product_id
            JOIN marketplace.vendor v ON v.id = p.vendor_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// The user's cart lines; empty when they have no cart yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let Some(cart) = self.get_for_user(user_id).await? else {
            return Ok(Vec::new());
        };
        Ok(self
            .items(cart.id)
            .await?
            .into_iter()
            .map(CartLine::from)
            .collect())
    }

    /// Add `quantity` of a product, creating the line at the product's
    /// current price if it is new.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product: &Product,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        self.add_items(cart_id, &[(product, quantity)]).await
    }

    /// Add several lines in one transaction; either all land or none do.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn add_items(
        &self,
        cart_id: CartId,
        lines: &[(&Product, i32)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (product, quantity) in lines {
            sqlx::query(
                r"
                INSERT INTO marketplace.cart_item (cart_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (cart_id, product_id)
                DO UPDATE SET quantity = marketplace.cart_item.quantity + EXCLUDED.quantity,
                              updated_at = NOW()
                ",
            )
            .bind(cart_id)
            .bind(product.id)
            .bind(quantity)
            .bind(product.price)
            .execute(&mut *tx)
            .await?;
        }

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        if quantity <= 0 {
            self.remove_item(cart_id, product_id).await?;
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            UPDATE marketplace.cart_item SET quantity = $3, updated_at = NOW()
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;
        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove a line; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "DELETE FROM marketplace.cart_item WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM marketplace.cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Item count and price total for a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self, cart_id: CartId) -> Result<CartTotals, RepositoryError> {
        let (total_items, total_price) = sqlx::query_as::<_, (i64, rust_decimal::Decimal)>(
            r"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT,
                   COALESCE(SUM(price * quantity), 0)::NUMERIC(12, 2)
            FROM marketplace.cart_item
            WHERE cart_id = $1
            ",
        )
        .bind(cart_id)
        .fetch_one(self.pool)
        .await?;
        Ok(CartTotals {
            total_items,
            total_price,
        })
    }

    /// Delete carts without items that were last touched more than `days`
    /// days ago. Returns the number of carts removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_empty_older_than(&self, days: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM marketplace.cart c
            WHERE c.updated_at < NOW() - make_interval(days => $1::INT)
              AND NOT EXISTS (
                  SELECT 1 FROM marketplace.cart_item ci WHERE ci.cart_id = c.id
              )
            ",
        )
        .bind(days)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

async fn touch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cart_id: CartId,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE marketplace.cart SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
