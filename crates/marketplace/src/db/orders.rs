//! Order repository.
//!
//! Order creation runs in one transaction that locks every referenced
//! product row, so concurrent orders cannot oversell stock.

use sqlx::PgPool;
use tracing::info;

use shanghuyun_core::{OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderCounts, OrderDetail, OrderItem};
use crate::models::pagination::{Paginated, offset, resolve_page};
use crate::services::orders::{
    CreatedOrder, LockedProduct, OrderError, OrderLineRequest, plan_order,
};
use crate::services::payment;

/// Orders per page in the order history.
pub const HISTORY_PER_PAGE: i64 = 10;

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, merchant_trade_no, created_at, paid_at";

/// What a payment notification did to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTransition {
    /// The order's status changed.
    Applied,
    /// The order was already paid and was left alone.
    AlreadyPaid,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending order for `user_id`.
    ///
    /// Locks the products in id order, validates the lines, inserts the
    /// order and its items, decrements stock and recomputes each
    /// product's `sales_count`. Nothing is written unless every step
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns the planning errors of [`plan_order`] for bad lines and
    /// `OrderError::Repository` for database failures.
    pub async fn create_order(
        &self,
        user_id: UserId,
        requests: &[OrderLineRequest],
    ) -> Result<CreatedOrder, OrderError> {
        let mut product_ids: Vec<ProductId> = requests.iter().map(|r| r.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let ids: Vec<i32> = product_ids.iter().map(|id| id.as_i32()).collect();

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, LockedProduct>(
            r"
            SELECT id, name, price, stock, is_active
            FROM marketplace.product
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let plan = plan_order(requests, &locked)?;

        let order_id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO marketplace.orders (user_id, total_amount, status)
            VALUES ($1, $2, 'pending')
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(plan.total)
        .fetch_one(&mut *tx)
        .await?;

        let merchant_trade_no = payment::merchant_trade_no(order_id);
        sqlx::query("UPDATE marketplace.orders SET merchant_trade_no = $2 WHERE id = $1")
            .bind(order_id)
            .bind(&merchant_trade_no)
            .execute(&mut *tx)
            .await?;

        for line in &plan.lines {
            sqlx::query(
                r"
                INSERT INTO marketplace.order_item (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r"
                UPDATE marketplace.product SET
                    stock = stock - $2,
                    sales_count = (
                        SELECT COALESCE(SUM(quantity), 0)::INT
                        FROM marketplace.order_item
                        WHERE product_id = $1
                    ),
                    updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order_id,
            user_id = %user_id,
            total = %plan.total,
            lines = plan.lines.len(),
            "Order created"
        );

        Ok(CreatedOrder {
            order_id,
            merchant_trade_no,
            plan,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM marketplace.orders WHERE id = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_trade_no(
        &self,
        merchant_trade_no: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM marketplace.orders WHERE merchant_trade_no = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(merchant_trade_no)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// Items of an order with product names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
                   oi.quantity, oi.price
            FROM marketplace.order_item oi
            JOIN marketplace.product p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(order.id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// One page of a user's orders, newest first, with their items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn history(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        raw_page: Option<&str>,
    ) -> Result<Paginated<OrderDetail>, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM marketplace.orders
            WHERE user_id = $1 AND ($2::marketplace.order_status IS NULL OR status = $2)
            ",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let page = resolve_page(raw_page, total, HISTORY_PER_PAGE);
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS} FROM marketplace.orders
            WHERE user_id = $1 AND ($2::marketplace.order_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(status)
            .bind(HISTORY_PER_PAGE)
            .bind(offset(page, HISTORY_PER_PAGE))
            .fetch_all(self.pool)
            .await?;

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.items(order.id).await?;
            details.push(OrderDetail { order, items });
        }

        Ok(Paginated::new(details, page, HISTORY_PER_PAGE, total))
    }

    /// Counts of all, pending and paid orders for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self, user_id: UserId) -> Result<OrderCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, OrderCounts>(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'paid') AS paid
            FROM marketplace.orders
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// Mark an order paid. A repeated notification for a paid order keeps
    /// the original `paid_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid(&self, id: OrderId) -> Result<PaymentTransition, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE marketplace.orders SET status = 'paid', paid_at = NOW()
            WHERE id = $1 AND status <> 'paid'
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(transition(result.rows_affected()))
    }

    /// Mark an order failed unless it is already paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_failed(&self, id: OrderId) -> Result<PaymentTransition, RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.orders SET status = 'failed' WHERE id = $1 AND status <> 'paid'",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(transition(result.rows_affected()))
    }
}

const fn transition(rows_affected: u64) -> PaymentTransition {
    if rows_affected > 0 {
        PaymentTransition::Applied
    } else {
        PaymentTransition::AlreadyPaid
    }
}
