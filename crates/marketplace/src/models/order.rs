//! Orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use shanghuyun_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    /// Assigned right after insert; `None` only for rows created outside
    /// the order service.
    pub merchant_trade_no: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether `user` may see this order.
    #[must_use]
    pub fn visible_to(&self, user_id: UserId, is_staff: bool) -> bool {
        is_staff || self.user_id == user_id
    }
}

/// An order line joined with the product name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price when the order was placed.
    pub price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order with its items.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Per-status totals shown above the order history.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct OrderCounts {
    pub total: i64,
    pub pending: i64,
    pub paid: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_to_owner_or_staff() {
        let order = Order {
            id: OrderId::new(1),
            user_id: UserId::new(10),
            total_amount: Decimal::ONE,
            status: OrderStatus::Pending,
            merchant_trade_no: None,
            created_at: Utc::now(),
            paid_at: None,
        };
        assert!(order.visible_to(UserId::new(10), false));
        assert!(!order.visible_to(UserId::new(11), false));
        assert!(order.visible_to(UserId::new(11), true));
    }
}
