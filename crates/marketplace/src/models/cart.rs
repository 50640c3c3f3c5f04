//! Cart rows and the view shared by session and database carts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use shanghuyun_core::{CartId, CartItemId, ProductId, UserId, VendorId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A database cart line joined with its product and vendor.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub product_name: String,
    pub product_image: Option<String>,
    pub stock: i32,
    pub vendor_id: VendorId,
    pub vendor_name: String,
}

/// One line on the cart page, whichever cart it came from.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub vendor_id: Option<VendorId>,
    pub vendor_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub stock: i32,
}

impl CartLine {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl From<CartItem> for CartLine {
    fn from(item: CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.product_name,
            image: item.product_image,
            vendor_id: Some(item.vendor_id),
            vendor_name: item.vendor_name,
            quantity: item.quantity,
            price: item.price,
            stock: item.stock,
        }
    }
}

/// Cart totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartTotals {
    pub total_items: i64,
    pub total_price: Decimal,
}

impl CartTotals {
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        Self {
            total_items: lines.iter().map(|l| i64::from(l.quantity)).sum(),
            total_price: lines.iter().map(CartLine::total).sum(),
        }
    }
}
