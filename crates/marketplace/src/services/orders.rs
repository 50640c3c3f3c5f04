//! Order request parsing and planning.
//!
//! The database side of order creation lives in
//! [`crate::db::orders::OrderRepository::create_order`]; it locks the
//! referenced products and hands them to [`plan_order`], which decides
//! whether the order can be placed and what it costs.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use shanghuyun_core::{ProductId, decimal_to_f64};

use crate::db::RepositoryError;

/// Errors while creating an order.
///
/// The `Display` text of every variant is the exact message returned to
/// the client.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("No items provided")]
    NoItems,

    #[error("Invalid product data: {0}")]
    InvalidLine(String),

    #[error("Invalid quantity for product {0}")]
    InvalidQuantity(ProductId),

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: i32,
        requested: i32,
    },

    #[error("Order creation failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

impl OrderError {
    /// Whether the failure is the client's fault (400) rather than ours (500).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A product row as seen under the order transaction's lock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
}

/// A validated order line with its price snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl PlannedLine {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The outcome of planning: lines to insert and the order total.
#[derive(Debug, Clone)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Decimal,
}

/// An order that was committed.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: shanghuyun_core::OrderId,
    pub merchant_trade_no: String,
    pub plan: OrderPlan,
}

/// JSON line of the create-order response.
#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub total: f64,
}

impl From<&PlannedLine> for OrderItemResponse {
    fn from(line: &PlannedLine) -> Self {
        Self {
            product_id: line.product_id.as_i32(),
            name: line.name.clone(),
            quantity: line.quantity,
            price: decimal_to_f64(line.price),
            total: decimal_to_f64(line.total()),
        }
    }
}

/// Parse the `items` array of a create-order body.
///
/// `product_id` and `quantity` may be integers or numeric strings;
/// `quantity` defaults to 1 and a missing `product_id` reads as 0.
///
/// # Errors
///
/// Returns `NoItems` for a missing or empty list, `InvalidLine` for a
/// line that is not an object of integers, and `InvalidQuantity` for a
/// quantity below 1.
pub fn parse_items(body: &Value) -> Result<Vec<OrderLineRequest>, OrderError> {
    let items = match body.get("items") {
        None | Some(Value::Null) => return Err(OrderError::NoItems),
        Some(Value::Array(items)) if items.is_empty() => return Err(OrderError::NoItems),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(OrderError::InvalidLine(other.to_string())),
    };

    items
        .iter()
        .map(|item| {
            let invalid = || OrderError::InvalidLine(item.to_string());
            let Value::Object(fields) = item else {
                return Err(invalid());
            };
            let product_id = fields
                .get("product_id")
                .map_or(Some(0), read_int)
                .ok_or_else(invalid)?;
            let quantity = fields
                .get("quantity")
                .map_or(Some(1), read_int)
                .ok_or_else(invalid)?;

            let product_id = ProductId::new(product_id);
            if quantity <= 0 {
                return Err(OrderError::InvalidQuantity(product_id));
            }
            Ok(OrderLineRequest {
                product_id,
                quantity,
            })
        })
        .collect()
}

pub(crate) fn read_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Merge repeated product ids, keeping first-seen order.
#[must_use]
pub fn merge_lines(requests: &[OrderLineRequest]) -> Vec<OrderLineRequest> {
    let mut merged: Vec<OrderLineRequest> = Vec::with_capacity(requests.len());
    for req in requests {
        match merged.iter_mut().find(|m| m.product_id == req.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(req.quantity),
            None => merged.push(*req),
        }
    }
    merged
}

/// Validate requested lines against locked product rows.
///
/// # Errors
///
/// Returns `ProductNotFound` for missing or inactive products and
/// `InsufficientStock` when the summed quantity exceeds stock.
pub fn plan_order(
    requests: &[OrderLineRequest],
    products: &[LockedProduct],
) -> Result<OrderPlan, OrderError> {
    let lines = merge_lines(requests)
        .into_iter()
        .map(|req| {
            let product = products
                .iter()
                .find(|p| p.id == req.product_id && p.is_active)
                .ok_or(OrderError::ProductNotFound(req.product_id))?;
            if product.stock < req.quantity {
                return Err(OrderError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                    requested: req.quantity,
                });
            }
            Ok(PlannedLine {
                product_id: product.id,
                name: product.name.clone(),
                quantity: req.quantity,
                price: product.price,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total = lines.iter().map(PlannedLine::total).sum();
    Ok(OrderPlan { lines, total })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(id: i32, name: &str, price: i64, stock: i32) -> LockedProduct {
        LockedProduct {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(price, 0),
            stock,
            is_active: true,
        }
    }

    fn line(id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_parse_items_accepts_numeric_strings_and_default_quantity() {
        let body = json!({"items": [
            {"product_id": "3", "quantity": "2"},
            {"product_id": 5}
        ]});
        let items = parse_items(&body).unwrap();
        assert_eq!(items, vec![line(3, 2), line(5, 1)]);
    }

    #[test]
    fn test_parse_items_requires_items() {
        assert!(matches!(parse_items(&json!({})), Err(OrderError::NoItems)));
        assert!(matches!(
            parse_items(&json!({"items": []})),
            Err(OrderError::NoItems)
        ));
    }

    #[test]
    fn test_parse_items_rejects_bad_values() {
        let err = parse_items(&json!({"items": [{"product_id": "abc"}]})).unwrap_err();
        assert!(err.to_string().starts_with("Invalid product data:"));

        let err = parse_items(&json!({"items": [{"product_id": 4, "quantity": 0}]})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity for product 4");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_plan_order_computes_total() {
        let products = [product(1, "高山茶", 350, 10), product(2, "有機米", 120, 3)];
        let plan = plan_order(&[line(1, 2), line(2, 3)], &products).unwrap();
        assert_eq!(plan.total, Decimal::new(1060, 0));
        assert_eq!(plan.lines.len(), 2);
    }

    #[test]
    fn test_plan_order_sums_repeated_products_before_stock_check() {
        let products = [product(1, "高山茶", 350, 3)];
        let err = plan_order(&[line(1, 2), line(1, 2)], &products).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 高山茶. Available: 3, Requested: 4"
        );
    }

    #[test]
    fn test_plan_order_rejects_missing_or_inactive_product() {
        let mut inactive = product(2, "下架品", 10, 5);
        inactive.is_active = false;
        let err = plan_order(&[line(2, 1)], &[inactive]).unwrap_err();
        assert_eq!(err.to_string(), "Product 2 not found");

        let err = plan_order(&[line(9, 1)], &[]).unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(id) if id.as_i32() == 9));
    }

    #[test]
    fn test_plan_order_allows_exact_stock() {
        let products = [product(1, "蜂蜜", 500, 2)];
        assert!(plan_order(&[line(1, 2)], &products).is_ok());
    }

    #[test]
    fn test_item_response_amounts_are_numbers() {
        let planned = PlannedLine {
            product_id: ProductId::new(1),
            name: "蜂蜜".to_string(),
            quantity: 3,
            price: Decimal::new(1250, 2),
        };
        let json = serde_json::to_value(OrderItemResponse::from(&planned)).unwrap();
        assert_eq!(json["total"], json!(37.5));
        assert_eq!(json["price"], json!(12.5));
    }
}
