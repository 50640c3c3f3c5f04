//! Shopping cart operations.
//!
//! Signed-in shoppers use the database cart ([`crate::db::carts`]).
//! Anonymous shoppers keep a [`SessionCart`] in their session under
//! [`keys::CART`](crate::models::session::keys::CART); it is folded into
//! the database cart when they sign in.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};

use shanghuyun_core::{ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::models::catalog::Product;
use crate::models::session::keys;

/// One session cart line. The price is the product price when first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCartLine {
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// Cart stored in the session as `{"<product id>": {quantity, price}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCart {
    lines: BTreeMap<String, SessionCartLine>,
}

impl SessionCart {
    /// Load the cart from the session; a missing or unreadable entry is empty.
    pub async fn load(session: &Session) -> Self {
        match session.get::<Self>(keys::CART).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to read session cart");
                Self::default()
            }
        }
    }

    /// Write the cart back to the session.
    ///
    /// # Errors
    ///
    /// Returns the session store error.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::CART, self).await
    }

    /// Remove the cart from the session.
    ///
    /// # Errors
    ///
    /// Returns the session store error.
    pub async fn forget(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove::<Self>(keys::CART).await.map(|_| ())
    }

    /// Add `quantity` of a product, or set it when `override_quantity`.
    ///
    /// Adding less than one is ignored; overriding with less than one
    /// drops the line.
    pub fn add(&mut self, product_id: ProductId, price: Decimal, quantity: i32, override_quantity: bool) {
        if quantity < 1 {
            if override_quantity {
                self.remove(product_id);
            }
            return;
        }
        let line = self
            .lines
            .entry(product_id.to_string())
            .or_insert(SessionCartLine { quantity: 0, price });
        if override_quantity {
            line.quantity = quantity;
        } else {
            line.quantity = line.quantity.saturating_add(quantity);
        }
    }

    /// Drop a product; returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.lines.remove(&product_id.to_string()).is_some()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn total_items(&self) -> i64 {
        self.lines().map(|(_, l)| i64::from(l.quantity)).sum()
    }

    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines()
            .map(|(_, l)| l.price * Decimal::from(l.quantity))
            .sum()
    }

    /// Lines with parseable product ids and a positive quantity. Corrupt
    /// entries are skipped.
    pub fn lines(&self) -> impl Iterator<Item = (ProductId, &SessionCartLine)> {
        self.lines
            .iter()
            .filter(|(_, line)| line.quantity > 0)
            .filter_map(|(id, line)| id.parse::<ProductId>().ok().map(|id| (id, line)))
    }
}

/// Fold an anonymous session cart into the user's database cart.
///
/// Each line is added at the product's current price; products that no
/// longer exist are skipped. All lines are written in one transaction,
/// then the session cart is cleared.
///
/// # Errors
///
/// Returns `RepositoryError` if a database operation fails. The session
/// cart is left in place in that case.
pub async fn merge_session_cart(
    session: &Session,
    carts: &CartRepository<'_>,
    products: &ProductRepository<'_>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    let session_cart = SessionCart::load(session).await;
    if session_cart.is_empty() {
        return Ok(());
    }

    let mut found = Vec::new();
    for (product_id, line) in session_cart.lines() {
        if let Some(product) = products.get_by_id(product_id).await? {
            found.push((product, line.quantity));
        }
    }

    let cart = carts.get_or_create(user_id).await?;
    let lines: Vec<(&Product, i32)> = found.iter().map(|(p, q)| (p, *q)).collect();
    carts.add_items(cart.id, &lines).await?;
    let merged = lines.len();

    if let Err(e) = SessionCart::forget(session).await {
        warn!(error = %e, "Failed to clear session cart after merge");
    }
    info!(user_id = %user_id, lines = merged, "Merged session cart");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pid(id: i32) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_add_accumulates_quantity_and_keeps_first_price() {
        let mut cart = SessionCart::default();
        cart.add(pid(1), Decimal::new(100, 0), 2, false);
        cart.add(pid(1), Decimal::new(120, 0), 3, false);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), Decimal::new(500, 0));
    }

    #[test]
    fn test_add_ignores_non_positive_quantity() {
        let mut cart = SessionCart::default();
        cart.add(pid(1), Decimal::new(100, 0), -3, false);
        cart.add(pid(2), Decimal::new(100, 0), 0, false);
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);

        cart.add(pid(1), Decimal::new(100, 0), 2, false);
        cart.add(pid(1), Decimal::new(100, 0), -1, false);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn test_override_with_zero_drops_line() {
        let mut cart = SessionCart::default();
        cart.add(pid(1), Decimal::new(100, 0), 2, false);
        cart.add(pid(1), Decimal::new(100, 0), 0, true);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_stored_negative_lines_are_skipped() {
        let cart: SessionCart = serde_json::from_value(serde_json::json!({
            "1": {"quantity": -3, "price": "100"},
            "2": {"quantity": 2, "price": "50"}
        }))
        .unwrap();
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), Decimal::new(100, 0));
        let ids: Vec<ProductId> = cart.lines().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![pid(2)]);
    }

    #[test]
    fn test_add_with_override_sets_quantity() {
        let mut cart = SessionCart::default();
        cart.add(pid(1), Decimal::new(50, 0), 4, false);
        cart.add(pid(1), Decimal::new(50, 0), 1, true);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = SessionCart::default();
        cart.add(pid(1), Decimal::ONE, 1, false);
        cart.add(pid(2), Decimal::ONE, 1, false);
        assert!(cart.remove(pid(1)));
        assert!(!cart.remove(pid(1)));
        assert_eq!(cart.total_items(), 1);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_session_format_uses_string_keys_and_prices() {
        let mut cart = SessionCart::default();
        cart.add(pid(7), Decimal::new(19950, 2), 2, false);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"7": {"quantity": 2, "price": "199.50"}})
        );

        let back: SessionCart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_lines_skip_corrupt_keys() {
        let cart: SessionCart = serde_json::from_value(serde_json::json!({
            "3": {"quantity": 1, "price": "10.00"},
            "oops": {"quantity": 1, "price": "10.00"}
        }))
        .unwrap();
        let ids: Vec<i32> = cart.lines().map(|(id, _)| id.as_i32()).collect();
        assert_eq!(ids, vec![3]);
    }
}
