//! Cart route handlers.
//!
//! Signed-in shoppers work on their database cart, everyone else on the
//! session cart. Every action answers 200 with `{"success", "message"}`;
//! failures carry a message prefixed with the action that failed.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use serde_json::{Value, json};
use thiserror::Error;
use tower_sessions::Session;
use tracing::{error, instrument};

use shanghuyun_core::{ProductId, VendorId, decimal_to_f64};

use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::db::vendors::VendorRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CartLine, CartTotals, CurrentUser, Product};
use crate::routes::PageContext;
use crate::services::cart::SessionCart;
use crate::services::orders::read_int;
use crate::state::AppState;

/// Why a cart action failed. The message follows the action prefix.
#[derive(Debug, Error)]
enum CartActionError {
    #[error("無效的請求資料")]
    InvalidBody,

    #[error("商品不存在")]
    ProductNotFound,

    #[error("商品數量必須大於 0")]
    InvalidQuantity,

    #[error("系統錯誤，請稍後再試")]
    Repository(#[from] RepositoryError),

    #[error("系統錯誤，請稍後再試")]
    Session(#[from] tower_sessions::session::Error),
}

/// A parsed cart action body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CartRequest {
    product_id: ProductId,
    quantity: i32,
}

/// Parse `{"product_id", "quantity"}`; numbers may be strings and the
/// quantity defaults to 1.
fn parse_request(body: &[u8]) -> std::result::Result<CartRequest, CartActionError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| CartActionError::InvalidBody)?;
    let product_id = value
        .get("product_id")
        .and_then(read_int)
        .ok_or(CartActionError::InvalidBody)?;
    let quantity = value
        .get("quantity")
        .map_or(Some(1), read_int)
        .ok_or(CartActionError::InvalidBody)?;
    Ok(CartRequest {
        product_id: ProductId::new(product_id),
        quantity,
    })
}

fn failure(prefix: &str, err: &CartActionError) -> Json<Value> {
    if matches!(
        err,
        CartActionError::Repository(_) | CartActionError::Session(_)
    ) {
        error!(error = ?err, "Cart action failed");
    }
    Json(json!({ "success": false, "message": format!("{prefix}: {err}") }))
}

fn totals_json(message: &str, totals: CartTotals) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "total_items": totals.total_items,
        "total_price": decimal_to_f64(totals.total_price),
    }))
}

/// Current totals of whichever cart the shopper has.
async fn current_totals(
    state: &AppState,
    user: Option<&CurrentUser>,
    session: &Session,
) -> std::result::Result<CartTotals, RepositoryError> {
    match user {
        Some(user) => {
            let carts = CartRepository::new(state.pool());
            match carts.get_for_user(user.id).await? {
                Some(cart) => carts.totals(cart.id).await,
                None => Ok(CartTotals::default()),
            }
        }
        None => {
            let cart = SessionCart::load(session).await;
            Ok(CartTotals {
                total_items: cart.total_items(),
                total_price: cart.total_price(),
            })
        }
    }
}

// =============================================================================
// Cart page
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

/// Resolve session cart lines against the catalogue. Products that no
/// longer exist are left out.
async fn session_lines(
    state: &AppState,
    cart: &SessionCart,
) -> std::result::Result<Vec<CartLine>, RepositoryError> {
    let products = ProductRepository::new(state.pool());
    let vendors = VendorRepository::new(state.pool());
    let mut vendor_names: HashMap<VendorId, String> = HashMap::new();
    let mut lines = Vec::new();

    for (product_id, line) in cart.lines() {
        let Some(product) = products.get_by_id(product_id).await? else {
            continue;
        };
        if !vendor_names.contains_key(&product.vendor_id) {
            let name = vendors
                .get_by_id(product.vendor_id)
                .await?
                .map(|v| v.name)
                .unwrap_or_default();
            vendor_names.insert(product.vendor_id, name);
        }
        lines.push(CartLine {
            product_id,
            vendor_name: vendor_names
                .get(&product.vendor_id)
                .cloned()
                .unwrap_or_default(),
            vendor_id: Some(product.vendor_id),
            name: product.name,
            image: product.image,
            quantity: line.quantity,
            price: line.price,
            stock: product.stock,
        });
    }
    Ok(lines)
}

/// Display the cart page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let lines = match &page.user {
        Some(user) => {
            CartRepository::new(state.pool())
                .lines_for_user(user.id)
                .await?
        }
        None => session_lines(&state, &SessionCart::load(&session).await).await?,
    };
    let totals = CartTotals::from_lines(&lines);

    Ok(CartShowTemplate {
        page,
        lines,
        totals,
    })
}

// =============================================================================
// JSON actions
// =============================================================================

/// Add a product to the cart.
#[instrument(skip(state, session, body))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    body: Bytes,
) -> Json<Value> {
    match add_inner(&state, user.as_ref(), &session, &body).await {
        Ok(response) => response,
        Err(e) => failure("加入購物車失敗", &e),
    }
}

async fn add_inner(
    state: &AppState,
    user: Option<&CurrentUser>,
    session: &Session,
    body: &[u8],
) -> std::result::Result<Json<Value>, CartActionError> {
    let req = parse_request(body)?;
    if req.quantity < 1 {
        return Err(CartActionError::InvalidQuantity);
    }
    let product = ProductRepository::new(state.pool())
        .get_active(req.product_id)
        .await?
        .ok_or(CartActionError::ProductNotFound)?;

    if product.stock < req.quantity {
        return Ok(Json(json!({
            "success": false,
            "message": format!("庫存不足，目前僅有 {} 件", product.stock),
        })));
    }

    let total_items = match user {
        Some(user) => {
            let carts = CartRepository::new(state.pool());
            let cart = carts.get_or_create(user.id).await?;
            carts.add_item(cart.id, &product, req.quantity).await?;
            carts.totals(cart.id).await?.total_items
        }
        None => {
            let mut cart = SessionCart::load(session).await;
            cart.add(product.id, product.price, req.quantity, false);
            cart.save(session).await?;
            cart.total_items()
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "商品已成功加入購物車",
        "total_items": total_items,
    })))
}

/// Look up a product that may be inactive; carts can still hold it.
async fn existing_product(
    state: &AppState,
    product_id: ProductId,
) -> std::result::Result<Product, CartActionError> {
    ProductRepository::new(state.pool())
        .get_by_id(product_id)
        .await?
        .ok_or(CartActionError::ProductNotFound)
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(state, session, body))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    body: Bytes,
) -> Json<Value> {
    match update_inner(&state, user.as_ref(), &session, &body).await {
        Ok(totals) => totals_json("購物車已更新", totals),
        Err(e) => failure("更新失敗", &e),
    }
}

async fn update_inner(
    state: &AppState,
    user: Option<&CurrentUser>,
    session: &Session,
    body: &[u8],
) -> std::result::Result<CartTotals, CartActionError> {
    let req = parse_request(body)?;
    let product = existing_product(state, req.product_id).await?;

    match user {
        Some(user) => {
            let carts = CartRepository::new(state.pool());
            let cart = carts.get_or_create(user.id).await?;
            carts
                .update_item_quantity(cart.id, product.id, req.quantity)
                .await?;
        }
        None => {
            let mut cart = SessionCart::load(session).await;
            if req.quantity <= 0 {
                cart.remove(product.id);
            } else {
                cart.add(product.id, product.price, req.quantity, true);
            }
            cart.save(session).await?;
        }
    }
    Ok(current_totals(state, user, session).await?)
}

/// Remove a product from the cart.
#[instrument(skip(state, session, body))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    body: Bytes,
) -> Json<Value> {
    match remove_inner(&state, user.as_ref(), &session, &body).await {
        Ok(totals) => totals_json("商品已從購物車移除", totals),
        Err(e) => failure("移除失敗", &e),
    }
}

async fn remove_inner(
    state: &AppState,
    user: Option<&CurrentUser>,
    session: &Session,
    body: &[u8],
) -> std::result::Result<CartTotals, CartActionError> {
    let req = parse_request(body)?;
    let product = existing_product(state, req.product_id).await?;

    match user {
        Some(user) => {
            let carts = CartRepository::new(state.pool());
            let cart = carts.get_or_create(user.id).await?;
            carts.remove_item(cart.id, product.id).await?;
        }
        None => {
            let mut cart = SessionCart::load(session).await;
            cart.remove(product.id);
            cart.save(session).await?;
        }
    }
    Ok(current_totals(state, user, session).await?)
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Json<Value> {
    match clear_inner(&state, user.as_ref(), &session).await {
        Ok(()) => Json(json!({ "success": true, "message": "購物車已清空" })),
        Err(e) => failure("清空失敗", &e),
    }
}

async fn clear_inner(
    state: &AppState,
    user: Option<&CurrentUser>,
    session: &Session,
) -> std::result::Result<(), CartActionError> {
    match user {
        Some(user) => {
            let carts = CartRepository::new(state.pool());
            let cart = carts.get_or_create(user.id).await?;
            carts.clear(cart.id).await?;
        }
        None => {
            let mut cart = SessionCart::load(session).await;
            cart.clear();
            cart.save(session).await?;
        }
    }
    Ok(())
}

/// `{"count": N}` for the header badge.
#[instrument(skip(state, session))]
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Json<Value> {
    let count = current_totals(&state, user.as_ref(), &session)
        .await
        .map(|t| t.total_items)
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to count cart items");
            0
        });
    Json(json!({ "count": count }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_defaults_quantity() {
        let req = parse_request(br#"{"product_id": 7}"#).unwrap();
        assert_eq!(req.product_id, ProductId::new(7));
        assert_eq!(req.quantity, 1);
    }

    #[test]
    fn test_parse_request_accepts_numeric_strings() {
        let req = parse_request(br#"{"product_id": "3", "quantity": "0"}"#).unwrap();
        assert_eq!(req.product_id, ProductId::new(3));
        assert_eq!(req.quantity, 0);
    }

    #[test]
    fn test_parse_request_rejects_garbage() {
        assert!(matches!(
            parse_request(b"not json"),
            Err(CartActionError::InvalidBody)
        ));
        assert!(parse_request(br#"{"quantity": 2}"#).is_err());
        assert!(parse_request(br#"{"product_id": "x"}"#).is_err());
    }

    #[test]
    fn test_failure_message_has_action_prefix() {
        let Json(body) = failure("移除失敗", &CartActionError::ProductNotFound);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("移除失敗: 商品不存在"));
    }

    #[test]
    fn test_non_positive_add_message() {
        let Json(body) = failure("加入購物車失敗", &CartActionError::InvalidQuantity);
        assert_eq!(body["message"], json!("加入購物車失敗: 商品數量必須大於 0"));
    }

    #[test]
    fn test_totals_json_amounts_are_numbers() {
        let Json(body) = totals_json(
            "購物車已更新",
            CartTotals {
                total_items: 3,
                total_price: rust_decimal::Decimal::new(45050, 2),
            },
        );
        assert_eq!(body["total_items"], json!(3));
        assert_eq!(body["total_price"], json!(450.5));
    }
}
