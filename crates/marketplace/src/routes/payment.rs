//! ECPay checkout and gateway callbacks.
//!
//! The gateway calls `notify` server-to-server and posts the shopper's
//! browser to `order_result`. Both are signed with `CheckMacValue`; an
//! unsigned or mis-signed request never touches an order.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use shanghuyun_core::{OrderId, OrderStatus};

use crate::db::RepositoryError;
use crate::db::orders::{OrderRepository, PaymentTransition};
use crate::error::{AppError, Result};
use crate::middleware::RequirePageAuth;
use crate::models::Order;
use crate::routes::PageContext;
use crate::services::payment::{
    ACK_FAIL, ACK_OK, CheckoutLine, CheckoutRequest, checkout_params, is_success,
    verify_check_mac_value,
};
use crate::state::AppState;

const NOTIFY_PATH: &str = "/api/v1/payment/notify";
const ORDER_RESULT_PATH: &str = "/api/v1/payment/order_result";

/// Default message when the gateway sends no `RtnMsg`.
const UNKNOWN_RESULT: &str = "交易結果未知";

/// Page that posts the signed checkout form to the gateway.
#[derive(Template, WebTemplate)]
#[template(path = "payment/checkout.html")]
pub struct CheckoutTemplate {
    pub action_url: &'static str,
    pub params: Vec<(String, String)>,
    pub nonce: String,
}

/// Render the auto-submitting checkout form for a pending order.
#[instrument(skip(state, page), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequirePageAuth(user): RequirePageAuth,
    Path(order_id): Path<OrderId>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let detail = OrderRepository::new(state.pool())
        .get_detail(order_id)
        .await?
        .filter(|detail| detail.order.visible_to(user.id, user.is_staff))
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id}")))?;

    if detail.order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "訂單狀態為{}，無法付款",
            detail.order.status.label()
        )));
    }

    let lines: Vec<CheckoutLine> = detail
        .items
        .iter()
        .map(|item| CheckoutLine {
            name: item.product_name.clone(),
            quantity: item.quantity,
        })
        .collect();

    let config = state.config();
    let request = CheckoutRequest {
        merchant_trade_no: detail.order.merchant_trade_no.as_deref(),
        total_amount: detail.order.total_amount,
        lines: &lines,
        return_url: config.absolute_url(NOTIFY_PATH),
        client_back_url: config.absolute_url(&format!("/api/v1/order/result?order_id={order_id}")),
        order_result_url: config.absolute_url(ORDER_RESULT_PATH),
        now: chrono::Utc::now(),
    };
    let params = checkout_params(&config.ecpay, &request).inspect_err(|e| {
        warn!(order_id = %order_id, error = %e, "ECPay checkout failed");
    })?;

    info!(order_id = %order_id, "Rendering ECPay checkout form");
    Ok(CheckoutTemplate {
        action_url: config.ecpay.environment.action_url(),
        params,
        nonce: page.nonce,
    })
}

/// Why a gateway callback was rejected before reaching an order.
enum CallbackRejection {
    BadCheckMac,
    OrderNotFound,
    Database(RepositoryError),
}

impl IntoResponse for CallbackRejection {
    fn into_response(self) -> Response {
        match self {
            Self::BadCheckMac => (StatusCode::BAD_REQUEST, "CheckMacValue error").into_response(),
            Self::OrderNotFound => (StatusCode::NOT_FOUND, "Order not found").into_response(),
            Self::Database(e) => AppError::from(e).into_response(),
        }
    }
}

/// Callback fields; a body that is not a form counts as no fields, so it
/// fails the checksum like any other unsigned request.
fn callback_fields(
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
    source: &str,
) -> HashMap<String, String> {
    match form {
        Ok(Form(data)) => data,
        Err(rejection) => {
            warn!(source, error = %rejection, "ECPay callback body is not a form");
            HashMap::new()
        }
    }
}

/// Verify the checksum and load the order named by `MerchantTradeNo`.
async fn callback_order(
    state: &AppState,
    data: &HashMap<String, String>,
    source: &str,
) -> std::result::Result<Order, CallbackRejection> {
    let ecpay = &state.config().ecpay;
    if !verify_check_mac_value(
        data,
        ecpay.hash_key.expose_secret(),
        ecpay.hash_iv.expose_secret(),
    ) {
        warn!(source, "ECPay checkmac validation failed");
        return Err(CallbackRejection::BadCheckMac);
    }

    let trade_no = data.get("MerchantTradeNo").map_or("", String::as_str);
    OrderRepository::new(state.pool())
        .get_by_trade_no(trade_no)
        .await
        .map_err(CallbackRejection::Database)?
        .ok_or_else(|| {
            warn!(source, merchant_trade_no = trade_no, "ECPay callback for unknown order");
            CallbackRejection::OrderNotFound
        })
}

/// Server-to-server payment notification.
#[instrument(skip(state, form))]
pub async fn notify(
    State(state): State<AppState>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let data = callback_fields(form, "notify");
    info!(fields = ?data.keys().collect::<Vec<_>>(), "ECPay notify received");

    let order = match callback_order(&state, &data, "notify").await {
        Ok(order) => order,
        Err(rejection) => return rejection.into_response(),
    };

    let repo = OrderRepository::new(state.pool());
    if is_success(&data) {
        match repo.mark_paid(order.id).await {
            Ok(PaymentTransition::Applied) => info!(order_id = %order.id, "Order marked as paid"),
            Ok(PaymentTransition::AlreadyPaid) => {
                info!(order_id = %order.id, "Repeated paid notification ignored");
            }
            Err(e) => return AppError::from(e).into_response(),
        }
        ACK_OK.into_response()
    } else {
        let message = data.get("RtnMsg").map_or("", String::as_str);
        match repo.mark_failed(order.id).await {
            Ok(PaymentTransition::Applied) => {
                info!(order_id = %order.id, rtn_msg = message, "Order payment failed");
            }
            Ok(PaymentTransition::AlreadyPaid) => {
                warn!(order_id = %order.id, rtn_msg = message, "Failure notification for paid order ignored");
            }
            Err(e) => return AppError::from(e).into_response(),
        }
        ACK_FAIL.into_response()
    }
}

/// Anything but POST on the callback endpoints.
pub async fn only_post() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "Only POST")
}

/// Interstitial shown after the shopper returns from the gateway.
#[derive(Template, WebTemplate)]
#[template(path = "payment/order_result.html")]
pub struct PaymentResultTemplate {
    pub success: bool,
    pub message: String,
    pub order_id: OrderId,
    pub redirect_url: String,
}

/// Browser redirect from the gateway with the payment result.
#[instrument(skip(state, form))]
pub async fn order_result(
    State(state): State<AppState>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let data = callback_fields(form, "order_result");
    let order = match callback_order(&state, &data, "order_result").await {
        Ok(order) => order,
        Err(rejection) => return rejection.into_response(),
    };

    let message = data
        .get("RtnMsg")
        .filter(|m| !m.is_empty())
        .map_or(UNKNOWN_RESULT, String::as_str)
        .to_string();

    PaymentResultTemplate {
        success: is_success(&data),
        message,
        order_id: order.id,
        redirect_url: state
            .config()
            .absolute_url(&format!("/api/v1/order/result?order_id={}", order.id)),
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(
            CallbackRejection::BadCheckMac.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CallbackRejection::OrderNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    async fn extract_form(
        content_type: &str,
        body: &'static str,
    ) -> std::result::Result<Form<HashMap<String, String>>, FormRejection> {
        use axum::extract::FromRequest;
        let request = axum::http::Request::post(NOTIFY_PATH)
            .header("content-type", content_type)
            .body(axum::body::Body::from(body))
            .unwrap();
        Form::from_request(request, &()).await
    }

    #[tokio::test]
    async fn test_non_form_callback_body_fails_checksum() {
        for (content_type, body) in [
            ("application/json", r#"{"RtnCode":"1"}"#),
            ("text/plain", "garbage"),
            ("application/x-www-form-urlencoded", ""),
        ] {
            let data = callback_fields(extract_form(content_type, body).await, "notify");
            assert!(data.is_empty(), "{content_type}");
            assert!(!verify_check_mac_value(&data, "pwFHCqoQZGmho4w6", "EkRm7iFT261dpevs"));
        }
    }

    #[tokio::test]
    async fn test_form_callback_body_is_kept() {
        let form = extract_form(
            "application/x-www-form-urlencoded",
            "MerchantTradeNo=12AB&RtnCode=1",
        )
        .await;
        let data = callback_fields(form, "notify");
        assert_eq!(data.get("RtnCode").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_checkout_form_renders_fields_and_nonce() {
        let html = CheckoutTemplate {
            action_url: "https://payment-stage.ecpay.com.tw/Cashier/AioCheckOut/V5",
            params: vec![
                ("MerchantTradeNo".to_string(), "12AB34CD".to_string()),
                ("ItemName".to_string(), "高山茶*2#\"蜂蜜\"*1".to_string()),
            ],
            nonce: "abc123".to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"action="https://payment-stage.ecpay.com.tw/Cashier/AioCheckOut/V5""#));
        assert!(html.contains(r#"name="MerchantTradeNo" value="12AB34CD""#));
        assert!(!html.contains("\"蜂蜜\""));
        assert!(html.contains(r#"nonce="abc123""#));
    }

    #[test]
    fn test_order_result_page_refreshes_to_order() {
        let html = PaymentResultTemplate {
            success: false,
            message: UNKNOWN_RESULT.to_string(),
            order_id: OrderId::new(42),
            redirect_url: "https://shop.example/api/v1/order/result?order_id=42".to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains("付款失敗"));
        assert!(html.contains("交易結果未知"));
        assert!(html.contains(r#"content="1;url=https://shop.example/api/v1/order/result?order_id=42""#));
    }
}
