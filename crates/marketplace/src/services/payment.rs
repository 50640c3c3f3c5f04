//! ECPay AIO checkout support.
//!
//! Builds the signed parameter set for the hosted checkout form and
//! verifies the `CheckMacValue` on gateway callbacks.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use thiserror::Error;

use shanghuyun_core::{OrderId, round_half_up};

use crate::config::EcpayConfig;

/// Name of the checksum field in gateway requests and responses.
pub const CHECK_MAC_FIELD: &str = "CheckMacValue";

/// Description shown on the gateway's payment page.
const TRADE_DESC: &str = "訂單付款";

/// Taiwan local time offset used for `MerchantTradeDate`.
const TAIPEI_OFFSET_SECS: i32 = 8 * 3600;

/// Gateway acknowledgement bodies.
pub const ACK_OK: &str = "1|OK";
pub const ACK_FAIL: &str = "0|Fail";

/// Errors while preparing a checkout.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("order has no merchant trade number")]
    MissingTradeNo,

    #[error("order has no items")]
    EmptyOrder,

    #[error("invalid order total: {0}")]
    InvalidAmount(Decimal),

    #[error("invalid timezone offset")]
    Timezone,
}

/// One line of the `ItemName` field.
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub name: String,
    pub quantity: i32,
}

/// Everything needed to sign a checkout for one order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub merchant_trade_no: Option<&'a str>,
    pub total_amount: Decimal,
    pub lines: &'a [CheckoutLine],
    /// Server-to-server notify endpoint (`ReturnURL`).
    pub return_url: String,
    /// Where the shopper's browser lands after payment (`ClientBackURL`).
    pub client_back_url: String,
    /// Browser POST target with the payment result (`OrderResultURL`).
    pub order_result_url: String,
    pub now: DateTime<Utc>,
}

/// Generate a merchant trade number: the order id followed by six
/// uppercase hex characters. Always at most 20 characters.
#[must_use]
pub fn merchant_trade_no(order_id: OrderId) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    let suffix = random.get(..6).unwrap_or("000000");
    format!("{}{suffix}", order_id.as_i32())
}

/// Build the `ItemName` value (`name*qty` joined with `#`).
#[must_use]
pub fn item_name(lines: &[CheckoutLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{}*{}", l.name, l.quantity))
        .collect::<Vec<_>>()
        .join("#")
}

/// Build the signed form fields for the hosted checkout page.
///
/// # Errors
///
/// Returns `PaymentError` if the order has no trade number, no items, or
/// a total that cannot be expressed as a positive whole amount.
pub fn checkout_params(
    config: &EcpayConfig,
    request: &CheckoutRequest<'_>,
) -> Result<Vec<(String, String)>, PaymentError> {
    let trade_no = request
        .merchant_trade_no
        .filter(|s| !s.is_empty())
        .ok_or(PaymentError::MissingTradeNo)?;
    if request.lines.is_empty() {
        return Err(PaymentError::EmptyOrder);
    }
    let total = round_half_up(request.total_amount);
    if total <= 0 {
        return Err(PaymentError::InvalidAmount(request.total_amount));
    }

    let offset = FixedOffset::east_opt(TAIPEI_OFFSET_SECS).ok_or(PaymentError::Timezone)?;
    let trade_date = request
        .now
        .with_timezone(&offset)
        .format("%Y/%m/%d %H:%M:%S")
        .to_string();

    let mut params: Vec<(String, String)> = [
        ("MerchantID", config.merchant_id.clone()),
        ("MerchantTradeNo", trade_no.to_string()),
        ("MerchantTradeDate", trade_date),
        ("PaymentType", "aio".to_string()),
        ("TotalAmount", total.to_string()),
        ("TradeDesc", TRADE_DESC.to_string()),
        ("ItemName", item_name(request.lines)),
        ("ReturnURL", request.return_url.clone()),
        ("ChoosePayment", "ALL".to_string()),
        ("ClientBackURL", request.client_back_url.clone()),
        ("OrderResultURL", request.order_result_url.clone()),
        ("EncryptType", "1".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let mac = check_mac_value(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        config.hash_key.expose_secret(),
        config.hash_iv.expose_secret(),
    );
    params.push((CHECK_MAC_FIELD.to_string(), mac));
    Ok(params)
}

/// Compute the SHA-256 `CheckMacValue` for a parameter set.
///
/// Any `CheckMacValue` entry in `params` is ignored.
pub fn check_mac_value<'a>(
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
    hash_key: &str,
    hash_iv: &str,
) -> String {
    let encoded = mac_source(params, hash_key, hash_iv);
    hex::encode_upper(Sha256::digest(encoded.as_bytes()))
}

/// The encoded string that gets hashed.
fn mac_source<'a>(
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
    hash_key: &str,
    hash_iv: &str,
) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(k, _)| *k != CHECK_MAC_FIELD)
        .collect();
    pairs.sort_by_key(|(k, _)| k.to_lowercase());

    let body = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let raw = format!("HashKey={hash_key}&{body}&HashIV={hash_iv}");

    let encoded = urlencoding::encode(&raw).replace("%20", "+").to_lowercase();
    dotnet_unescape(&encoded)
}

/// Undo the escapes that .NET's `UrlEncode` leaves as literals.
fn dotnet_unescape(encoded: &str) -> String {
    [
        ("%2d", "-"),
        ("%5f", "_"),
        ("%2e", "."),
        ("%21", "!"),
        ("%2a", "*"),
        ("%28", "("),
        ("%29", ")"),
    ]
    .iter()
    .fold(encoded.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Verify the `CheckMacValue` of a gateway callback.
///
/// The comparison is case-insensitive and constant-time.
#[must_use]
pub fn verify_check_mac_value(data: &HashMap<String, String>, hash_key: &str, hash_iv: &str) -> bool {
    let Some(received) = data.get(CHECK_MAC_FIELD) else {
        return false;
    };
    let expected = check_mac_value(
        data.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        hash_key,
        hash_iv,
    );
    constant_time_eq(
        expected.as_bytes(),
        received.trim().to_ascii_uppercase().as_bytes(),
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Whether a callback reports a successful payment.
#[must_use]
pub fn is_success(data: &HashMap<String, String>) -> bool {
    data.get("RtnCode").is_some_and(|code| code == "1")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use secrecy::SecretString;

    use crate::config::EcpayEnvironment;

    const KEY: &str = "pwFHCqoQZGmho4w6";
    const IV: &str = "EkRm7iFT261dpevs";

    fn config() -> EcpayConfig {
        EcpayConfig {
            merchant_id: "3002607".to_string(),
            hash_key: SecretString::from(KEY),
            hash_iv: SecretString::from(IV),
            environment: EcpayEnvironment::Stage,
        }
    }

    fn signed(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut data: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mac = check_mac_value(pairs.iter().copied(), KEY, IV);
        data.insert(CHECK_MAC_FIELD.to_string(), mac);
        data
    }

    #[test]
    fn test_mac_source_sorts_case_insensitively_and_encodes() {
        let source = mac_source(
            [("b", "x y"), ("A", "1"), ("CheckMacValue", "ignored")],
            "K",
            "V",
        );
        assert_eq!(source, "hashkey%3dk%26a%3d1%26b%3dx+y%26hashiv%3dv");
    }

    #[test]
    fn test_mac_source_keeps_dotnet_literals() {
        let source = mac_source([("Url", "a-b_c.d!e*f(g)")], "K", "V");
        assert!(source.contains("a-b_c.d!e*f(g)"));
    }

    #[test]
    fn test_check_mac_value_is_uppercase_sha256() {
        let mac = check_mac_value([("MerchantID", "3002607")], KEY, IV);
        assert_eq!(mac.len(), 64);
        assert!(mac.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_check_mac_value_ignores_param_order() {
        let a = check_mac_value([("RtnCode", "1"), ("MerchantTradeNo", "12AB34CD")], KEY, IV);
        let b = check_mac_value([("MerchantTradeNo", "12AB34CD"), ("RtnCode", "1")], KEY, IV);
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_accepts_valid_and_lowercase_mac() {
        let mut data = signed(&[("MerchantTradeNo", "7A1B2C3"), ("RtnCode", "1")]);
        assert!(verify_check_mac_value(&data, KEY, IV));

        let lower = data.get(CHECK_MAC_FIELD).unwrap().to_lowercase();
        data.insert(CHECK_MAC_FIELD.to_string(), lower);
        assert!(verify_check_mac_value(&data, KEY, IV));
    }

    #[test]
    fn test_verify_rejects_tampered_or_missing_mac() {
        let mut data = signed(&[("MerchantTradeNo", "7A1B2C3"), ("RtnCode", "0")]);
        data.insert("RtnCode".to_string(), "1".to_string());
        assert!(!verify_check_mac_value(&data, KEY, IV));

        data.remove(CHECK_MAC_FIELD);
        assert!(!verify_check_mac_value(&data, KEY, IV));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let data = signed(&[("MerchantTradeNo", "7A1B2C3"), ("RtnCode", "1")]);
        assert!(!verify_check_mac_value(&data, "otherkey", IV));
    }

    #[test]
    fn test_merchant_trade_no_format() {
        let no = merchant_trade_no(OrderId::new(1234));
        assert!(no.starts_with("1234"));
        assert_eq!(no.len(), 10);
        assert!(no.get(4..).unwrap().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_checkout_params_are_signed() {
        let lines = vec![
            CheckoutLine { name: "高山茶".to_string(), quantity: 2 },
            CheckoutLine { name: "有機米".to_string(), quantity: 1 },
        ];
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 16, 30, 0).unwrap();
        let request = CheckoutRequest {
            merchant_trade_no: Some("15ABCDEF"),
            total_amount: Decimal::new(60050, 2),
            lines: &lines,
            return_url: "https://shop.example/api/v1/payment/notify".to_string(),
            client_back_url: "https://shop.example/api/v1/order/result?order_id=15".to_string(),
            order_result_url: "https://shop.example/api/v1/payment/order_result".to_string(),
            now,
        };

        let params = checkout_params(&config(), &request).unwrap();
        let map: HashMap<String, String> = params.into_iter().collect();

        assert_eq!(map.get("TotalAmount").unwrap(), "601");
        assert_eq!(map.get("ItemName").unwrap(), "高山茶*2#有機米*1");
        assert_eq!(map.get("MerchantTradeDate").unwrap(), "2026/03/02 00:30:00");
        assert_eq!(map.get("EncryptType").unwrap(), "1");
        assert!(verify_check_mac_value(&map, KEY, IV));
    }

    #[test]
    fn test_checkout_requires_trade_no_and_items() {
        let now = Utc::now();
        let lines = vec![CheckoutLine { name: "茶".to_string(), quantity: 1 }];
        let mut request = CheckoutRequest {
            merchant_trade_no: None,
            total_amount: Decimal::ONE,
            lines: &lines,
            return_url: String::new(),
            client_back_url: String::new(),
            order_result_url: String::new(),
            now,
        };
        assert!(matches!(
            checkout_params(&config(), &request),
            Err(PaymentError::MissingTradeNo)
        ));

        request.merchant_trade_no = Some("1ABCDEF");
        request.lines = &[];
        assert!(matches!(
            checkout_params(&config(), &request),
            Err(PaymentError::EmptyOrder)
        ));
    }

    #[test]
    fn test_is_success() {
        let mut data = HashMap::new();
        assert!(!is_success(&data));
        data.insert("RtnCode".to_string(), "1".to_string());
        assert!(is_success(&data));
        data.insert("RtnCode".to_string(), "10300066".to_string());
        assert!(!is_success(&data));
    }
}
