//! Order creation, checkout form and ECPay callbacks.
//!
//! These tests require a running marketplace server and a seeded database.
//! The server must use the same `ECPAY_HASH_KEY` / `ECPAY_HASH_IV` as the
//! tests (ECPay's stage keys by default).

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use shanghuyun_integration_tests::{
    client, json_body, pool, product_in_stock, sign_callback, signup, url,
};

async fn create_order(client: &Client, product_id: i32, quantity: i32) -> Value {
    let resp = client
        .post(url("/api/v1/order/create"))
        .json(&json!({"items": [{"product_id": product_id, "quantity": quantity}]}))
        .send()
        .await
        .unwrap();
    json_body(resp, StatusCode::OK).await
}

async fn stock(pool: &PgPool, product_id: i32) -> i32 {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM marketplace.product WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap();
    stock
}

/// `(status, paid_at)` of an order, both as text.
async fn order_state(pool: &PgPool, order_id: i64) -> (String, Option<String>) {
    sqlx::query_as("SELECT status::TEXT, paid_at::TEXT FROM marketplace.orders WHERE id = $1")
        .bind(i32::try_from(order_id).unwrap())
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn order_count(pool: &PgPool, email: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM marketplace.orders o \
         JOIN marketplace.user u ON u.id = o.user_id WHERE u.email = $1",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .unwrap();
    count
}

async fn post_callback(client: &Client, path: &str, trade_no: &str, rtn_code: &str) -> reqwest::Response {
    let mut fields = vec![
        ("MerchantID", "3002607"),
        ("MerchantTradeNo", trade_no),
        ("RtnCode", rtn_code),
        ("RtnMsg", if rtn_code == "1" { "Succeeded" } else { "Failed" }),
        ("TradeAmt", "100"),
        ("PaymentType", "Credit_CreditCard"),
    ];
    let mac = sign_callback(&fields);
    fields.push(("CheckMacValue", mac.as_str()));
    client.post(url(path)).form(&fields).send().await.unwrap()
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_create_order_requires_login() {
    let resp = client()
        .post(url("/api/v1/order/create"))
        .json(&json!({"items": [{"product_id": 1}]}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["error"], json!("Authentication required"));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_create_order_validation_errors() {
    let client = client();
    signup(&client).await;

    let resp = client
        .post(url("/api/v1/order/create"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], json!("Invalid JSON format"));

    let resp = client
        .post(url("/api/v1/order/create"))
        .json(&json!({"items": []}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], json!("No items provided"));

    let resp = client
        .post(url("/api/v1/order/create"))
        .json(&json!({"items": [{"product_id": 999_999, "quantity": 1}]}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], json!("Product 999999 not found"));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_insufficient_stock_is_rejected() {
    let pool = pool().await;
    let (product_id, _) = product_in_stock(&pool).await;
    let client = client();
    let email = signup(&client).await;
    let stock_before = stock(&pool, product_id).await;

    let resp = client
        .post(url("/api/v1/order/create"))
        .json(&json!({"items": [{"product_id": product_id, "quantity": 1_000_000}]}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::BAD_REQUEST).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Insufficient stock for ")
    );

    assert_eq!(order_count(&pool, &email).await, 0);
    assert_eq!(stock(&pool, product_id).await, stock_before);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_concurrent_orders_never_oversell() {
    const STOCK: i32 = 3;
    const BUYERS: usize = 8;

    let pool = pool().await;
    let (template_id, _) = product_in_stock(&pool).await;
    let (product_id,): (i32,) = sqlx::query_as(
        "INSERT INTO marketplace.product (vendor_id, name, price, stock) \
         SELECT vendor_id, 'Limited harvest', 100, $2 FROM marketplace.product WHERE id = $1 \
         RETURNING id",
    )
    .bind(template_id)
    .bind(STOCK)
    .fetch_one(&pool)
    .await
    .unwrap();

    let mut buyers = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        let buyer = client();
        signup(&buyer).await;
        buyers.push(buyer);
    }

    let mut tasks = tokio::task::JoinSet::new();
    for buyer in buyers {
        tasks.spawn(async move {
            buyer
                .post(url("/api/v1/order/create"))
                .json(&json!({"items": [{"product_id": product_id, "quantity": 1}]}))
                .send()
                .await
                .unwrap()
                .status()
        });
    }

    let mut accepted = 0;
    while let Some(status) = tasks.join_next().await {
        match status.unwrap() {
            StatusCode::OK => accepted += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }

    let (items,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM marketplace.order_item WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let final_stock = stock(&pool, product_id).await;

    sqlx::query("DELETE FROM marketplace.product WHERE id = $1")
        .bind(product_id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(accepted, STOCK);
    assert_eq!(items, i64::from(STOCK));
    assert_eq!(final_stock, 0);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_order_checkout_and_paid_notification() {
    let pool = pool().await;
    let (product_id, price) = product_in_stock(&pool).await;
    let client = client();
    signup(&client).await;

    let stock_before = stock(&pool, product_id).await;

    let order = create_order(&client, product_id, 2).await;
    assert_eq!(order["success"], json!(true));
    assert_eq!(order["status"], json!("pending"));
    let total = order["total_amount"].as_f64().unwrap();
    assert!((total - price * 2.0).abs() < 0.001);

    let order_id = order["order_id"].as_i64().unwrap();
    let trade_no = order["merchant_trade_no"].as_str().unwrap().to_string();
    assert!(trade_no.starts_with(&order_id.to_string()));
    assert!(trade_no.len() <= 20);

    // Stock is reserved when the order is placed.
    assert_eq!(stock(&pool, product_id).await, stock_before - 2);

    // Checkout renders the auto-submitting form.
    let resp = client
        .get(url(&format!("/api/v1/payment/checkout/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("CheckMacValue"));
    assert!(html.contains(&trade_no));

    // Another user cannot check it out.
    let stranger = shanghuyun_integration_tests::client();
    signup(&stranger).await;
    let resp = stranger
        .get(url(&format!("/api/v1/payment/checkout/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let (status, paid_at) = order_state(&pool, order_id).await;
    assert_eq!(status, "pending");
    assert!(paid_at.is_none());

    // Paid notification is acknowledged and stamps paid_at.
    let gateway = shanghuyun_integration_tests::client();
    let resp = post_callback(&gateway, "/api/v1/payment/notify", &trade_no, "1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "1|OK");

    let (status, paid_at) = order_state(&pool, order_id).await;
    assert_eq!(status, "paid");
    assert!(paid_at.is_some());

    // A replay is acknowledged without touching paid_at.
    let resp = post_callback(&gateway, "/api/v1/payment/notify", &trade_no, "1").await;
    assert_eq!(resp.text().await.unwrap(), "1|OK");
    assert_eq!(order_state(&pool, order_id).await, ("paid".to_string(), paid_at.clone()));

    // A later failure report does not downgrade the paid order.
    let resp = post_callback(&gateway, "/api/v1/payment/notify", &trade_no, "10100058").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "0|Fail");
    assert_eq!(order_state(&pool, order_id).await, ("paid".to_string(), paid_at));

    assert_eq!(stock(&pool, product_id).await, stock_before - 2);

    // A paid order cannot be checked out again.
    let resp = client
        .get(url(&format!("/api/v1/payment/checkout/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_failed_notification_marks_order_failed() {
    let pool = pool().await;
    let (product_id, _) = product_in_stock(&pool).await;
    let client = client();
    signup(&client).await;

    let order = create_order(&client, product_id, 1).await;
    let order_id = order["order_id"].as_i64().unwrap();
    let trade_no = order["merchant_trade_no"].as_str().unwrap().to_string();

    let resp = post_callback(&client, "/api/v1/payment/notify", &trade_no, "10100058").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "0|Fail");
    assert_eq!(order_state(&pool, order_id).await, ("failed".to_string(), None));

    let resp = post_callback(&client, "/api/v1/payment/order_result", &trade_no, "10100058").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Failed"));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_callbacks_reject_bad_mac_unknown_order_and_get() {
    let client = client();

    let resp = client
        .post(url("/api/v1/payment/notify"))
        .form(&[
            ("MerchantTradeNo", "ORD1"),
            ("RtnCode", "1"),
            ("CheckMacValue", "DEADBEEF"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "CheckMacValue error");

    for path in ["/api/v1/payment/notify", "/api/v1/payment/order_result"] {
        let resp = client.post(url(path)).body("garbage").send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(resp.text().await.unwrap(), "CheckMacValue error");

        let resp = client
            .post(url(path))
            .json(&json!({"RtnCode": "1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path}");
    }

    let resp = post_callback(&client, "/api/v1/payment/notify", "ORDNOSUCHORDER", "1").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "Order not found");

    let resp = client
        .get(url("/api/v1/payment/notify"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Only POST");
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_order_history_filters_by_status() {
    let client = client();
    signup(&client).await;

    for status in ["all", "pending", "paid", "failed", "bogus"] {
        let resp = client
            .get(url(&format!("/api/v1/order/history?status={status}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "status={status}");
    }
}
