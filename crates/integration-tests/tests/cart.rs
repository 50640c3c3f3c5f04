//! Session and database cart behaviour.
//!
//! These tests require a running marketplace server and a seeded database.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;
use shanghuyun_integration_tests::{client, json_body, pool, product_in_stock, signup, url};

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_anonymous_cart_add_update_remove() {
    let pool = pool().await;
    let (product_id, price) = product_in_stock(&pool).await;
    let client = client();

    let resp = client
        .post(url("/cart/add"))
        .json(&json!({"product_id": product_id, "quantity": 2}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["total_items"], json!(2));

    // Numeric strings are accepted.
    let resp = client
        .post(url("/cart/update"))
        .json(&json!({"product_id": product_id.to_string(), "quantity": "3"}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["total_items"], json!(3));
    let total = body["total_price"].as_f64().unwrap();
    assert!((total - price * 3.0).abs() < 0.001);

    let resp = client.get(url("/cart/count")).send().await.unwrap();
    assert_eq!(json_body(resp, StatusCode::OK).await, json!({"count": 3}));

    let resp = client
        .post(url("/cart/remove"))
        .json(&json!({"product_id": product_id}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["total_items"], json!(0));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_cart_rejects_unknown_product_and_bad_body() {
    let client = client();

    let resp = client
        .post(url("/cart/add"))
        .json(&json!({"product_id": 999_999}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["success"], json!(false));

    let resp = client
        .post(url("/cart/add"))
        .body("not json")
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_session_cart_merges_on_signup() {
    let pool = pool().await;
    let (product_id, _) = product_in_stock(&pool).await;
    let client = client();

    client
        .post(url("/cart/add"))
        .json(&json!({"product_id": product_id, "quantity": 1}))
        .send()
        .await
        .unwrap();

    signup(&client).await;

    let resp = client.get(url("/cart/count")).send().await.unwrap();
    assert_eq!(json_body(resp, StatusCode::OK).await, json!({"count": 1}));

    let resp = client.post(url("/cart/clear")).send().await.unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_cart_add_rejects_non_positive_quantity() {
    let pool = pool().await;
    let (product_id, _) = product_in_stock(&pool).await;
    let client = client();

    for quantity in [-3, 0] {
        let resp = client
            .post(url("/cart/add"))
            .json(&json!({"product_id": product_id, "quantity": quantity}))
            .send()
            .await
            .unwrap();
        let body = json_body(resp, StatusCode::OK).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("加入購物車失敗: 商品數量必須大於 0"));
    }

    let resp = client.get(url("/cart/count")).send().await.unwrap();
    assert_eq!(json_body(resp, StatusCode::OK).await, json!({"count": 0}));

    // Signing up afterwards merges nothing and succeeds.
    signup(&client).await;
    let resp = client.get(url("/cart/count")).send().await.unwrap();
    assert_eq!(json_body(resp, StatusCode::OK).await, json!({"count": 0}));
}
