//! Signup, login, profile and password change.
//!
//! These tests require a running marketplace server and database.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;
use shanghuyun_integration_tests::{TEST_PASSWORD, client, json_body, signup, url};

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_login_with_wrong_password_rerenders_form() {
    let client = client();
    let email = signup(&client).await;
    client.post(url("/accounts/logout")).send().await.unwrap();

    let resp = client
        .post(url("/accounts/login"))
        .form(&[("email", email.as_str()), ("password", "wrong-password-1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(url("/accounts/login"))
        .form(&[
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("next", "https://evil.example.com/"),
        ])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()["location"], "/");
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_account_api_requires_login() {
    let resp = client()
        .get(url("/api/v1/account/profile"))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["error"], json!("Authentication required"));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_pages_redirect_to_login_with_full_path() {
    let client = client();
    for (path, next) in [
        ("/users/profile", "%2Fusers%2Fprofile"),
        ("/api/v1/order/history", "%2Fapi%2Fv1%2Forder%2Fhistory"),
    ] {
        let resp = client.get(url(path)).send().await.unwrap();
        assert!(resp.status().is_redirection(), "{path}: {}", resp.status());
        assert_eq!(
            resp.headers()["location"],
            format!("/accounts/login?next={next}").as_str()
        );
    }
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_profile_update_and_validation() {
    let client = client();
    signup(&client).await;

    let resp = client
        .get(url("/api/v1/account/profile"))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["real_name"], json!(""));

    let form = reqwest::multipart::Form::new()
        .text("real_name", "<b>王小明</b>")
        .text("phone", "0912345678");
    let resp = client
        .patch(url("/api/v1/account/profile"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body["real_name"], json!("王小明"));
    assert_eq!(body["phone"], json!("0912345678"));

    let form = reqwest::multipart::Form::new().text("nickname", "長".repeat(21));
    let resp = client
        .patch(url("/api/v1/account/profile"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::BAD_REQUEST).await;
    assert!(body.get("nickname").is_some());
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn test_password_change() {
    let client = client();
    signup(&client).await;

    let resp = client
        .put(url("/api/v1/account/password/change"))
        .json(&json!({"old_password": "not-my-password", "new_password": "new-harvest-2026"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .put(url("/api/v1/account/password/change"))
        .json(&json!({"old_password": TEST_PASSWORD, "new_password": "new-harvest-2026"}))
        .send()
        .await
        .unwrap();
    let body = json_body(resp, StatusCode::OK).await;
    assert_eq!(body, json!({"detail": "密碼已更新"}));
}
