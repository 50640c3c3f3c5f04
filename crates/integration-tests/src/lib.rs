//! Integration test helpers for the Shanghuyun marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! # Database, migrations and sample data
//! shy-cli migrate
//! shy-cli seed crates/cli/seed.example.yaml
//!
//! # Start the server, then run the ignored tests
//! cargo run -p shanghuyun-marketplace &
//! cargo test -p shanghuyun-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_TEST_URL` - server base URL (default `http://localhost:8000`)
//! - `MARKETPLACE_DATABASE_URL` - database the server uses
//! - `ECPAY_HASH_KEY` / `ECPAY_HASH_IV` - must match the server's keys

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;

/// ECPay's public stage credentials.
const STAGE_HASH_KEY: &str = "pwFHCqoQZGmho4w6";
const STAGE_HASH_IV: &str = "EkRm7iFT261dpevs";

/// Base URL of the running marketplace.
#[must_use]
pub fn base_url() -> String {
    std::env::var("MARKETPLACE_TEST_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Absolute URL for a path on the running marketplace.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// HTTP client that keeps session cookies and does not follow redirects.
///
/// Each client claims its own address in `X-Real-IP` (198.18.0.0/15, the
/// benchmarking range), so the per-IP rate limits apply per client.
#[must_use]
pub fn client() -> Client {
    let [a, b, ..] = uuid::Uuid::new_v4().into_bytes();
    let ip = format!("198.{}.{}.{}", 18 + (a & 1), b, a >> 1);
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "x-real-ip",
        reqwest::header::HeaderValue::from_str(&ip).expect("Invalid client IP header"),
    );
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh address so tests never collide on signup.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Password that passes signup rules.
pub const TEST_PASSWORD: &str = "terraced-fields-2026";

/// Sign up a new account on `client`; the session is signed in afterwards.
pub async fn signup(client: &Client) -> String {
    let email = unique_email();
    let resp = client
        .post(url("/accounts/signup"))
        .form(&[
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("password_confirm", TEST_PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to sign up");
    assert!(
        resp.status().is_redirection(),
        "signup should redirect, got {}",
        resp.status()
    );
    email
}

/// Connect to the database the server uses.
pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("MARKETPLACE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("MARKETPLACE_DATABASE_URL not set");
    shanghuyun_marketplace::db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database")
}

/// An active product with stock, as `(id, price)`.
pub async fn product_in_stock(pool: &PgPool) -> (i32, f64) {
    sqlx::query_as::<_, (i32, f64)>(
        "SELECT id, price::FLOAT8 FROM marketplace.product \
         WHERE is_active AND stock > 5 ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .expect("Failed to query products")
    .expect("No product in stock; run `shy-cli seed crates/cli/seed.example.yaml`")
}

/// Sign ECPay callback fields with the configured hash key and IV.
#[must_use]
pub fn sign_callback(fields: &[(&str, &str)]) -> String {
    let key = std::env::var("ECPAY_HASH_KEY").unwrap_or_else(|_| STAGE_HASH_KEY.to_string());
    let iv = std::env::var("ECPAY_HASH_IV").unwrap_or_else(|_| STAGE_HASH_IV.to_string());
    shanghuyun_marketplace::services::payment::check_mac_value(fields.iter().copied(), &key, &iv)
}

/// Read a JSON body, asserting the status first.
pub async fn json_body(resp: reqwest::Response, expected: StatusCode) -> Value {
    assert_eq!(resp.status(), expected);
    resp.json().await.expect("Response was not JSON")
}
