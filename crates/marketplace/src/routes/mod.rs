//! HTTP route handlers for the marketplace.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                       - Home page blocks
//! GET  /home/cooperative-farmers               - Vendor directory
//! GET  /home/vendor/{id}/products              - Vendor products (12 per page)
//! GET  /home/vendor/{id}/product/{pid}         - Product detail
//!
//! # News
//! GET  /news                                   - Post list (6 per page, ?tag=&search=)
//! GET  /news/category/{slug}                   - Category post list
//! GET  /news/{category_slug}/{slug}            - Post detail
//! GET  /news/{id}                              - Post detail by id
//!
//! # Cart (JSON actions)
//! GET  /cart                                   - Cart page
//! POST /cart/add | /update | /remove | /clear  - Cart actions
//! GET  /cart/count                             - {"count": N}
//!
//! # Accounts
//! GET|POST /accounts/login                     - Password login
//! GET|POST /accounts/signup                    - Registration
//! POST     /accounts/logout                    - Logout
//!
//! # Users (pages)
//! GET  /users/profile                          - Profile page (login)
//! GET  /users/privacy                          - Privacy policy (superuser)
//! GET  /users/terms-of-service                 - Terms of service (superuser)
//!
//! # API v1
//! POST      /api/v1/order/create               - Create order (JSON)
//! GET       /api/v1/order/result               - Order result page
//! GET       /api/v1/order/history              - Order history page
//! GET       /api/v1/payment/checkout/{id}      - Auto-submitting ECPay form
//! POST      /api/v1/payment/notify             - ECPay server notification
//! POST      /api/v1/payment/order_result       - ECPay browser redirect
//! GET|PUT|PATCH /api/v1/account/profile        - Profile JSON
//! PUT|PATCH /api/v1/account/password/change    - Change password
//! GET       /api/v1/vendor/health              - Vendor app health
//! GET|PUT   /api/v1/vendor/profile             - Own vendor
//! GET|POST  /api/v1/vendor/products            - Own products
//! PUT|DELETE /api/v1/vendor/products/{id}      - One own product
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod form;
pub mod health;
pub mod home;
pub mod news;
pub mod orders;
pub mod payment;
pub mod users;
pub mod vendor;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
};

use crate::middleware::{CspNonce, OptionalAuth, api_rate_limiter, auth_rate_limiter};
use crate::models::{CurrentUser, SiteBasicSetting};
use crate::state::AppState;

/// Data every full page needs for the base layout.
#[derive(Clone)]
pub struct PageContext {
    pub site: Arc<SiteBasicSetting>,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

impl PageContext {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;

        Ok(Self {
            site: state.site_settings().await,
            user,
            nonce,
        })
    }
}

/// Create the home and vendor directory routes router.
pub fn home_routes() -> Router<AppState> {
    Router::new()
        .route("/cooperative-farmers", get(home::cooperative_farmers))
        .route("/vendor/{vendor_id}/products", get(home::vendor_products))
        .route(
            "/vendor/{vendor_id}/product/{product_id}",
            get(home::product_detail),
        )
}

/// Create the news routes router.
pub fn news_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(news::index))
        .route("/category/{slug}", get(news::category))
        .route("/{key}", get(news::detail_by_id))
        .route("/{category_slug}/{slug}", get(news::detail))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .layer(api_rate_limiter())
}

/// Create the password auth routes router.
pub fn account_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the user page routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(users::profile))
        .route("/privacy", get(users::privacy))
        .route("/terms-of-service", get(users::terms_of_service))
}

/// Create the `/api/v1` routes router.
pub fn api_routes() -> Router<AppState> {
    let orders = Router::new()
        .route("/create", post(orders::create))
        .route("/result", get(orders::result))
        .route("/history", get(orders::history))
        .layer(api_rate_limiter());

    let payment = Router::new()
        .route("/checkout/{order_id}", get(payment::checkout))
        .route(
            "/notify",
            post(payment::notify).fallback(payment::only_post),
        )
        .route(
            "/order_result",
            post(payment::order_result).fallback(payment::only_post),
        );

    let account = Router::new()
        .route(
            "/profile",
            get(account::profile)
                .put(account::update_profile)
                .patch(account::update_profile),
        )
        .route(
            "/password/change",
            put(account::change_password).patch(account::change_password),
        );

    let vendor = Router::new()
        .route("/health", get(vendor::health))
        .route("/profile", get(vendor::profile).put(vendor::update_profile))
        .route(
            "/products",
            get(vendor::list_products).post(vendor::create_product),
        )
        .route(
            "/products/{product_id}",
            put(vendor::update_product).delete(vendor::delete_product),
        );

    Router::new()
        .nest("/order", orders)
        .nest("/payment", payment)
        .nest("/account", account)
        .nest("/vendor", vendor)
}

/// Create all routes for the marketplace.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/home", home_routes())
        .nest("/news", news_routes())
        .nest("/cart", cart_routes())
        .nest("/accounts", account_auth_routes())
        .nest("/users", user_routes())
        .nest("/api/v1", api_routes())
}
