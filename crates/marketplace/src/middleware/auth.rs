//! Authentication extractors.
//!
//! Pages redirect anonymous visitors to `/accounts/login?next=...`; JSON
//! endpoints under `/api/` answer 401 instead.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Like [`RequireAuth`], but always redirects to login. For HTML pages
/// served under `/api/`.
pub struct RequirePageAuth(pub CurrentUser);

/// Extractor that requires a signed-in superuser.
pub struct RequireSuperuser(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to `next` afterwards.
    RedirectToLogin { next: String },
    /// JSON 401 for API requests.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
        }
    }
}

/// Login URL that returns to `next`.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/accounts/login?next={}", urlencoding::encode(next))
}

/// Nested routers see a stripped `parts.uri`; the full path is in `OriginalUri`.
fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn login_redirect(parts: &Parts) -> AuthRejection {
    let uri = request_uri(parts);
    let next = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    AuthRejection::RedirectToLogin { next }
}

fn rejection(parts: &Parts) -> AuthRejection {
    if request_uri(parts).path().starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        login_redirect(parts)
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| rejection(parts))
    }
}

impl<S> FromRequestParts<S> for RequirePageAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| login_redirect(parts))
    }
}

impl<S> FromRequestParts<S> for RequireSuperuser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Signed-in non-superusers are sent to login too.
        current_user(parts)
            .await
            .filter(|user| user.is_superuser)
            .map(Self)
            .ok_or_else(|| rejection(parts))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Only local absolute paths are accepted as post-login targets.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    /// Parts as a handler nested under `prefix` sees them.
    fn nested_parts(full: &str, stripped: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .uri(stripped)
            .extension(OriginalUri(full.parse().unwrap()))
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_safe_next_only_local_paths() {
        assert_eq!(safe_next(Some("/cart")), "/cart");
        assert_eq!(safe_next(Some("/news?page=2")), "/news?page=2");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(
            login_url("/users/privacy?x=1"),
            "/accounts/login?next=%2Fusers%2Fprivacy%3Fx%3D1"
        );
    }

    #[test]
    fn test_api_rejection_is_json_401() {
        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_nested_api_route_without_session_is_401() {
        let mut parts = nested_parts("/api/v1/order/create", "/create");
        let rejection = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::Unauthorized));
    }

    #[tokio::test]
    async fn test_nested_page_redirect_keeps_full_path() {
        let mut parts = nested_parts("/users/profile?tab=orders", "/profile?tab=orders");
        let rejection = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        match rejection {
            AuthRejection::RedirectToLogin { next } => {
                assert_eq!(next, "/users/profile?tab=orders");
            }
            AuthRejection::Unauthorized => panic!("expected a login redirect"),
        }
    }

    #[tokio::test]
    async fn test_page_auth_under_api_redirects() {
        let mut parts = nested_parts("/api/v1/order/history?status=paid", "/history?status=paid");
        let rejection = RequirePageAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            rejection,
            AuthRejection::RedirectToLogin { ref next } if next == "/api/v1/order/history?status=paid"
        ));
    }

    #[test]
    fn test_unnested_uri_is_used_without_original() {
        let (parts, ()) = Request::builder()
            .uri("/api/v1/cart/count")
            .body(())
            .unwrap()
            .into_parts();
        assert!(matches!(rejection(&parts), AuthRejection::Unauthorized));
    }
}
