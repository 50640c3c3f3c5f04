//! Password login, signup and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::db::users::NewUserFlags;
use crate::error::{AppError, auth_message, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{safe_next, set_current_user};
use crate::models::CurrentUser;
use crate::models::user::User;
use crate::routes::PageContext;
use crate::services::auth::{AuthError, AuthService};
use crate::services::cart::merge_session_cart;
use crate::state::AppState;

const PASSWORD_MISMATCH: &str = "兩次輸入的密碼不一致";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub next: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: String,
    /// `next`, encoded for the link to the other form.
    pub next_query: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub next: String,
    pub next_query: String,
    pub email: String,
    pub error: Option<String>,
}

/// Display the login page.
pub async fn login_page(page: PageContext, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if page.is_authenticated() {
        return Redirect::to(&next).into_response();
    }
    LoginTemplate {
        page,
        next_query: urlencoding::encode(&next).into_owned(),
        next,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    match AuthService::new(state.pool())
        .login_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => sign_in(&state, &session, &user, &next).await,
        Err(e) => {
            if matches!(e, AuthError::Repository(_) | AuthError::PasswordHash) {
                return AppError::from(e).into_response();
            }
            warn!(error = %e, "Login failed");
            let template = LoginTemplate {
                page,
                next_query: urlencoding::encode(&next).into_owned(),
                next,
                email: form.email,
                error: Some(auth_message(&e)),
            };
            (StatusCode::UNAUTHORIZED, template).into_response()
        }
    }
}

/// Display the signup page.
pub async fn signup_page(page: PageContext, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if page.is_authenticated() {
        return Redirect::to(&next).into_response();
    }
    SignupTemplate {
        page,
        next_query: urlencoding::encode(&next).into_owned(),
        next,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle signup form submission; the new user is signed in.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<SignupForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    let result = if form.password == form.password_confirm {
        AuthService::new(state.pool())
            .register_with_password(&form.email, &form.password, NewUserFlags::default())
            .await
            .map_err(|e| auth_message(&e))
            .inspect_err(|message| warn!(error = %message, "Signup rejected"))
    } else {
        Err(PASSWORD_MISMATCH.to_string())
    };

    match result {
        Ok(user) => {
            info!(user_id = %user.id, "User registered");
            sign_in(&state, &session, &user, &next).await
        }
        Err(message) => {
            let template = SignupTemplate {
                page,
                next_query: urlencoding::encode(&next).into_owned(),
                next,
                email: form.email,
                error: Some(message),
            };
            (StatusCode::BAD_REQUEST, template).into_response()
        }
    }
}

/// Rotate the session, store the user and fold in the anonymous cart.
async fn sign_in(state: &AppState, session: &Session, user: &User, next: &str) -> Response {
    if let Err(e) = session.cycle_id().await {
        error!(error = %e, "Failed to rotate session id");
        return AppError::Internal("session".to_string()).into_response();
    }
    let current = CurrentUser::from(user);
    if let Err(e) = set_current_user(session, &current).await {
        error!(error = %e, "Failed to set session");
        return AppError::Internal("session".to_string()).into_response();
    }

    let pool = state.pool();
    if let Err(e) = merge_session_cart(
        session,
        &CartRepository::new(pool),
        &ProductRepository::new(pool),
        user.id,
    )
    .await
    {
        // The login itself succeeded; the anonymous cart stays in the session.
        warn!(user_id = %user.id, error = %e, "Failed to merge session cart");
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    info!(user_id = %user.id, "User signed in");
    Redirect::to(next).into_response()
}

/// Handle logout.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}
