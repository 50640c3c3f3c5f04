//! Profile and password JSON endpoints.
//!
//! All routes require a signed-in user; anonymous callers get 401.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::db::profiles::{ProfileRepository, ProfileUpdate};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::models::Profile;
use crate::models::user::limits;
use crate::routes::form::{FieldErrors, read_multipart};
use crate::services::auth::AuthService;
use crate::services::media::MediaKind;
use crate::state::AppState;

/// Profile as returned by the account API.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub real_name: String,
    pub nickname: String,
    pub portrait: Option<String>,
    pub address: String,
    pub phone: String,
}

impl From<&Profile> for ProfileResponse {
    fn from(p: &Profile) -> Self {
        Self {
            real_name: p.real_name.clone(),
            nickname: p.nickname.clone(),
            portrait: p.portrait.as_ref().map(|path| format!("/media/{path}")),
            address: p.address.clone(),
            phone: p.phone.clone(),
        }
    }
}

/// Return the caller's profile, creating it if missing.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = ProfileRepository::new(state.pool())
        .get_or_create(user.id)
        .await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// Update profile fields from a multipart form.
///
/// A new `portrait` file replaces the old one; `remove_portrait=true`
/// clears it. Either way the previous file is deleted.
#[instrument(skip(state, multipart), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let form = read_multipart(multipart, "portrait").await?;

    let mut errors = FieldErrors::default();
    let mut update = ProfileUpdate {
        real_name: errors.text(&form.fields, "real_name", limits::REAL_NAME),
        nickname: errors.text(&form.fields, "nickname", limits::NICKNAME),
        address: errors.text(&form.fields, "address", limits::ADDRESS),
        phone: errors.text(&form.fields, "phone", limits::PHONE),
        portrait: None,
    };
    let remove_portrait = errors.boolean(&form.fields, "remove_portrait", false);
    errors.into_result()?;

    let repo = ProfileRepository::new(state.pool());
    let previous = repo.get_or_create(user.id).await?.portrait;

    let media = state.media();
    let stored = match &form.file {
        Some(upload) => Some(media.save(MediaKind::Portrait, upload).await?),
        None => None,
    };
    if stored.is_some() {
        update.portrait = Some(stored.clone());
    } else if remove_portrait {
        update.portrait = Some(None);
    }

    let profile = match repo.update(user.id, &update).await {
        Ok(profile) => profile,
        Err(e) => {
            if let Some(path) = &stored {
                media.delete(path).await;
            }
            return Err(e.into());
        }
    };

    if let (Some(_), Some(old)) = (&update.portrait, previous) {
        media.delete(&old).await;
    }

    info!("Profile updated");
    Ok(Json(ProfileResponse::from(&profile)))
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// Change the caller's password.
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PasswordChangeRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = FieldErrors::default();
    let old_password = body.old_password.unwrap_or_default();
    let new_password = body.new_password.unwrap_or_default();
    if old_password.is_empty() {
        errors.add("old_password", "此欄位為必填。");
    }
    if new_password.is_empty() {
        errors.add("new_password", "此欄位為必填。");
    }
    errors.into_result()?;

    AuthService::new(state.pool())
        .change_password(user.id, &old_password, &new_password)
        .await?;

    Ok(Json(json!({ "detail": "密碼已更新" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shanghuyun_core::UserId;

    #[test]
    fn test_profile_response_portrait_url() {
        let profile = Profile {
            user_id: UserId::new(1),
            real_name: "王小明".to_string(),
            nickname: String::new(),
            portrait: Some("user/portrait/abc.png".to_string()),
            address: String::new(),
            phone: "0912345678".to_string(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(ProfileResponse::from(&profile)).unwrap_or_default();
        assert_eq!(json["portrait"], "/media/user/portrait/abc.png");
        assert_eq!(json["real_name"], "王小明");
        assert!(json.get("user_id").is_none());
    }
}
