//! Profile page and the superuser-only legal pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

use crate::content::legal::{PrivacyBlock, TermsBlock};
use crate::content::{StreamBlock, parse_stream};
use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::profiles::ProfileRepository;
use crate::db::settings::{LegalPage, SettingsRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, RequireSuperuser};
use crate::models::{OrderCounts, Profile};
use crate::routes::PageContext;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "users/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub profile: Profile,
    pub counts: OrderCounts,
}

/// Profile page; edits go through the account API.
#[instrument(skip(state, page), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let profile = ProfileRepository::new(state.pool())
        .get_or_create(user.id)
        .await?;
    let counts = OrderRepository::new(state.pool()).counts(user.id).await?;
    Ok(ProfileTemplate {
        page,
        profile,
        counts,
    })
}

#[derive(Template, WebTemplate)]
#[template(path = "users/privacy.html")]
pub struct PrivacyTemplate {
    pub page: PageContext,
    pub blocks: Vec<StreamBlock<PrivacyBlock>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/terms.html")]
pub struct TermsTemplate {
    pub page: PageContext,
    pub blocks: Vec<StreamBlock<TermsBlock>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Load a legal document. A missing settings row reads as an empty one;
/// an unreadable body is logged and rendered empty.
async fn legal_blocks<T: DeserializeOwned>(
    state: &AppState,
    page: LegalPage,
) -> Result<(Vec<StreamBlock<T>>, Option<DateTime<Utc>>)> {
    let setting = match SettingsRepository::new(state.pool()).legal(page).await {
        Ok(setting) => setting,
        Err(RepositoryError::NotFound) => return Ok((Vec::new(), None)),
        Err(e) => return Err(e.into()),
    };
    let blocks = parse_stream(&setting.body).unwrap_or_else(|e| {
        warn!(page = ?page, error = %e, "Invalid legal page body");
        Vec::new()
    });
    Ok((blocks, Some(setting.updated_at)))
}

#[instrument(skip(state, page, _user))]
pub async fn privacy(
    State(state): State<AppState>,
    RequireSuperuser(_user): RequireSuperuser,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let (blocks, updated_at) = legal_blocks(&state, LegalPage::Privacy).await?;
    Ok(PrivacyTemplate {
        page,
        blocks,
        updated_at,
    })
}

#[instrument(skip(state, page, _user))]
pub async fn terms_of_service(
    State(state): State<AppState>,
    RequireSuperuser(_user): RequireSuperuser,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let (blocks, updated_at) = legal_blocks(&state, LegalPage::Terms).await?;
    Ok(TermsTemplate {
        page,
        blocks,
        updated_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::content::legal::ExtraBlock;
    use serde_json::json;

    #[test]
    fn test_extra_alerts_expose_icon() {
        let value = json!([{
            "type": "disclaimer",
            "value": {
                "disclaimer_items": ["天災不可抗力"],
                "extra": [{"type": "alert", "value": {"alert_type": "light", "content": "注意"}}]
            }
        }]);
        let blocks: Vec<StreamBlock<TermsBlock>> = parse_stream(&value).unwrap();
        let Some(TermsBlock::Disclaimer(disclaimer)) = blocks.first().map(|b| &b.block) else {
            panic!("expected disclaimer");
        };
        let ExtraBlock::Alert(alert) = &disclaimer.extra.first().unwrap().block;
        assert_eq!(alert.alert_type.icon(), "sun");
    }
}
