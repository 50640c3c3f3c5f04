//! Site settings singletons (row `id = 1` of each table).

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::settings::{LegalSetting, SiteBasicSetting};

/// Which legal page a [`LegalSetting`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalPage {
    Privacy,
    Terms,
}

impl LegalPage {
    const fn table(self) -> &'static str {
        match self {
            Self::Privacy => "marketplace.site_policy_setting",
            Self::Terms => "marketplace.site_terms_setting",
        }
    }
}

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the singleton row is missing.
    pub async fn basic(&self) -> Result<SiteBasicSetting, RepositoryError> {
        sqlx::query_as::<_, SiteBasicSetting>(
            r"
            SELECT site_name, site_tagline, site_description, site_logo, favicon,
                   contact_email, contact_phone, contact_address, support_email,
                   business_hours, facebook_url, twitter_url, instagram_url,
                   youtube_url, linkedin_url, default_meta_title,
                   default_meta_description, google_analytics_id,
                   google_tag_manager_id, updated_at
            FROM marketplace.site_basic_setting
            WHERE id = 1
            ",
        )
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Overwrite the basic settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_basic(&self, s: &SiteBasicSetting) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO marketplace.site_basic_setting (
                id, site_name, site_tagline, site_description, site_logo, favicon,
                contact_email, contact_phone, contact_address, support_email,
                business_hours, facebook_url, twitter_url, instagram_url, youtube_url,
                linkedin_url, default_meta_title, default_meta_description,
                google_analytics_id, google_tag_manager_id
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19)
            ON CONFLICT (id) DO UPDATE SET
                site_name = EXCLUDED.site_name,
                site_tagline = EXCLUDED.site_tagline,
                site_description = EXCLUDED.site_description,
                site_logo = EXCLUDED.site_logo,
                favicon = EXCLUDED.favicon,
                contact_email = EXCLUDED.contact_email,
                contact_phone = EXCLUDED.contact_phone,
                contact_address = EXCLUDED.contact_address,
                support_email = EXCLUDED.support_email,
                business_hours = EXCLUDED.business_hours,
                facebook_url = EXCLUDED.facebook_url,
                twitter_url = EXCLUDED.twitter_url,
                instagram_url = EXCLUDED.instagram_url,
                youtube_url = EXCLUDED.youtube_url,
                linkedin_url = EXCLUDED.linkedin_url,
                default_meta_title = EXCLUDED.default_meta_title,
                default_meta_description = EXCLUDED.default_meta_description,
                google_analytics_id = EXCLUDED.google_analytics_id,
                google_tag_manager_id = EXCLUDED.google_tag_manager_id,
                updated_at = NOW()
            ",
        )
        .bind(&s.site_name)
        .bind(&s.site_tagline)
        .bind(&s.site_description)
        .bind(s.site_logo.as_deref())
        .bind(s.favicon.as_deref())
        .bind(&s.contact_email)
        .bind(&s.contact_phone)
        .bind(&s.contact_address)
        .bind(&s.support_email)
        .bind(&s.business_hours)
        .bind(&s.facebook_url)
        .bind(&s.twitter_url)
        .bind(&s.instagram_url)
        .bind(&s.youtube_url)
        .bind(&s.linkedin_url)
        .bind(&s.default_meta_title)
        .bind(&s.default_meta_description)
        .bind(&s.google_analytics_id)
        .bind(&s.google_tag_manager_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the singleton row is missing.
    pub async fn legal(&self, page: LegalPage) -> Result<LegalSetting, RepositoryError> {
        let sql = format!("SELECT body, updated_at FROM {} WHERE id = 1", page.table());
        sqlx::query_as::<_, LegalSetting>(&sql)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_legal(
        &self,
        page: LegalPage,
        body: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (id, body) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()",
            page.table()
        );
        sqlx::query(&sql).bind(body).execute(self.pool).await?;
        Ok(())
    }
}
