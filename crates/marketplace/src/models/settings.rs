//! Site-wide settings singletons.

use chrono::{DateTime, Utc};

/// Branding, contact details and defaults shown on every page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteBasicSetting {
    pub site_name: String,
    pub site_tagline: String,
    pub site_description: String,
    pub site_logo: Option<String>,
    pub favicon: Option<String>,
    pub contact_email: String,
    pub contact_phone: String,
    pub contact_address: String,
    pub support_email: String,
    pub business_hours: String,
    pub facebook_url: String,
    pub twitter_url: String,
    pub instagram_url: String,
    pub youtube_url: String,
    pub linkedin_url: String,
    pub default_meta_title: String,
    pub default_meta_description: String,
    pub google_analytics_id: String,
    pub google_tag_manager_id: String,
    pub updated_at: DateTime<Utc>,
}

/// A configured social platform link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    pub name: &'static str,
    pub url: String,
    /// Font Awesome class.
    pub icon: &'static str,
}

impl SiteBasicSetting {
    /// The social platforms that have a URL, in display order.
    #[must_use]
    pub fn social_links(&self) -> Vec<SocialLink> {
        [
            (&self.facebook_url, "Facebook", "fab fa-facebook-f"),
            (&self.twitter_url, "Twitter", "fab fa-twitter"),
            (&self.instagram_url, "Instagram", "fab fa-instagram"),
            (&self.youtube_url, "YouTube", "fab fa-youtube"),
            (&self.linkedin_url, "LinkedIn", "fab fa-linkedin-in"),
        ]
        .into_iter()
        .filter(|(url, _, _)| !url.trim().is_empty())
        .map(|(url, name, icon)| SocialLink {
            name,
            url: url.clone(),
            icon,
        })
        .collect()
    }

    #[must_use]
    pub fn has_social_links(&self) -> bool {
        [
            &self.facebook_url,
            &self.twitter_url,
            &self.instagram_url,
            &self.youtube_url,
            &self.linkedin_url,
        ]
        .iter()
        .any(|url| !url.trim().is_empty())
    }

    /// Business hours split into display lines.
    #[must_use]
    pub fn business_hour_lines(&self) -> Vec<&str> {
        self.business_hours.lines().filter(|l| !l.trim().is_empty()).collect()
    }
}

impl Default for SiteBasicSetting {
    fn default() -> Self {
        Self {
            site_name: "尚虎雲平台".to_string(),
            site_tagline: "農業生產銷售一體化平台".to_string(),
            site_description: "商互雲平台是一個專業的農業生產銷售一體化平台，致力於連接生產者與消費者，提供優質的農產品和服務。".to_string(),
            site_logo: None,
            favicon: None,
            contact_email: "contact@shanghuyun.com".to_string(),
            contact_phone: "+886-2-1234-5678".to_string(),
            contact_address: "台北市信義區信義路五段7號".to_string(),
            support_email: "support@shanghuyun.com".to_string(),
            business_hours: "週一至週五：09:00-18:00\n週六：09:00-17:00\n週日：休息".to_string(),
            facebook_url: String::new(),
            twitter_url: String::new(),
            instagram_url: String::new(),
            youtube_url: String::new(),
            linkedin_url: String::new(),
            default_meta_title: "尚虎雲平台 - 農業生產銷售一體化平台".to_string(),
            default_meta_description: "尚虎雲平台提供完整的農業生產銷售解決方案，連接農民與消費者，打造可持續的農業生態系統。".to_string(),
            google_analytics_id: String::new(),
            google_tag_manager_id: String::new(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// A legal page body (privacy policy or terms of service).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LegalSetting {
    /// Block stream of [`crate::content::PrivacyBlock`] or
    /// [`crate::content::TermsBlock`].
    pub body: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_social_links_only_configured_platforms() {
        let mut settings = SiteBasicSetting::default();
        assert!(!settings.has_social_links());
        assert!(settings.social_links().is_empty());

        settings.youtube_url = "https://youtube.com/@shanghuyun".to_string();
        settings.facebook_url = "https://facebook.com/shanghuyun".to_string();
        let links = settings.social_links();
        assert!(settings.has_social_links());
        assert_eq!(links.len(), 2);
        assert_eq!(links.first().map(|l| l.name), Some("Facebook"));
        assert_eq!(links.get(1).map(|l| l.icon), Some("fab fa-youtube"));
    }

    #[test]
    fn test_business_hour_lines() {
        let settings = SiteBasicSetting::default();
        assert_eq!(settings.business_hour_lines().len(), 3);
    }
}
