//! News taxonomy, authors and posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shanghuyun_core::{NewsAuthorId, NewsCategoryId, NewsPostId, NewsTagId};

/// Length of the automatic meta description, in characters.
pub const META_DESCRIPTION_LEN: usize = 160;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsCategory {
    pub id: NewsCategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsTag {
    pub id: NewsTagId,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub is_active: bool,
}

/// Links shown under an author's bio, keyed by platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorSocialLinks {
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsAuthor {
    pub id: NewsAuthorId,
    pub name: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub email: String,
    pub website: String,
    pub social_links: sqlx::types::Json<AuthorSocialLinks>,
    pub is_active: bool,
}

/// A news post joined with its category's display fields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsPost {
    pub id: NewsPostId,
    pub title: String,
    pub slug: String,
    pub subtitle: String,
    pub excerpt: String,
    pub category_id: Option<NewsCategoryId>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub category_color: Option<String>,
    pub author_id: Option<NewsAuthorId>,
    pub featured_image: Option<String>,
    /// Block stream, parsed with [`crate::content::parse_stream`].
    pub content: serde_json::Value,
    pub is_featured: bool,
    pub is_top: bool,
    pub allow_comments: bool,
    pub meta_description: String,
    pub meta_keywords: String,
    pub view_count: i32,
    pub like_count: i32,
    pub live: bool,
    pub first_published_at: Option<DateTime<Utc>>,
}

impl NewsPost {
    /// Canonical URL: by category and slug when categorised, else by id.
    #[must_use]
    pub fn url(&self) -> String {
        match &self.category_slug {
            Some(category) => format!("/news/{category}/{}", self.slug),
            None => format!("/news/{}", self.id),
        }
    }

    /// The stored meta description, or the excerpt's first 160 characters.
    #[must_use]
    pub fn meta_description(&self) -> String {
        if self.meta_description.is_empty() {
            default_meta_description(&self.excerpt)
        } else {
            self.meta_description.clone()
        }
    }

    /// `meta_keywords` split on commas.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        self.meta_keywords
            .split([',', '，'])
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Derive a meta description from an excerpt (first 160 characters).
#[must_use]
pub fn default_meta_description(excerpt: &str) -> String {
    excerpt.chars().take(META_DESCRIPTION_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> NewsPost {
        NewsPost {
            id: NewsPostId::new(5),
            title: "智慧農業".to_string(),
            slug: "smart-agriculture".to_string(),
            subtitle: String::new(),
            excerpt: "農".repeat(200),
            category_id: None,
            category_name: None,
            category_slug: None,
            category_color: None,
            author_id: None,
            featured_image: None,
            content: serde_json::Value::Null,
            is_featured: false,
            is_top: false,
            allow_comments: true,
            meta_description: String::new(),
            meta_keywords: "農業, 科技，永續".to_string(),
            view_count: 0,
            like_count: 0,
            live: true,
            first_published_at: None,
        }
    }

    #[test]
    fn test_url_uses_category_when_present() {
        let mut p = post();
        assert_eq!(p.url(), "/news/5");
        p.category_slug = Some("technology".to_string());
        assert_eq!(p.url(), "/news/technology/smart-agriculture");
    }

    #[test]
    fn test_meta_description_falls_back_to_excerpt_chars() {
        let mut p = post();
        assert_eq!(p.meta_description().chars().count(), 160);
        p.meta_description = "自訂描述".to_string();
        assert_eq!(p.meta_description(), "自訂描述");
    }

    #[test]
    fn test_keywords_split_on_both_commas() {
        assert_eq!(post().keywords(), vec!["農業", "科技", "永續"]);
    }
}
