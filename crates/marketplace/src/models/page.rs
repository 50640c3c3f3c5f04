//! Block-built landing pages.

use chrono::{DateTime, Utc};

use shanghuyun_core::PageId;

/// Slug of the site's front page.
pub const HOME_SLUG: &str = "home";
/// Slug of the cooperative-farmers landing page.
pub const COOPERATIVE_FARMERS_SLUG: &str = "cooperative-farmers";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HomePage {
    pub id: PageId,
    pub slug: String,
    pub title: String,
    /// Block stream of [`crate::content::HomeBlock`].
    pub body: serde_json::Value,
    pub live: bool,
    pub updated_at: DateTime<Utc>,
}
