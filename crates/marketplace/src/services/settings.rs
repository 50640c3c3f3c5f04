//! Cached site settings.
//!
//! Every page renders the basic settings, so they are kept in a `moka`
//! cache for 5 minutes instead of hitting the database per request.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::db::settings::SettingsRepository;
use crate::models::settings::SiteBasicSetting;

const CACHE_KEY: &str = "site_basic_setting";
const CACHE_TTL: Duration = Duration::from_secs(300);

/// In-process cache of [`SiteBasicSetting`].
#[derive(Clone)]
pub struct SettingsCache {
    cache: Cache<&'static str, Arc<SiteBasicSetting>>,
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CACHE_TTL)
            .build();
        Self { cache }
    }

    /// The current basic settings.
    ///
    /// A failed load is logged and answered with the built-in defaults,
    /// which are not cached.
    pub async fn basic(&self, pool: &PgPool) -> Arc<SiteBasicSetting> {
        if let Some(settings) = self.cache.get(CACHE_KEY).await {
            debug!("Cache hit for site settings");
            return settings;
        }

        match SettingsRepository::new(pool).basic().await {
            Ok(settings) => {
                let settings = Arc::new(settings);
                self.cache.insert(CACHE_KEY, Arc::clone(&settings)).await;
                settings
            }
            Err(e) => {
                warn!(error = %e, "Failed to load site settings, using defaults");
                Arc::new(SiteBasicSetting::default())
            }
        }
    }

    /// Drop the cached settings so the next read reloads them.
    pub async fn invalidate(&self) {
        self.cache.invalidate(CACHE_KEY).await;
    }
}
