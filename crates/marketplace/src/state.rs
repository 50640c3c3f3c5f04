//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::MarketplaceConfig;
use crate::models::settings::SiteBasicSetting;
use crate::services::media::MediaStorage;
use crate::services::settings::SettingsCache;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MarketplaceConfig,
    pool: PgPool,
    media: MediaStorage,
    settings: SettingsCache,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: MarketplaceConfig, pool: PgPool) -> Self {
        let media = MediaStorage::new(config.media_root.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                media,
                settings: SettingsCache::new(),
            }),
        }
    }

    /// Get a reference to the marketplace configuration.
    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to uploaded media storage.
    #[must_use]
    pub fn media(&self) -> &MediaStorage {
        &self.inner.media
    }

    /// Site settings shown on every page (cached).
    pub async fn site_settings(&self) -> Arc<SiteBasicSetting> {
        self.inner.settings.basic(&self.inner.pool).await
    }
}
