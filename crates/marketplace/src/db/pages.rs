//! Block page repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::page::HomePage;

pub struct PageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A live page by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_live(&self, slug: &str) -> Result<Option<HomePage>, RepositoryError> {
        Ok(sqlx::query_as::<_, HomePage>(
            r"
            SELECT id, slug, title, body, live, updated_at
            FROM marketplace.home_page
            WHERE slug = $1 AND live
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Create or replace a page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        slug: &str,
        title: &str,
        body: &serde_json::Value,
        live: bool,
    ) -> Result<HomePage, RepositoryError> {
        Ok(sqlx::query_as::<_, HomePage>(
            r"
            INSERT INTO marketplace.home_page (slug, title, body, live)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET
                title = EXCLUDED.title, body = EXCLUDED.body, live = EXCLUDED.live,
                updated_at = NOW()
            RETURNING id, slug, title, body, live, updated_at
            ",
        )
        .bind(slug)
        .bind(title)
        .bind(body)
        .bind(live)
        .fetch_one(self.pool)
        .await?)
    }
}
