//! News repository: taxonomy, authors and posts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use shanghuyun_core::{NewsAuthorId, NewsCategoryId, NewsPostId, NewsTagId};

use super::{RepositoryError, conflict_or_database};
use crate::models::news::{AuthorSocialLinks, NewsAuthor, NewsCategory, NewsPost, NewsTag};
use crate::models::pagination::{Paginated, offset, resolve_page};

/// Posts per page on news lists.
pub const NEWS_PER_PAGE: i64 = 6;
/// Featured posts shown above the news list.
pub const FEATURED_POSTS: i64 = 3;
/// Related posts shown under an article.
pub const RELATED_POSTS: i64 = 3;

const POST_SELECT: &str = r"
    SELECT p.id, p.title, p.slug, p.subtitle, p.excerpt, p.category_id,
           c.name AS category_name, c.slug AS category_slug, c.color AS category_color,
           p.author_id, p.featured_image, p.content, p.is_featured, p.is_top,
           p.allow_comments, p.meta_description, p.meta_keywords, p.view_count,
           p.like_count, p.live, p.first_published_at
    FROM marketplace.news_post p
    LEFT JOIN marketplace.news_category c ON c.id = p.category_id
";

const CATEGORY_COLUMNS: &str = "id, name, slug, description, color, icon, is_active, sort_order";

/// Filters for a news list page.
#[derive(Debug, Clone, Default)]
pub struct PostFilter<'f> {
    pub category_id: Option<NewsCategoryId>,
    pub tag_slug: Option<&'f str>,
    /// Case-insensitive match on title, subtitle and excerpt.
    pub search: Option<&'f str>,
}

/// A slugged taxonomy row, for slug maintenance.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlugRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

/// A news post to insert. The slug must already be unique.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub subtitle: String,
    pub excerpt: String,
    pub category_id: Option<NewsCategoryId>,
    pub author_id: Option<NewsAuthorId>,
    pub featured_image: Option<String>,
    pub content: serde_json::Value,
    pub is_featured: bool,
    pub is_top: bool,
    pub meta_description: String,
    pub meta_keywords: String,
    pub first_published_at: Option<DateTime<Utc>>,
}

pub struct NewsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Taxonomy
    // =========================================================================

    /// All categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<NewsCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM marketplace.news_category ORDER BY sort_order, name"
        );
        Ok(sqlx::query_as::<_, NewsCategory>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<NewsCategory>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM marketplace.news_category WHERE slug = $1");
        Ok(sqlx::query_as::<_, NewsCategory>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_by_slug(&self, slug: &str) -> Result<Option<NewsTag>, RepositoryError> {
        Ok(sqlx::query_as::<_, NewsTag>(
            "SELECT id, name, slug, color, is_active FROM marketplace.news_tag WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Active tags of a post, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags_for(&self, post_id: NewsPostId) -> Result<Vec<NewsTag>, RepositoryError> {
        Ok(sqlx::query_as::<_, NewsTag>(
            r"
            SELECT t.id, t.name, t.slug, t.color, t.is_active
            FROM marketplace.news_tag t
            JOIN marketplace.news_post_tag pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1 AND t.is_active
            ORDER BY t.name
            ",
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn author(&self, id: NewsAuthorId) -> Result<Option<NewsAuthor>, RepositoryError> {
        Ok(sqlx::query_as::<_, NewsAuthor>(
            r"
            SELECT id, name, bio, avatar, email, website, social_links, is_active
            FROM marketplace.news_author
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// One page of live posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_live(
        &self,
        filter: &PostFilter<'_>,
        raw_page: Option<&str>,
    ) -> Result<Paginated<NewsPost>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM marketplace.news_post p WHERE p.live",
        );
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let page = resolve_page(raw_page, total, NEWS_PER_PAGE);
        let mut query = QueryBuilder::<Postgres>::new(POST_SELECT);
        query.push(" WHERE p.live");
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY p.first_published_at DESC NULLS LAST, p.id DESC LIMIT ")
            .push_bind(NEWS_PER_PAGE)
            .push(" OFFSET ")
            .push_bind(offset(page, NEWS_PER_PAGE));
        let items = query
            .build_query_as::<NewsPost>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paginated::new(items, page, NEWS_PER_PAGE, total))
    }

    /// The newest featured live posts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self) -> Result<Vec<NewsPost>, RepositoryError> {
        let sql = format!(
            "{POST_SELECT} WHERE p.live AND p.is_featured \
             ORDER BY p.first_published_at DESC NULLS LAST, p.id DESC LIMIT $1"
        );
        Ok(sqlx::query_as::<_, NewsPost>(&sql)
            .bind(FEATURED_POSTS)
            .fetch_all(self.pool)
            .await?)
    }

    /// A live post by category slug and post slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_live_by_slug(
        &self,
        category_slug: &str,
        slug: &str,
    ) -> Result<Option<NewsPost>, RepositoryError> {
        let sql = format!("{POST_SELECT} WHERE p.live AND c.slug = $1 AND p.slug = $2");
        Ok(sqlx::query_as::<_, NewsPost>(&sql)
            .bind(category_slug)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_live(&self, id: NewsPostId) -> Result<Option<NewsPost>, RepositoryError> {
        let sql = format!("{POST_SELECT} WHERE p.live AND p.id = $1");
        Ok(sqlx::query_as::<_, NewsPost>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Count a view and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post no longer exists.
    pub async fn increment_view(&self, id: NewsPostId) -> Result<i32, RepositoryError> {
        sqlx::query_scalar::<_, i32>(
            r"
            UPDATE marketplace.news_post SET view_count = view_count + 1
            WHERE id = $1
            RETURNING view_count
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Manually linked posts when there are any, otherwise the newest
    /// posts of the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn related(&self, post: &NewsPost) -> Result<Vec<NewsPost>, RepositoryError> {
        let sql = format!(
            "{POST_SELECT} JOIN marketplace.news_post_related r ON r.related_id = p.id \
             WHERE r.post_id = $1 AND p.live \
             ORDER BY p.first_published_at DESC NULLS LAST, p.id DESC LIMIT $2"
        );
        let manual = sqlx::query_as::<_, NewsPost>(&sql)
            .bind(post.id)
            .bind(RELATED_POSTS)
            .fetch_all(self.pool)
            .await?;
        if !manual.is_empty() {
            return Ok(manual);
        }

        let sql = format!(
            "{POST_SELECT} WHERE p.live AND p.id <> $1 \
             AND ($2::INT IS NULL OR p.category_id = $2) \
             ORDER BY p.first_published_at DESC NULLS LAST, p.id DESC LIMIT $3"
        );
        Ok(sqlx::query_as::<_, NewsPost>(&sql)
            .bind(post.id)
            .bind(post.category_id)
            .bind(RELATED_POSTS)
            .fetch_all(self.pool)
            .await?)
    }

    /// The live posts published just before and just after this one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn neighbours(
        &self,
        post: &NewsPost,
    ) -> Result<(Option<NewsPost>, Option<NewsPost>), RepositoryError> {
        let Some(published) = post.first_published_at else {
            return Ok((None, None));
        };

        let sql = format!(
            "{POST_SELECT} WHERE p.live AND p.first_published_at < $1 \
             ORDER BY p.first_published_at DESC LIMIT 1"
        );
        let previous = sqlx::query_as::<_, NewsPost>(&sql)
            .bind(published)
            .fetch_optional(self.pool)
            .await?;

        let sql = format!(
            "{POST_SELECT} WHERE p.live AND p.first_published_at > $1 \
             ORDER BY p.first_published_at ASC LIMIT 1"
        );
        let next = sqlx::query_as::<_, NewsPost>(&sql)
            .bind(published)
            .fetch_optional(self.pool)
            .await?;

        Ok((previous, next))
    }

    // =========================================================================
    // Slug maintenance and seeding
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_slug_rows(&self) -> Result<Vec<SlugRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, SlugRow>(
            "SELECT id, name, slug FROM marketplace.news_category ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_slug_rows(&self) -> Result<Vec<SlugRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, SlugRow>(
            "SELECT id, name, slug FROM marketplace.news_tag ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// Post ids, titles and slugs. `name` holds the title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn post_slug_rows(&self) -> Result<Vec<SlugRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, SlugRow>(
            "SELECT id, title AS name, slug FROM marketplace.news_post ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn set_category_slug(&self, id: i32, slug: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE marketplace.news_category SET slug = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(slug)
            .execute(self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "category slug"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn set_tag_slug(&self, id: i32, slug: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE marketplace.news_tag SET slug = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(slug)
            .execute(self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "tag slug"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn set_post_slug(&self, id: i32, slug: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE marketplace.news_post SET slug = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(slug)
            .execute(self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "post slug"))?;
        Ok(())
    }

    /// Slugs in use by posts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn post_slugs(&self) -> Result<HashSet<String>, RepositoryError> {
        let slugs = sqlx::query_scalar::<_, String>("SELECT slug FROM marketplace.news_post")
            .fetch_all(self.pool)
            .await?;
        Ok(slugs.into_iter().collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn insert_category(
        &self,
        name: &str,
        slug: &str,
        description: &str,
        color: &str,
        sort_order: i32,
    ) -> Result<NewsCategoryId, RepositoryError> {
        sqlx::query_scalar::<_, NewsCategoryId>(
            r"
            INSERT INTO marketplace.news_category (name, slug, description, color, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(color)
        .bind(sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "category slug"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn insert_tag(
        &self,
        name: &str,
        slug: &str,
        color: &str,
    ) -> Result<NewsTagId, RepositoryError> {
        sqlx::query_scalar::<_, NewsTagId>(
            "INSERT INTO marketplace.news_tag (name, slug, color) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(slug)
        .bind(color)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "tag"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_author(
        &self,
        name: &str,
        bio: &str,
        email: &str,
        website: &str,
        social_links: &AuthorSocialLinks,
    ) -> Result<NewsAuthorId, RepositoryError> {
        Ok(sqlx::query_scalar::<_, NewsAuthorId>(
            r"
            INSERT INTO marketplace.news_author (name, bio, email, website, social_links)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(name)
        .bind(bio)
        .bind(email)
        .bind(website)
        .bind(sqlx::types::Json(social_links))
        .fetch_one(self.pool)
        .await?)
    }

    /// Insert a post with its tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn insert_post(
        &self,
        post: &NewPost,
        tags: &[NewsTagId],
    ) -> Result<NewsPostId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, NewsPostId>(
            r"
            INSERT INTO marketplace.news_post
                (title, slug, subtitle, excerpt, category_id, author_id, featured_image,
                 content, is_featured, is_top, meta_description, meta_keywords,
                 first_published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, COALESCE($13, NOW()))
            RETURNING id
            ",
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.subtitle)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(post.author_id)
        .bind(post.featured_image.as_deref())
        .bind(&post.content)
        .bind(post.is_featured)
        .bind(post.is_top)
        .bind(&post.meta_description)
        .bind(&post.meta_keywords)
        .bind(post.first_published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "post slug"))?;

        for tag in tags {
            sqlx::query(
                "INSERT INTO marketplace.news_post_tag (post_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Link `related` posts to a post, in addition to existing links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn link_related(
        &self,
        post_id: NewsPostId,
        related: &[NewsPostId],
    ) -> Result<(), RepositoryError> {
        for other in related.iter().filter(|r| **r != post_id) {
            sqlx::query(
                "INSERT INTO marketplace.news_post_related (post_id, related_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(other)
            .execute(self.pool)
            .await?;
        }
        Ok(())
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter<'_>) {
    if let Some(category_id) = filter.category_id {
        query.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(tag) = filter.tag_slug {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM marketplace.news_post_tag pt \
                 JOIN marketplace.news_tag t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND t.slug = ",
            )
            .push_bind(tag.to_string())
            .push(")");
    }
    if let Some(search) = filter.search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.subtitle ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.excerpt ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape `LIKE` wildcards so a search matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("有機"), "有機");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_push_filter_binds_each_condition() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM marketplace.news_post p WHERE p.live");
        push_filter(
            &mut query,
            &PostFilter {
                category_id: Some(NewsCategoryId::new(2)),
                tag_slug: Some("organic"),
                search: Some(" 茶 "),
            },
        );
        let sql = query.sql();
        assert!(sql.contains("p.category_id = $1"));
        assert!(sql.contains("t.slug = $2"));
        assert!(sql.contains("p.title ILIKE $3"));
        assert!(sql.contains("p.excerpt ILIKE $5"));
    }

    #[test]
    fn test_push_filter_ignores_blank_search() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_filter(
            &mut query,
            &PostFilter {
                search: Some("   "),
                ..PostFilter::default()
            },
        );
        assert_eq!(query.sql(), "SELECT 1 WHERE TRUE");
    }
}
