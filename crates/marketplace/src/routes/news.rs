//! News list and post handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{instrument, warn};

use shanghuyun_core::NewsPostId;

use crate::content::{NewsBlock, StreamBlock, parse_stream};
use crate::content::news::embed_url;
use crate::db::news::{NewsRepository, PostFilter};
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{NewsAuthor, NewsCategory, NewsPost, NewsTag, PagerView, Paginated};
use crate::routes::PageContext;
use crate::state::AppState;

/// `/news` query: page, tag slug and free-text search.
#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub page: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl NewsQuery {
    fn tag(&self) -> Option<&str> {
        self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Pager base URL that keeps the active filters.
    fn pager_base(&self, path: &str) -> String {
        let mut base = format!("{path}?");
        if let Some(tag) = self.tag() {
            base.push_str(&format!("tag={}&", urlencoding::encode(tag)));
        }
        if let Some(search) = self.search() {
            base.push_str(&format!("search={}&", urlencoding::encode(search)));
        }
        base
    }
}

/// News list template, shared by the index and category pages.
#[derive(Template, WebTemplate)]
#[template(path = "news/index.html")]
pub struct NewsIndexTemplate {
    pub page: PageContext,
    pub posts: Paginated<NewsPost>,
    pub pager: PagerView,
    pub featured: Vec<NewsPost>,
    pub categories: Vec<NewsCategory>,
    pub current_category: Option<NewsCategory>,
    pub current_tag: Option<NewsTag>,
    pub search: String,
}

/// Display the newest live posts.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    render_list(&state, query, None, page).await
}

/// Display the live posts of one category.
#[instrument(skip(state, page))]
pub async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<NewsQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let category = NewsRepository::new(state.pool())
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("news category {slug}")))?;
    render_list(&state, query, Some(category), page).await
}

async fn render_list(
    state: &AppState,
    query: NewsQuery,
    current_category: Option<NewsCategory>,
    page: PageContext,
) -> Result<NewsIndexTemplate> {
    let news = NewsRepository::new(state.pool());

    let current_tag = match query.tag() {
        Some(slug) => news.tag_by_slug(slug).await?,
        None => None,
    };
    let filter = PostFilter {
        category_id: current_category.as_ref().map(|c| c.id),
        tag_slug: query.tag(),
        search: query.search(),
    };
    let posts = news.list_live(&filter, query.page.as_deref()).await?;

    let path = current_category
        .as_ref()
        .map_or_else(|| "/news".to_string(), |c| format!("/news/category/{}", c.slug));
    let pager = PagerView::new(&posts, &query.pager_base(&path));

    Ok(NewsIndexTemplate {
        page,
        posts,
        pager,
        featured: news.featured().await?,
        categories: news.categories().await?,
        current_category,
        current_tag,
        search: query.search().unwrap_or_default().to_string(),
    })
}

/// Post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "news/detail.html")]
pub struct NewsDetailTemplate {
    pub page: PageContext,
    pub post: NewsPost,
    pub blocks: Vec<StreamBlock<NewsBlock>>,
    pub tags: Vec<NewsTag>,
    pub author: Option<NewsAuthor>,
    pub related: Vec<NewsPost>,
    pub previous: Option<NewsPost>,
    pub next: Option<NewsPost>,
    pub categories: Vec<NewsCategory>,
}

impl NewsDetailTemplate {
    /// Player URL for an `embed_video` block.
    #[must_use]
    pub fn embed(&self, url: &str) -> String {
        embed_url(url)
    }
}

/// Display a post by category slug and post slug.
#[instrument(skip(state, page))]
pub async fn detail(
    State(state): State<AppState>,
    Path((category_slug, slug)): Path<(String, String)>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let post = NewsRepository::new(state.pool())
        .get_live_by_slug(&category_slug, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("news post {category_slug}/{slug}")))?;
    render_detail(&state, post, page).await
}

/// Display a post by id.
#[instrument(skip(state, page))]
pub async fn detail_by_id(
    State(state): State<AppState>,
    Path(key): Path<String>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound(format!("news post {key}"));
    let id: NewsPostId = key.parse().map_err(|_| not_found())?;
    let post = NewsRepository::new(state.pool())
        .get_live(id)
        .await?
        .ok_or_else(not_found)?;
    render_detail(&state, post, page).await
}

async fn render_detail(
    state: &AppState,
    mut post: NewsPost,
    page: PageContext,
) -> Result<NewsDetailTemplate> {
    let news = NewsRepository::new(state.pool());
    post.view_count = news.increment_view(post.id).await?;

    let blocks = parse_stream(&post.content).unwrap_or_else(|e| {
        warn!(post_id = %post.id, error = %e, "Unreadable post body");
        Vec::new()
    });
    let author = match post.author_id {
        Some(id) => news.author(id).await?,
        None => None,
    };
    let (previous, next) = news.neighbours(&post).await?;

    Ok(NewsDetailTemplate {
        page,
        tags: news.tags_for(post.id).await?,
        related: news.related(&post).await?,
        categories: news.categories().await?,
        blocks,
        author,
        previous,
        next,
        post,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pager_base_keeps_filters() {
        let query = NewsQuery {
            page: Some("2".to_string()),
            tag: Some("有機".to_string()),
            search: Some(" 稻米 ".to_string()),
        };
        assert_eq!(
            query.pager_base("/news"),
            "/news?tag=%E6%9C%89%E6%A9%9F&search=%E7%A8%BB%E7%B1%B3&"
        );
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = NewsQuery {
            page: None,
            tag: Some("  ".to_string()),
            search: Some(String::new()),
        };
        assert!(query.tag().is_none());
        assert!(query.search().is_none());
        assert_eq!(query.pager_base("/news/category/market"), "/news/category/market?");
    }
}
