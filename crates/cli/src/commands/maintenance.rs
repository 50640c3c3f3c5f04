//! Housekeeping commands.
//!
//! # Usage
//!
//! ```bash
//! shy-cli clean-empty-carts --days 30
//! shy-cli fix-slugs --dry-run
//! ```

use std::collections::HashSet;

use shanghuyun_marketplace::db::carts::CartRepository;
use shanghuyun_marketplace::db::news::{NewsRepository, SlugRow};
use shanghuyun_marketplace::services::slug::{
    POST_SLUG_MAX_LEN, SlugDictionary, make_unique, post_slug_base, taxonomy_slug_base,
};

use super::connect;

/// Delete carts without items that are older than `days`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn clean_empty_carts(days: i64) -> Result<(), Box<dyn std::error::Error>> {
    if days < 0 {
        return Err("--days must not be negative".into());
    }
    let pool = connect().await?;

    let removed = CartRepository::new(&pool).delete_empty_older_than(days).await?;
    tracing::info!(removed, days, "Deleted empty carts");
    Ok(())
}

/// A slug that would change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugChange {
    pub id: i32,
    pub name: String,
    pub old: String,
    pub new: String,
}

/// Work out new slugs for `rows`, keeping them unique among themselves.
///
/// Rows are visited in order. Each row may keep its own current slug;
/// every other row's slug counts as taken, so applying the changes in
/// order never collides.
pub fn plan_slug_changes(
    rows: &[SlugRow],
    base: impl Fn(&SlugRow) -> String,
    max_len: Option<usize>,
) -> Vec<SlugChange> {
    let mut taken: HashSet<String> = rows.iter().map(|r| r.slug.clone()).collect();
    let mut changes = Vec::new();

    for row in rows {
        taken.remove(&row.slug);
        let new = make_unique(&base(row), &taken, max_len);
        taken.insert(new.clone());
        if new != row.slug {
            changes.push(SlugChange {
                id: row.id,
                name: row.name.clone(),
                old: row.slug.clone(),
                new,
            });
        }
    }
    changes
}

#[derive(Debug, Clone, Copy)]
enum SlugTarget {
    Category,
    Tag,
    Post,
}

impl SlugTarget {
    const fn label(self) -> &'static str {
        match self {
            Self::Category => "news category",
            Self::Tag => "news tag",
            Self::Post => "news post",
        }
    }
}

/// Regenerate slugs for news categories, tags and posts.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an update fails.
pub async fn fix_slugs(dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;
    let news = NewsRepository::new(&pool);

    let categories = plan_slug_changes(
        &news.category_slug_rows().await?,
        |r| taxonomy_slug_base(&r.name, &SlugDictionary::NEWS_CATEGORY, Some(r.id)),
        None,
    );
    let tags = plan_slug_changes(
        &news.tag_slug_rows().await?,
        |r| taxonomy_slug_base(&r.name, &SlugDictionary::NEWS_TAG, Some(r.id)),
        None,
    );
    let posts = plan_slug_changes(
        &news.post_slug_rows().await?,
        |r| post_slug_base(&r.name, Some(r.id)),
        Some(POST_SLUG_MAX_LEN),
    );

    let mut total = 0_usize;
    for (target, changes) in [
        (SlugTarget::Category, categories),
        (SlugTarget::Tag, tags),
        (SlugTarget::Post, posts),
    ] {
        for change in changes {
            tracing::info!(
                kind = target.label(),
                id = change.id,
                name = %change.name,
                "{} -> {}",
                change.old,
                change.new
            );
            if !dry_run {
                match target {
                    SlugTarget::Category => news.set_category_slug(change.id, &change.new).await?,
                    SlugTarget::Tag => news.set_tag_slug(change.id, &change.new).await?,
                    SlugTarget::Post => news.set_post_slug(change.id, &change.new).await?,
                }
            }
            total += 1;
        }
    }

    if dry_run {
        tracing::info!(changes = total, "Dry run, nothing saved");
    } else {
        tracing::info!(changes = total, "Slugs updated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, name: &str, slug: &str) -> SlugRow {
        SlugRow {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }

    fn category_base(r: &SlugRow) -> String {
        taxonomy_slug_base(&r.name, &SlugDictionary::NEWS_CATEGORY, Some(r.id))
    }

    #[test]
    fn test_unchanged_slugs_are_not_reported() {
        let rows = [row(1, "農業新聞", "agriculture-news")];
        assert!(plan_slug_changes(&rows, category_base, None).is_empty());
    }

    #[test]
    fn test_duplicate_bases_get_suffixes() {
        let rows = [row(1, "公告", "old-1"), row(2, "公告", "old-2")];
        let changes = plan_slug_changes(&rows, category_base, None);
        let new: Vec<&str> = changes.iter().map(|c| c.new.as_str()).collect();
        assert_eq!(new, vec!["announcement", "announcement-1"]);
    }

    #[test]
    fn test_new_slug_avoids_later_rows_current_slug() {
        let rows = [row(1, "公告", "x"), row(2, "其他", "announcement")];
        let changes = plan_slug_changes(&rows, category_base, None);
        assert_eq!(changes.first().map(|c| c.new.as_str()), Some("announcement-1"));
    }

    #[test]
    fn test_cjk_only_names_fall_back_to_id() {
        let rows = [row(7, "雜項", "")];
        let changes = plan_slug_changes(&rows, category_base, None);
        assert_eq!(changes.first().map(|c| c.new.as_str()), Some("category-7"));
    }
}
