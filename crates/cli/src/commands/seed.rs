//! Seed the marketplace from a YAML file.
//!
//! The file is parsed and validated before connecting to the database.
//! Rows that already exist (matched by name, title, email or slug) are
//! reused or skipped, so the same file can be loaded twice. Authors are
//! the exception: they have no natural key and are inserted every run.
//!
//! ```yaml
//! vendor_categories:
//!   - name: 農業商家
//! vendors:
//!   - email: farm@example.com
//!     password: long-password
//!     name: 阿里山茶園
//!     category: 農業商家
//!     products:
//!       - { name: 高山茶, price: "350.00", stock: 20 }
//! news:
//!   categories: [{ name: 農業新聞 }]
//!   tags: [{ name: 有機農業 }]
//!   authors: [{ name: 編輯部 }]
//!   posts:
//!     - title: 智慧 農業 發展
//!       category: 農業新聞
//!       author: 編輯部
//!       tags: [有機農業]
//!       content: [{ type: paragraph, value: "<p>...</p>" }]
//! pages:
//!   - { slug: home, title: 首頁, body: [] }
//! site: { site_name: 尚虎雲平台 }
//! legal: { privacy: [], terms: [] }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info, warn};

use shanghuyun_core::{NewsAuthorId, NewsCategoryId, NewsPostId, NewsTagId, VendorCategoryId};
use shanghuyun_marketplace::content::{
    self, ContentError, HomeBlock, NewsBlock, PrivacyBlock, StreamBlock, TermsBlock, parse_stream,
};
use shanghuyun_marketplace::db::RepositoryError;
use shanghuyun_marketplace::db::news::{NewPost, NewsRepository};
use shanghuyun_marketplace::db::pages::PageRepository;
use shanghuyun_marketplace::db::products::{ProductFields, ProductRepository};
use shanghuyun_marketplace::db::settings::{LegalPage, SettingsRepository};
use shanghuyun_marketplace::db::users::{NewUserFlags, UserRepository};
use shanghuyun_marketplace::db::vendors::{NewVendorCategory, VendorFields, VendorRepository};
use shanghuyun_marketplace::models::news::AuthorSocialLinks;
use shanghuyun_marketplace::services::auth::{AuthError, AuthService};
use shanghuyun_marketplace::services::slug::{
    POST_SLUG_MAX_LEN, SlugDictionary, make_unique, post_slug_base, taxonomy_slug_base,
};

use super::connect;

// =============================================================================
// File format
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub vendor_categories: Vec<VendorCategorySeed>,
    #[serde(default)]
    pub vendors: Vec<VendorSeed>,
    #[serde(default)]
    pub news: NewsSeed,
    #[serde(default)]
    pub pages: Vec<PageSeed>,
    #[serde(default)]
    pub site: Option<SiteSeed>,
    #[serde(default)]
    pub legal: LegalSeed,
}

#[derive(Debug, Deserialize)]
pub struct VendorCategorySeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_vendor_color")]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct VendorSeed {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    /// Vendor category name.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsSeed {
    #[serde(default)]
    pub categories: Vec<NewsCategorySeed>,
    #[serde(default)]
    pub tags: Vec<NewsTagSeed>,
    #[serde(default)]
    pub authors: Vec<AuthorSeed>,
    #[serde(default)]
    pub posts: Vec<PostSeed>,
}

#[derive(Debug, Deserialize)]
pub struct NewsCategorySeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_news_color")]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct NewsTagSeed {
    pub name: String,
    #[serde(default = "default_tag_color")]
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorSeed {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub social_links: AuthorSocialLinks,
}

#[derive(Debug, Deserialize)]
pub struct PostSeed {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub excerpt: String,
    /// News category name.
    #[serde(default)]
    pub category: Option<String>,
    /// Author name.
    #[serde(default)]
    pub author: Option<String>,
    /// Tag names.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default = "empty_stream")]
    pub content: Value,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_top: bool,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub meta_keywords: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Titles of related posts.
    #[serde(default)]
    pub related: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageSeed {
    pub slug: String,
    pub title: String,
    #[serde(default = "empty_stream")]
    pub body: Value,
    #[serde(default = "default_true")]
    pub live: bool,
}

/// Overrides for the basic site settings; omitted fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSeed {
    pub site_name: Option<String>,
    pub site_tagline: Option<String>,
    pub site_description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_address: Option<String>,
    pub support_email: Option<String>,
    pub business_hours: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub default_meta_title: Option<String>,
    pub default_meta_description: Option<String>,
    pub google_analytics_id: Option<String>,
    pub google_tag_manager_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegalSeed {
    #[serde(default)]
    pub privacy: Option<Value>,
    #[serde(default)]
    pub terms: Option<Value>,
}

fn default_true() -> bool {
    true
}
fn default_vendor_color() -> String {
    "#28a745".to_string()
}
fn default_news_color() -> String {
    "#007bff".to_string()
}
fn default_tag_color() -> String {
    "#6c757d".to_string()
}
fn empty_stream() -> Value {
    Value::Array(Vec::new())
}

// =============================================================================
// Validation
// =============================================================================

/// Check a seed file without touching the database.
///
/// Returns one message per problem found.
#[must_use]
pub fn validate_seed(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    for vendor in &seed.vendors {
        for product in &vendor.products {
            if product.price < Decimal::ZERO || product.price.scale() > 2 {
                errors.push(format!(
                    "product '{}': price must be >= 0 with at most 2 decimals",
                    product.name
                ));
            }
            if product.stock < 0 {
                errors.push(format!("product '{}': stock must be >= 0", product.name));
            }
        }
    }

    for post in &seed.news.posts {
        if let Err(e) = check_stream::<NewsBlock>(&post.content, content::news::validate) {
            errors.push(format!("post '{}': {e}", post.title));
        }
    }
    for page in &seed.pages {
        if let Err(e) = check_stream::<HomeBlock>(&page.body, content::home::validate) {
            errors.push(format!("page '{}': {e}", page.slug));
        }
    }
    if let Some(body) = &seed.legal.privacy
        && let Err(e) = check_stream::<PrivacyBlock>(body, content::legal::validate_privacy)
    {
        errors.push(format!("privacy policy: {e}"));
    }
    if let Some(body) = &seed.legal.terms
        && let Err(e) = check_stream::<TermsBlock>(body, content::legal::validate_terms)
    {
        errors.push(format!("terms of service: {e}"));
    }

    errors
}

fn check_stream<T: serde::de::DeserializeOwned>(
    value: &Value,
    validate: fn(&[StreamBlock<T>]) -> Result<(), ContentError>,
) -> Result<(), ContentError> {
    validate(&parse_stream::<T>(value)?)
}

// =============================================================================
// Loading
// =============================================================================

/// Seed the database from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if
/// a database operation fails.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }
    info!("Seed file validated successfully");

    let pool = connect().await?;

    let categories = seed_vendor_categories(&pool, &seed.vendor_categories).await?;
    seed_vendors(&pool, &seed.vendors, &categories).await?;
    seed_news(&pool, &seed.news).await?;
    seed_pages(&pool, &seed.pages).await?;
    if let Some(site) = &seed.site {
        seed_site(&pool, site).await?;
    }
    seed_legal(&pool, &seed.legal).await?;

    info!("Seeding complete!");
    Ok(())
}

async fn seed_vendor_categories(
    pool: &PgPool,
    seeds: &[VendorCategorySeed],
) -> Result<HashMap<String, VendorCategoryId>, RepositoryError> {
    let vendors = VendorRepository::new(pool);
    let mut by_name: HashMap<String, VendorCategoryId> = vendors
        .list_active_categories()
        .await?
        .into_iter()
        .map(|c| (c.name, c.id))
        .collect();
    let mut taken = vendors.category_slugs().await?;

    for seed in seeds {
        if by_name.contains_key(&seed.name) {
            continue;
        }
        let base = taxonomy_slug_base(&seed.name, &SlugDictionary::VENDOR_CATEGORY, None);
        let slug = make_unique(&base, &taken, None);
        let category = vendors
            .insert_category(&NewVendorCategory {
                name: seed.name.clone(),
                slug: slug.clone(),
                description: seed.description.clone(),
                color: seed.color.clone(),
                icon: seed.icon.clone(),
                is_active: seed.is_active,
                sort_order: seed.sort_order,
            })
            .await?;
        info!(name = %category.name, slug = %slug, "Vendor category created");
        taken.insert(slug);
        by_name.insert(category.name, category.id);
    }
    Ok(by_name)
}

async fn seed_vendors(
    pool: &PgPool,
    seeds: &[VendorSeed],
    categories: &HashMap<String, VendorCategoryId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let auth = AuthService::new(pool);
    let users = UserRepository::new(pool);
    let vendors = VendorRepository::new(pool);
    let products = ProductRepository::new(pool);

    for seed in seeds {
        let user = match auth
            .register_with_password(&seed.email, &seed.password, NewUserFlags::default())
            .await
        {
            Ok(user) => user,
            Err(AuthError::UserAlreadyExists) => {
                let email = shanghuyun_core::Email::parse(&seed.email)?;
                users
                    .get_by_email(&email)
                    .await?
                    .ok_or_else(|| format!("user {} vanished", seed.email))?
            }
            Err(e) => return Err(e.into()),
        };

        if vendors.get_by_user(user.id).await?.is_some() {
            info!(vendor = %seed.name, "Vendor exists, skipping");
            continue;
        }

        let category_id = match &seed.category {
            Some(name) => {
                let id = categories.get(name).copied();
                if id.is_none() {
                    warn!(vendor = %seed.name, category = %name, "Unknown vendor category");
                }
                id
            }
            None => None,
        };
        let vendor = vendors
            .create(
                user.id,
                &VendorFields {
                    name: seed.name.clone(),
                    intro: seed.intro.clone(),
                    description: seed.description.clone(),
                    address: seed.address.clone(),
                    phone: seed.phone.clone(),
                    category_id,
                },
            )
            .await?;

        for product in &seed.products {
            let fields = ProductFields {
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                stock: product.stock,
                is_featured: product.is_featured,
                is_active: product.is_active,
            };
            products.create(vendor.id, &fields, None).await?;
        }
        info!(
            vendor = %vendor.name,
            products = seed.products.len(),
            "Vendor created"
        );
    }
    Ok(())
}

async fn seed_news(pool: &PgPool, seed: &NewsSeed) -> Result<(), Box<dyn std::error::Error>> {
    let news = NewsRepository::new(pool);

    // Categories
    let existing = news.category_slug_rows().await?;
    let mut taken: HashSet<String> = existing.iter().map(|r| r.slug.clone()).collect();
    let mut categories: HashMap<String, NewsCategoryId> = existing
        .into_iter()
        .map(|r| (r.name, NewsCategoryId::new(r.id)))
        .collect();
    for cat in &seed.categories {
        if categories.contains_key(&cat.name) {
            continue;
        }
        let base = taxonomy_slug_base(&cat.name, &SlugDictionary::NEWS_CATEGORY, None);
        let slug = make_unique(&base, &taken, None);
        let id = news
            .insert_category(&cat.name, &slug, &cat.description, &cat.color, cat.sort_order)
            .await?;
        info!(name = %cat.name, slug = %slug, "News category created");
        taken.insert(slug);
        categories.insert(cat.name.clone(), id);
    }

    // Tags
    let existing = news.tag_slug_rows().await?;
    let mut taken: HashSet<String> = existing.iter().map(|r| r.slug.clone()).collect();
    let mut tags: HashMap<String, NewsTagId> = existing
        .into_iter()
        .map(|r| (r.name, NewsTagId::new(r.id)))
        .collect();
    for tag in &seed.tags {
        if tags.contains_key(&tag.name) {
            continue;
        }
        let base = taxonomy_slug_base(&tag.name, &SlugDictionary::NEWS_TAG, None);
        let slug = make_unique(&base, &taken, None);
        let id = news.insert_tag(&tag.name, &slug, &tag.color).await?;
        taken.insert(slug);
        tags.insert(tag.name.clone(), id);
    }

    // Authors
    let mut authors: HashMap<String, NewsAuthorId> = HashMap::new();
    for author in &seed.authors {
        let id = news
            .insert_author(
                &author.name,
                &author.bio,
                &author.email,
                &author.website,
                &author.social_links,
            )
            .await?;
        authors.insert(author.name.clone(), id);
    }

    // Posts
    let existing = news.post_slug_rows().await?;
    let mut slugs = news.post_slugs().await?;
    let mut posts: HashMap<String, NewsPostId> = existing
        .into_iter()
        .map(|r| (r.name, NewsPostId::new(r.id)))
        .collect();
    for post in &seed.posts {
        if posts.contains_key(&post.title) {
            info!(title = %post.title, "Post exists, skipping");
            continue;
        }
        let slug = make_unique(
            &post_slug_base(&post.title, None),
            &slugs,
            Some(POST_SLUG_MAX_LEN),
        );
        let tag_ids: Vec<NewsTagId> = post
            .tags
            .iter()
            .filter_map(|name| {
                let id = tags.get(name).copied();
                if id.is_none() {
                    warn!(post = %post.title, tag = %name, "Unknown tag");
                }
                id
            })
            .collect();

        let new_post = NewPost {
            title: post.title.clone(),
            slug: slug.clone(),
            subtitle: post.subtitle.clone(),
            excerpt: post.excerpt.clone(),
            category_id: post
                .category
                .as_ref()
                .and_then(|c| categories.get(c).copied()),
            author_id: post.author.as_ref().and_then(|a| authors.get(a).copied()),
            featured_image: post.featured_image.clone(),
            content: post.content.clone(),
            is_featured: post.is_featured,
            is_top: post.is_top,
            meta_description: post.meta_description.clone(),
            meta_keywords: post.meta_keywords.clone(),
            first_published_at: post.published_at,
        };
        let id = news.insert_post(&new_post, &tag_ids).await?;
        info!(title = %post.title, slug = %slug, "Post created");
        slugs.insert(slug);
        posts.insert(post.title.clone(), id);
    }

    for post in seed.posts.iter().filter(|p| !p.related.is_empty()) {
        let Some(&id) = posts.get(&post.title) else {
            continue;
        };
        let related: Vec<NewsPostId> = post
            .related
            .iter()
            .filter_map(|title| posts.get(title).copied())
            .collect();
        news.link_related(id, &related).await?;
    }

    info!(
        categories = seed.categories.len(),
        tags = seed.tags.len(),
        authors = seed.authors.len(),
        posts = seed.posts.len(),
        "News seeded"
    );
    Ok(())
}

async fn seed_pages(pool: &PgPool, seeds: &[PageSeed]) -> Result<(), RepositoryError> {
    let pages = PageRepository::new(pool);
    for page in seeds {
        pages
            .upsert(&page.slug, &page.title, &page.body, page.live)
            .await?;
        info!(slug = %page.slug, "Page saved");
    }
    Ok(())
}

async fn seed_site(pool: &PgPool, seed: &SiteSeed) -> Result<(), RepositoryError> {
    let settings = SettingsRepository::new(pool);
    let mut basic = settings.basic().await?;

    let overrides = [
        (&mut basic.site_name, &seed.site_name),
        (&mut basic.site_tagline, &seed.site_tagline),
        (&mut basic.site_description, &seed.site_description),
        (&mut basic.contact_email, &seed.contact_email),
        (&mut basic.contact_phone, &seed.contact_phone),
        (&mut basic.contact_address, &seed.contact_address),
        (&mut basic.support_email, &seed.support_email),
        (&mut basic.business_hours, &seed.business_hours),
        (&mut basic.facebook_url, &seed.facebook_url),
        (&mut basic.twitter_url, &seed.twitter_url),
        (&mut basic.instagram_url, &seed.instagram_url),
        (&mut basic.youtube_url, &seed.youtube_url),
        (&mut basic.linkedin_url, &seed.linkedin_url),
        (&mut basic.default_meta_title, &seed.default_meta_title),
        (&mut basic.default_meta_description, &seed.default_meta_description),
        (&mut basic.google_analytics_id, &seed.google_analytics_id),
        (&mut basic.google_tag_manager_id, &seed.google_tag_manager_id),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }

    settings.update_basic(&basic).await?;
    info!(site_name = %basic.site_name, "Site settings saved");
    Ok(())
}

async fn seed_legal(pool: &PgPool, seed: &LegalSeed) -> Result<(), RepositoryError> {
    let settings = SettingsRepository::new(pool);
    if let Some(body) = &seed.privacy {
        settings.update_legal(LegalPage::Privacy, body).await?;
        info!("Privacy policy saved");
    }
    if let Some(body) = &seed.terms {
        settings.update_legal(LegalPage::Terms, body).await?;
        info!("Terms of service saved");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_parses_with_defaults() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
vendor_categories:
  - name: 農業商家
vendors:
  - email: farm@example.com
    password: long-password
    name: 阿里山茶園
    category: 農業商家
    products:
      - name: 高山茶
        price: '350.00'
        stock: 20
",
        )
        .unwrap();

        let category = seed.vendor_categories.first().unwrap();
        assert_eq!(category.color, "#28a745");
        assert!(category.is_active);

        let product = seed.vendors.first().unwrap().products.first().unwrap();
        assert_eq!(product.price, Decimal::new(35000, 2));
        assert!(product.is_active);
        assert!(!product.is_featured);
        assert!(validate_seed(&seed).is_empty());
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        assert!(serde_yaml::from_str::<SeedFile>("vendorz: []").is_err());
    }

    #[test]
    fn test_bad_product_values_are_reported() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
vendors:
  - email: farm@example.com
    password: long-password
    name: 農場
    products:
      - { name: 負價, price: '-1', stock: 1 }
      - { name: 負庫存, price: '10', stock: -5 }
      - { name: 三位小數, price: '1.005' }
",
        )
        .unwrap();
        assert_eq!(validate_seed(&seed).len(), 3);
    }

    #[test]
    fn test_block_count_limits_are_enforced() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
pages:
  - slug: home
    title: 首頁
    body:
      - { type: hero, value: { title: 一, background_image: home/a.jpg } }
      - { type: hero, value: { title: 二, background_image: home/b.jpg } }
",
        )
        .unwrap();
        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 1);
        assert!(errors.first().unwrap().starts_with("page 'home':"));
    }

    #[test]
    fn test_unknown_block_type_is_reported() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
legal:
  terms:
    - { type: no_such_block, value: {} }
",
        )
        .unwrap();
        let errors = validate_seed(&seed);
        assert!(errors.first().unwrap().starts_with("terms of service:"));
    }
}
