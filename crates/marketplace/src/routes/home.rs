//! Home page and vendor directory handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{instrument, warn};

use shanghuyun_core::{ProductId, VendorId};

use crate::content::{HomeBlock, StreamBlock, parse_stream};
use crate::db::pages::PageRepository;
use crate::db::products::ProductRepository;
use crate::db::vendors::VendorRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::page::{COOPERATIVE_FARMERS_SLUG, HOME_SLUG};
use crate::models::{HomePage, PagerView, Paginated, Product, Vendor, VendorCard, VendorCategory};
use crate::routes::PageContext;
use crate::state::AppState;

/// `?page=` for paginated lists. Kept as a string so junk reads as page 1.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Parse a stored page body; a malformed body renders as empty.
pub(crate) fn page_blocks(page: Option<&HomePage>) -> Vec<StreamBlock<HomeBlock>> {
    let Some(page) = page else {
        return Vec::new();
    };
    parse_stream(&page.body).unwrap_or_else(|e| {
        warn!(slug = %page.slug, error = %e, "Unreadable page body");
        Vec::new()
    })
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home/index.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub title: String,
    pub blocks: Vec<StreamBlock<HomeBlock>>,
}

/// Display the home page.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> Result<impl IntoResponse> {
    let home = PageRepository::new(state.pool()).get_live(HOME_SLUG).await?;

    Ok(HomeTemplate {
        title: home.as_ref().map(|p| p.title.clone()).unwrap_or_default(),
        blocks: page_blocks(home.as_ref()),
        page,
    })
}

/// Vendor directory template.
#[derive(Template, WebTemplate)]
#[template(path = "home/cooperative_farmers.html")]
pub struct CooperativeFarmersTemplate {
    pub page: PageContext,
    pub vendors: Vec<VendorCard>,
    pub categories: Vec<VendorCategory>,
    pub total_vendors: i64,
    pub total_categories: i64,
    pub blocks: Vec<StreamBlock<HomeBlock>>,
}

/// Display every vendor with its best sellers.
#[instrument(skip(state, page))]
pub async fn cooperative_farmers(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let vendors = VendorRepository::new(state.pool());
    let cards = vendors.list_cards().await?;
    let categories = vendors.list_active_categories().await?;
    let (total_vendors, total_categories) = vendors.stats().await?;
    let landing = PageRepository::new(state.pool())
        .get_live(COOPERATIVE_FARMERS_SLUG)
        .await?;

    Ok(CooperativeFarmersTemplate {
        page,
        vendors: cards,
        categories,
        total_vendors,
        total_categories,
        blocks: page_blocks(landing.as_ref()),
    })
}

/// Vendor product list template.
#[derive(Template, WebTemplate)]
#[template(path = "home/vendor_products.html")]
pub struct VendorProductsTemplate {
    pub page: PageContext,
    pub vendor: Vendor,
    pub products: Paginated<Product>,
    pub pager: PagerView,
}

/// Display a vendor's active products, twelve per page.
#[instrument(skip(state, page))]
pub async fn vendor_products(
    State(state): State<AppState>,
    Path(vendor_id): Path<VendorId>,
    Query(query): Query<PageQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let vendor = VendorRepository::new(state.pool())
        .get_by_id(vendor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("vendor {vendor_id}")))?;
    let products = ProductRepository::new(state.pool())
        .list_active_by_vendor(vendor.id, query.page.as_deref())
        .await?;

    let pager = PagerView::new(&products, &format!("/home/vendor/{}/products?", vendor.id));

    Ok(VendorProductsTemplate {
        page,
        vendor,
        products,
        pager,
    })
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "home/product_detail.html")]
pub struct ProductDetailTemplate {
    pub page: PageContext,
    pub vendor: Vendor,
    pub product: Product,
    pub related: Vec<Product>,
}

/// Display one active product of a vendor.
#[instrument(skip(state, page))]
pub async fn product_detail(
    State(state): State<AppState>,
    Path((vendor_id, product_id)): Path<(VendorId, ProductId)>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound(format!("product {product_id}"));

    let vendor = VendorRepository::new(state.pool())
        .get_by_id(vendor_id)
        .await?
        .ok_or_else(not_found)?;
    let products = ProductRepository::new(state.pool());
    let product = products
        .get_active_for_vendor(vendor.id, product_id)
        .await?
        .ok_or_else(not_found)?;
    let related = products.related(&product).await?;

    Ok(ProductDetailTemplate {
        page,
        vendor,
        product,
        related,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use shanghuyun_core::PageId;

    fn page(body: serde_json::Value) -> HomePage {
        HomePage {
            id: PageId::new(1),
            slug: HOME_SLUG.to_string(),
            title: "首頁".to_string(),
            body,
            live: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_page_blocks_missing_page_is_empty() {
        assert!(page_blocks(None).is_empty());
    }

    #[test]
    fn test_page_blocks_malformed_body_is_empty() {
        let p = page(json!([{"type": "unknown", "value": {}}]));
        assert!(page_blocks(Some(&p)).is_empty());
    }

    #[test]
    fn test_page_blocks_parses_hero() {
        let p = page(json!([{
            "type": "hero",
            "value": {"title": "在地好物", "background_image": "hero.jpg"},
            "id": "h1"
        }]));
        let blocks = page_blocks(Some(&p));
        assert!(matches!(
            blocks.first().map(|b| &b.block),
            Some(HomeBlock::Hero(h)) if h.title == "在地好物"
        ));
    }
}
