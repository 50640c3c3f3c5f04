//! Vendors, vendor categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shanghuyun_core::{ProductId, StockStatus, UserId, VendorCategoryId, VendorId, decimal_to_f64};

/// Grouping for vendors on the cooperative-farmers page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorCategory {
    pub id: VendorCategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Hex colour such as `#28a745`.
    pub color: String,
    /// Font Awesome class.
    pub icon: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A seller. Each user owns at most one vendor.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Vendor {
    pub id: VendorId,
    pub user_id: UserId,
    pub name: String,
    pub intro: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub category_id: Option<VendorCategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vendor field limits.
pub mod limits {
    pub const NAME: usize = 100;
    pub const INTRO: usize = 20;
    pub const DESCRIPTION: usize = 20;
    pub const ADDRESS: usize = 255;
    pub const PHONE: usize = 20;
    pub const PRODUCT_NAME: usize = 100;
}

/// A vendor with its category and best-selling products, for listings.
#[derive(Debug, Clone)]
pub struct VendorCard {
    pub vendor: Vendor,
    pub category: Option<VendorCategory>,
    pub top_products: Vec<Product>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    /// Media path of the product image.
    pub image: Option<String>,
    pub sales_count: i32,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }

    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Product as returned by the vendor self-service API.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub image: Option<String>,
    pub sales_count: i32,
    pub is_featured: bool,
    pub is_active: bool,
    pub stock_status: &'static str,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.as_i32(),
            name: p.name.clone(),
            description: p.description.clone(),
            price: decimal_to_f64(p.price),
            stock: p.stock,
            image: p.image.as_ref().map(|path| format!("/media/{path}")),
            sales_count: p.sales_count,
            is_featured: p.is_featured,
            is_active: p.is_active,
            stock_status: p.stock_status().as_str(),
        }
    }
}

/// Vendor as returned by the vendor self-service API.
#[derive(Debug, Serialize)]
pub struct VendorResponse {
    pub id: i32,
    pub name: String,
    pub intro: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub category_id: Option<i32>,
}

impl From<&Vendor> for VendorResponse {
    fn from(v: &Vendor) -> Self {
        Self {
            id: v.id.as_i32(),
            name: v.name.clone(),
            intro: v.intro.clone(),
            description: v.description.clone(),
            address: v.address.clone(),
            phone: v.phone.clone(),
            category_id: v.category_id.map(|id| id.as_i32()),
        }
    }
}
