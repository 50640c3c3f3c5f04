//! Vendor and vendor-category repository.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;

use shanghuyun_core::{UserId, VendorCategoryId, VendorId};

use super::{RepositoryError, conflict_or_database};
use crate::models::catalog::{Product, Vendor, VendorCard, VendorCategory};

/// Number of best sellers shown on each vendor card.
pub const TOP_PRODUCTS_PER_VENDOR: i64 = 4;

const VENDOR_COLUMNS: &str = "id, user_id, name, intro, description, address, phone, \
     category_id, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, slug, description, color, icon, is_active, \
     sort_order, created_at, updated_at";

/// Editable vendor fields.
#[derive(Debug, Clone, Default)]
pub struct VendorFields {
    pub name: String,
    pub intro: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub category_id: Option<VendorCategoryId>,
}

/// A vendor category to insert. The slug must already be unique.
#[derive(Debug, Clone)]
pub struct NewVendorCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
    pub sort_order: i32,
}

pub struct VendorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VendorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM marketplace.vendor WHERE id = $1");
        let vendor = sqlx::query_as::<_, Vendor>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(vendor)
    }

    /// The vendor owned by a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Vendor>, RepositoryError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM marketplace.vendor WHERE user_id = $1");
        let vendor = sqlx::query_as::<_, Vendor>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(vendor)
    }

    /// Every vendor with its category and top-selling active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_cards(&self) -> Result<Vec<VendorCard>, RepositoryError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM marketplace.vendor ORDER BY id");
        let vendors = sqlx::query_as::<_, Vendor>(&sql)
            .fetch_all(self.pool)
            .await?;

        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM marketplace.vendor_category");
        let categories: HashMap<VendorCategoryId, VendorCategory> =
            sqlx::query_as::<_, VendorCategory>(&sql)
                .fetch_all(self.pool)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

        let top = sqlx::query_as::<_, Product>(
            r"
            SELECT id, vendor_id, name, description, price, stock, image, sales_count,
                   is_featured, is_active, created_at, updated_at
            FROM (
                SELECT p.*, ROW_NUMBER() OVER (
                    PARTITION BY p.vendor_id
                    ORDER BY p.sales_count DESC, p.created_at DESC
                ) AS rank
                FROM marketplace.product p
                WHERE p.is_active
            ) ranked
            WHERE rank <= $1
            ORDER BY vendor_id, rank
            ",
        )
        .bind(TOP_PRODUCTS_PER_VENDOR)
        .fetch_all(self.pool)
        .await?;

        let mut by_vendor: HashMap<VendorId, Vec<Product>> = HashMap::new();
        for product in top {
            by_vendor.entry(product.vendor_id).or_default().push(product);
        }

        Ok(vendors
            .into_iter()
            .map(|vendor| VendorCard {
                category: vendor.category_id.and_then(|id| categories.get(&id).cloned()),
                top_products: by_vendor.remove(&vendor.id).unwrap_or_default(),
                vendor,
            })
            .collect())
    }

    /// Create a vendor for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already owns a vendor.
    pub async fn create(
        &self,
        user_id: UserId,
        fields: &VendorFields,
    ) -> Result<Vendor, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO marketplace.vendor
                (user_id, name, intro, description, address, phone, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VENDOR_COLUMNS}
            "
        );
        sqlx::query_as::<_, Vendor>(&sql)
            .bind(user_id)
            .bind(&fields.name)
            .bind(&fields.intro)
            .bind(&fields.description)
            .bind(&fields.address)
            .bind(&fields.phone)
            .bind(fields.category_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "vendor for this user"))
    }

    /// Replace a vendor's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor does not exist.
    pub async fn update(
        &self,
        id: VendorId,
        fields: &VendorFields,
    ) -> Result<Vendor, RepositoryError> {
        let sql = format!(
            r"
            UPDATE marketplace.vendor SET
                name = $2, intro = $3, description = $4, address = $5, phone = $6,
                category_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {VENDOR_COLUMNS}
            "
        );
        sqlx::query_as::<_, Vendor>(&sql)
            .bind(id)
            .bind(&fields.name)
            .bind(&fields.intro)
            .bind(&fields.description)
            .bind(&fields.address)
            .bind(&fields.phone)
            .bind(fields.category_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Active categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_categories(&self) -> Result<Vec<VendorCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM marketplace.vendor_category \
             WHERE is_active ORDER BY sort_order, name"
        );
        let categories = sqlx::query_as::<_, VendorCategory>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_exists(&self, id: VendorCategoryId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM marketplace.vendor_category WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Slugs already in use by vendor categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_slugs(&self) -> Result<HashSet<String>, RepositoryError> {
        let slugs = sqlx::query_scalar::<_, String>("SELECT slug FROM marketplace.vendor_category")
            .fetch_all(self.pool)
            .await?;
        Ok(slugs.into_iter().collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn insert_category(
        &self,
        category: &NewVendorCategory,
    ) -> Result<VendorCategory, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO marketplace.vendor_category
                (name, slug, description, color, icon, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CATEGORY_COLUMNS}
            "
        );
        sqlx::query_as::<_, VendorCategory>(&sql)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.color)
            .bind(&category.icon)
            .bind(category.is_active)
            .bind(category.sort_order)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "vendor category slug"))
    }

    /// Number of vendors and of active categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<(i64, i64), RepositoryError> {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r"
            SELECT
                (SELECT COUNT(*) FROM marketplace.vendor),
                (SELECT COUNT(*) FROM marketplace.vendor_category WHERE is_active)
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }
}
