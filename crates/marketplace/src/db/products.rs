//! Product repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use shanghuyun_core::{ProductId, VendorId};

use super::RepositoryError;
use crate::models::catalog::Product;
use crate::models::pagination::{Paginated, offset, resolve_page};

/// Products per page on a vendor's product list.
pub const VENDOR_PRODUCTS_PER_PAGE: i64 = 12;
/// Related products shown on a product page.
pub const RELATED_PRODUCTS: i64 = 4;

const PRODUCT_COLUMNS: &str = "id, vendor_id, name, description, price, stock, image, \
     sales_count, is_featured, is_active, created_at, updated_at";

/// Fields written when creating or updating a product.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_featured: bool,
    pub is_active: bool,
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM marketplace.product WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Get an active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get_by_id(id).await?.filter(|p| p.is_active))
    }

    /// Get an active product that belongs to the given vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_for_vendor(
        &self,
        vendor_id: VendorId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .get_active(id)
            .await?
            .filter(|p| p.vendor_id == vendor_id))
    }

    /// One page of a vendor's active products, best sellers first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_active_by_vendor(
        &self,
        vendor_id: VendorId,
        raw_page: Option<&str>,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM marketplace.product WHERE vendor_id = $1 AND is_active",
        )
        .bind(vendor_id)
        .fetch_one(self.pool)
        .await?;

        let page = resolve_page(raw_page, total, VENDOR_PRODUCTS_PER_PAGE);
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM marketplace.product
            WHERE vendor_id = $1 AND is_active
            ORDER BY sales_count DESC, created_at DESC
            LIMIT $2 OFFSET $3
            "
        );
        let items = sqlx::query_as::<_, Product>(&sql)
            .bind(vendor_id)
            .bind(VENDOR_PRODUCTS_PER_PAGE)
            .bind(offset(page, VENDOR_PRODUCTS_PER_PAGE))
            .fetch_all(self.pool)
            .await?;

        Ok(Paginated::new(items, page, VENDOR_PRODUCTS_PER_PAGE, total))
    }

    /// Every product of a vendor, active or not, for self-service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_vendor(&self, vendor_id: VendorId) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM marketplace.product WHERE vendor_id = $1 \
             ORDER BY sales_count DESC, created_at DESC"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(vendor_id)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Other active products of the same vendor, best sellers first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(&self, product: &Product) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM marketplace.product
            WHERE vendor_id = $1 AND is_active AND id <> $2
            ORDER BY sales_count DESC, created_at DESC
            LIMIT $3
            "
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(product.vendor_id)
            .bind(product.id)
            .bind(RELATED_PRODUCTS)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        vendor_id: VendorId,
        fields: &ProductFields,
        image: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO marketplace.product
                (vendor_id, name, description, price, stock, image, is_featured, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(vendor_id)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(fields.price)
            .bind(fields.stock)
            .bind(image)
            .bind(fields.is_featured)
            .bind(fields.is_active)
            .fetch_one(self.pool)
            .await?;
        Ok(product)
    }

    /// Update a vendor's product. `image` of `None` keeps the current image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another vendor.
    pub async fn update(
        &self,
        vendor_id: VendorId,
        id: ProductId,
        fields: &ProductFields,
        image: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            UPDATE marketplace.product SET
                name = $3, description = $4, price = $5, stock = $6,
                image = COALESCE($7, image), is_featured = $8, is_active = $9,
                updated_at = NOW()
            WHERE id = $1 AND vendor_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(vendor_id)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(fields.price)
            .bind(fields.stock)
            .bind(image)
            .bind(fields.is_featured)
            .bind(fields.is_active)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a vendor's product and return its image path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another vendor.
    pub async fn delete(
        &self,
        vendor_id: VendorId,
        id: ProductId,
    ) -> Result<Option<String>, RepositoryError> {
        let image = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM marketplace.product WHERE id = $1 AND vendor_id = $2 RETURNING image",
        )
        .bind(id)
        .bind(vendor_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(image)
    }
}
