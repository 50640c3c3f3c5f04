//! Vendor self-service JSON API.
//!
//! Every route except `health` needs a signed-in user who owns a vendor;
//! others get 403 `{"error": "Vendor account required"}`.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::{info, instrument};

use shanghuyun_core::{ProductId, VendorCategoryId};

use crate::db::products::{ProductFields, ProductRepository};
use crate::db::vendors::{VendorFields, VendorRepository};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::models::Vendor;
use crate::models::catalog::{Product, ProductResponse, VendorResponse, limits};
use crate::models::session::CurrentUser;
use crate::routes::form::{FieldErrors, MultipartForm, read_multipart};
use crate::services::media::MediaKind;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "app": "vendor" }))
}

/// The vendor owned by the caller.
async fn own_vendor(state: &AppState, user: &CurrentUser) -> Result<Vendor, ApiError> {
    VendorRepository::new(state.pool())
        .get_by_user(user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Vendor account required"))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<VendorResponse>, ApiError> {
    let vendor = own_vendor(&state, &user).await?;
    Ok(Json(VendorResponse::from(&vendor)))
}

/// Update the caller's vendor from a multipart form. Missing fields keep
/// their current value; an empty `category_id` clears the category.
#[instrument(skip(state, multipart), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Json<VendorResponse>, ApiError> {
    let vendor = own_vendor(&state, &user).await?;
    let form = read_multipart(multipart, "").await?;
    let repo = VendorRepository::new(state.pool());

    let mut errors = FieldErrors::default();
    let name = if form.fields.contains_key("name") {
        errors.required_text(&form.fields, "name", limits::NAME)
    } else {
        vendor.name.clone()
    };
    let intro = errors.text(&form.fields, "intro", limits::INTRO);
    let description = errors.text(&form.fields, "description", limits::DESCRIPTION);
    let address = errors.text(&form.fields, "address", limits::ADDRESS);
    let phone = errors.text(&form.fields, "phone", limits::PHONE);

    let category_id = match form.fields.get("category_id").map(|v| v.trim()) {
        None => vendor.category_id,
        Some("") => None,
        Some(raw) => {
            let id = raw.parse::<VendorCategoryId>().ok();
            let exists = match id {
                Some(id) => repo.category_exists(id).await?,
                None => false,
            };
            if exists {
                id
            } else {
                errors.add("category_id", "無效的分類。");
                vendor.category_id
            }
        }
    };
    errors.into_result()?;

    let fields = VendorFields {
        name,
        intro: intro.unwrap_or(vendor.intro),
        description: description.unwrap_or(vendor.description),
        address: address.unwrap_or(vendor.address),
        phone: phone.unwrap_or(vendor.phone),
        category_id,
    };
    let updated = repo.update(vendor.id, &fields).await?;
    info!(vendor_id = %updated.id, "Vendor profile updated");
    Ok(Json(VendorResponse::from(&updated)))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn list_products(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let vendor = own_vendor(&state, &user).await?;
    let products = ProductRepository::new(state.pool())
        .list_by_vendor(vendor.id)
        .await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// Validate product fields, falling back to `current` for missing ones.
fn product_fields(form: &MultipartForm, current: Option<&Product>) -> Result<ProductFields, ApiError> {
    let mut errors = FieldErrors::default();
    let fields = &form.fields;

    let name = match current {
        Some(p) if !fields.contains_key("name") => p.name.clone(),
        _ => errors.required_text(fields, "name", limits::PRODUCT_NAME),
    };
    let description = match fields.get("description") {
        Some(text) => text.trim().to_string(),
        None => current.map(|p| p.description.clone()).unwrap_or_default(),
    };
    let price = match current {
        Some(p) if !fields.contains_key("price") => p.price,
        _ => errors.price(fields, "price"),
    };
    let stock = errors.count(fields, "stock", current.map_or(0, |p| p.stock));
    let is_featured = errors.boolean(fields, "is_featured", current.is_some_and(|p| p.is_featured));
    let is_active = errors.boolean(fields, "is_active", current.is_none_or(|p| p.is_active));
    errors.into_result()?;

    Ok(ProductFields {
        name,
        description,
        price,
        stock,
        is_featured,
        is_active,
    })
}

#[instrument(skip(state, multipart), fields(user_id = %user.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = own_vendor(&state, &user).await?;
    let form = read_multipart(multipart, "image").await?;
    let fields = product_fields(&form, None)?;

    let media = state.media();
    let image = match &form.file {
        Some(upload) => Some(media.save(MediaKind::ProductImage, upload).await?),
        None => None,
    };

    let product = match ProductRepository::new(state.pool())
        .create(vendor.id, &fields, image.as_deref())
        .await
    {
        Ok(product) => product,
        Err(e) => {
            if let Some(path) = &image {
                media.delete(path).await;
            }
            return Err(e.into());
        }
    };

    info!(vendor_id = %vendor.id, product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

#[instrument(skip(state, multipart), fields(user_id = %user.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>, ApiError> {
    let vendor = own_vendor(&state, &user).await?;
    let repo = ProductRepository::new(state.pool());
    let current = repo
        .get_by_id(product_id)
        .await?
        .filter(|p| p.vendor_id == vendor.id)
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    let form = read_multipart(multipart, "image").await?;
    let fields = product_fields(&form, Some(&current))?;

    let media = state.media();
    let image = match &form.file {
        Some(upload) => Some(media.save(MediaKind::ProductImage, upload).await?),
        None => None,
    };

    let product = match repo
        .update(vendor.id, product_id, &fields, image.as_deref())
        .await
    {
        Ok(product) => product,
        Err(e) => {
            if let Some(path) = &image {
                media.delete(path).await;
            }
            return Err(e.into());
        }
    };

    if let (Some(_), Some(old)) = (&image, &current.image) {
        media.delete(old).await;
    }

    info!(vendor_id = %vendor.id, product_id = %product.id, "Product updated");
    Ok(Json(ProductResponse::from(&product)))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    let vendor = own_vendor(&state, &user).await?;
    let image = ProductRepository::new(state.pool())
        .delete(vendor.id, product_id)
        .await?;
    if let Some(path) = image {
        state.media().delete(&path).await;
    }
    info!(vendor_id = %vendor.id, product_id = %product_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shanghuyun_core::VendorId;

    fn form(pairs: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            fields: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            file: None,
        }
    }

    fn product() -> Product {
        Product {
            id: ProductId::new(3),
            vendor_id: VendorId::new(1),
            name: "高山茶".to_string(),
            description: "春茶".to_string(),
            price: Decimal::new(350, 0),
            stock: 10,
            image: None,
            sales_count: 0,
            is_featured: true,
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_health_body() {
        let Json(body) = health().await;
        assert_eq!(body, json!({"status": "ok", "app": "vendor"}));
    }

    #[test]
    fn test_new_product_defaults() {
        let fields = product_fields(&form(&[("name", "有機米"), ("price", "120")]), None).unwrap();
        assert_eq!(fields.stock, 0);
        assert!(fields.is_active);
        assert!(!fields.is_featured);
        assert_eq!(fields.price, Decimal::new(120, 0));
    }

    #[test]
    fn test_new_product_requires_name_and_price() {
        let err = product_fields(&form(&[]), None).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.body().get("name").is_some());
        assert!(err.body().get("price").is_some());
    }

    #[test]
    fn test_update_keeps_missing_fields() {
        let current = product();
        let fields = product_fields(&form(&[("stock", "4")]), Some(&current)).unwrap();
        assert_eq!(fields.name, "高山茶");
        assert_eq!(fields.price, Decimal::new(350, 0));
        assert_eq!(fields.stock, 4);
        assert!(fields.is_featured);
        assert!(!fields.is_active);
    }
}
