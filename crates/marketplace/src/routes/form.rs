//! Multipart form reading and field validation for the JSON APIs.

use std::collections::{BTreeMap, HashMap};

use axum::extract::Multipart;
use rust_decimal::Decimal;

use crate::error::ApiError;
use crate::services::media::{MediaError, Upload, read_upload};
use crate::services::sanitize::strip_tags;

/// A multipart body split into text fields and one optional file.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<Upload>,
}

/// Read a multipart body, taking the file from `file_field`.
///
/// An empty file part (a form submitted without choosing a file) counts
/// as no file.
///
/// # Errors
///
/// Returns a field error on `file_field` for a rejected upload and 400 for
/// a malformed body.
pub async fn read_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == file_field && field.file_name().is_some() {
            match read_upload(field).await {
                Ok(upload) => form.file = Some(upload),
                Err(MediaError::Empty) => {}
                Err(e) if e.is_client_error() => return Err(ApiError::field(file_field, e.to_string())),
                Err(e) => return Err(e.into()),
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Collects `{"field": ["message", ...]}` validation errors.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok` when nothing was recorded, otherwise the 400 response.
    ///
    /// # Errors
    ///
    /// Returns the collected errors as an `ApiError`.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::fields(self.0))
        }
    }

    /// A tag-stripped text field, checked against `max` characters.
    /// Missing fields are `None`.
    pub fn text(
        &mut self,
        fields: &HashMap<String, String>,
        name: &str,
        max: usize,
    ) -> Option<String> {
        let value = strip_tags(fields.get(name)?);
        let len = value.chars().count();
        if len > max {
            self.add(name, format!("請確認此欄位最多 {max} 個字元（目前 {len} 個）。"));
        }
        Some(value)
    }

    /// A required tag-stripped text field.
    pub fn required_text(
        &mut self,
        fields: &HashMap<String, String>,
        name: &str,
        max: usize,
    ) -> String {
        match self.text(fields, name, max) {
            Some(value) if !value.is_empty() => value,
            _ => {
                self.add(name, "此欄位為必填。");
                String::new()
            }
        }
    }

    /// A boolean field; missing is `default`.
    pub fn boolean(&mut self, fields: &HashMap<String, String>, name: &str, default: bool) -> bool {
        match fields.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => default,
            Some(v) => match v.as_str() {
                "true" | "1" | "on" | "yes" => true,
                "false" | "0" | "off" | "no" | "" => false,
                _ => {
                    self.add(name, "必須是有效的布林值。");
                    default
                }
            },
        }
    }

    /// A non-negative whole number field; missing is `default`.
    pub fn count(&mut self, fields: &HashMap<String, String>, name: &str, default: i32) -> i32 {
        let Some(raw) = fields.get(name) else {
            return default;
        };
        match raw.trim().parse::<i32>() {
            Ok(n) if n >= 0 => n,
            _ => {
                self.add(name, "請輸入大於或等於 0 的整數。");
                default
            }
        }
    }

    /// A required non-negative price with at most two decimal places.
    pub fn price(&mut self, fields: &HashMap<String, String>, name: &str) -> Decimal {
        let parsed = fields.get(name).map(|raw| raw.trim().parse::<Decimal>());
        match parsed {
            Some(Ok(price)) if price >= Decimal::ZERO && price.scale() <= 2 => price,
            Some(Ok(_)) => {
                self.add(name, "請輸入大於或等於 0、最多兩位小數的金額。");
                Decimal::ZERO
            }
            Some(Err(_)) => {
                self.add(name, "請輸入有效的數字。");
                Decimal::ZERO
            }
            None => {
                self.add(name, "此欄位為必填。");
                Decimal::ZERO
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_text_strips_tags_and_checks_length() {
        let mut errors = FieldErrors::default();
        let long_phone = "9".repeat(21);
        let form = fields(&[("nickname", "<b>阿明</b>"), ("phone", long_phone.as_str())]);

        assert_eq!(errors.text(&form, "nickname", 20).as_deref(), Some("阿明"));
        assert!(errors.is_empty());

        errors.text(&form, "phone", 20);
        assert_eq!(errors.text(&form, "missing", 20), None);

        let body = errors.into_result().unwrap_err();
        assert_eq!(body.body()["phone"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut errors = FieldErrors::default();
        let name = "王".repeat(20);
        let form = fields(&[("real_name", name.as_str())]);
        errors.text(&form, "real_name", 20);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_boolean_values() {
        let mut errors = FieldErrors::default();
        let form = fields(&[("a", "true"), ("b", "0"), ("c", "maybe")]);
        assert!(errors.boolean(&form, "a", false));
        assert!(!errors.boolean(&form, "b", true));
        assert!(errors.boolean(&form, "missing", true));
        assert!(!errors.boolean(&form, "c", false));
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_price_and_count() {
        let mut errors = FieldErrors::default();
        let form = fields(&[("price", "199.50"), ("stock", "12")]);
        assert_eq!(errors.price(&form, "price"), Decimal::new(19950, 2));
        assert_eq!(errors.count(&form, "stock", 0), 12);
        assert!(errors.is_empty());

        let form = fields(&[("price", "-1"), ("stock", "-3")]);
        errors.price(&form, "price");
        errors.count(&form, "stock", 0);
        let body = errors.into_result().unwrap_err();
        assert!(body.body().get("price").is_some());
        assert!(body.body().get("stock").is_some());
    }

    #[test]
    fn test_required_text() {
        let mut errors = FieldErrors::default();
        let form = fields(&[("name", "  ")]);
        assert_eq!(errors.required_text(&form, "name", 100), "");
        assert!(!errors.is_empty());
    }
}
