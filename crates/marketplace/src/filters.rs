//! Custom Askama template filters.
//!
//! The arithmetic filters parse both operands as integers and render 0
//! when either side is not a number or the divisor is zero. Division and
//! remainder round toward negative infinity, so `-7|div(2)` is -4 and
//! `-7|modulo(3)` is 2.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

fn parse_int(value: &impl Display) -> Option<i64> {
    value.to_string().trim().parse().ok()
}

fn apply(lhs: &impl Display, rhs: &impl Display, op: fn(i64, i64) -> Option<i64>) -> i64 {
    parse_int(lhs)
        .zip(parse_int(rhs))
        .and_then(|(a, b)| op(a, b))
        .unwrap_or(0)
}

/// Quotient rounded toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Remainder with the sign of the divisor.
fn floor_rem(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(r + b)
    } else {
        Some(r)
    }
}

/// Usage in templates: `{{ page|mul(6) }}`
#[askama::filter_fn]
pub fn mul<T: Display>(
    value: impl Display,
    _env: &dyn askama::Values,
    arg: T,
) -> askama::Result<i64> {
    Ok(apply(&value, &arg, i64::checked_mul))
}

/// Integer division: `{{ total|div(2) }}`
#[askama::filter_fn]
pub fn div<T: Display>(
    value: impl Display,
    _env: &dyn askama::Values,
    arg: T,
) -> askama::Result<i64> {
    Ok(apply(&value, &arg, floor_div))
}

/// Remainder: `{{ loop.index0|modulo(3) }}`. Named `modulo` since `mod`
/// is a keyword.
#[askama::filter_fn]
pub fn modulo<T: Display>(
    value: impl Display,
    _env: &dyn askama::Values,
    arg: T,
) -> askama::Result<i64> {
    Ok(apply(&value, &arg, floor_rem))
}

/// Usage in templates: `{{ stock|subtract(1) }}`
#[askama::filter_fn]
pub fn subtract<T: Display>(
    value: impl Display,
    _env: &dyn askama::Values,
    arg: T,
) -> askama::Result<i64> {
    Ok(apply(&value, &arg, i64::checked_sub))
}

/// URL of a stored media path, e.g. `products/abc.jpg` to `/media/products/abc.jpg`.
///
/// Absolute URLs are returned unchanged.
#[askama::filter_fn]
pub fn media_url(path: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(media_path_url(&path.to_string()))
}

pub(crate) fn media_path_url(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/media/{path}")
    }
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(apply(&6, &7, i64::checked_mul), 42);
        assert_eq!(apply(&7, &2, floor_div), 3);
        assert_eq!(apply(&7, &3, floor_rem), 1);
        assert_eq!(apply(&"10", &" 4 ", i64::checked_sub), 6);
    }

    #[test]
    fn test_bad_operands_render_zero() {
        assert_eq!(apply(&"abc", &2, i64::checked_mul), 0);
        assert_eq!(apply(&3, &"1.5", i64::checked_sub), 0);
        assert_eq!(apply(&5, &0, floor_div), 0);
        assert_eq!(apply(&5, &0, floor_rem), 0);
        assert_eq!(apply(&i64::MIN, &-1, floor_div), 0);
    }

    #[test]
    fn test_negative_operands_round_down() {
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(-8, 2), Some(-4));
        assert_eq!(floor_div(-7, -2), Some(3));
        assert_eq!(floor_rem(-7, 3), Some(2));
        assert_eq!(floor_rem(7, -3), Some(-2));
        assert_eq!(floor_rem(-7, -3), Some(-1));
        assert_eq!(floor_rem(-6, 3), Some(0));
    }

    #[test]
    fn test_media_path_url() {
        assert_eq!(media_path_url("products/a.jpg"), "/media/products/a.jpg");
        assert_eq!(media_path_url("/static/img/logo.png"), "/static/img/logo.png");
        assert_eq!(
            media_path_url("https://cdn.example.tw/a.png"),
            "https://cdn.example.tw/a.png"
        );
    }
}
