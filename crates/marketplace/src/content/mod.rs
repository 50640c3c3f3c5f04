//! Typed content blocks for editor-managed pages.
//!
//! Page bodies are stored as JSONB lists of `{"type", "value", "id"}`
//! objects. Each page family has its own block enum:
//!
//! - [`home`] - Home and cooperative-farmer landing pages
//! - [`news`] - News post bodies
//! - [`legal`] - Privacy policy and terms of service
//!
//! Bodies are parsed with [`parse_stream`] and checked with the family's
//! `validate` function before they are stored (seed command) or rendered.

pub mod home;
pub mod legal;
pub mod news;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use home::HomeBlock;
pub use legal::{PrivacyBlock, TermsBlock};
pub use news::NewsBlock;

/// Errors raised while parsing or validating a block stream.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid block data: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("block '{block}' may appear at most {max} times (found {found})")]
    TooManyBlocks {
        block: &'static str,
        max: usize,
        found: usize,
    },

    #[error("'{field}' needs between {min} and {max} entries (found {found})")]
    ListSize {
        field: &'static str,
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("'{field}' must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// One entry in a block stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamBlock<T> {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub block: T,
}

/// Parse a JSONB column into a typed block stream.
///
/// # Errors
///
/// Returns `ContentError::Invalid` if any entry has an unknown type or
/// malformed value.
pub fn parse_stream<T: DeserializeOwned>(
    value: &serde_json::Value,
) -> Result<Vec<StreamBlock<T>>, ContentError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(Vec::<StreamBlock<T>>::deserialize(value)?)
}

/// Check a list field's length against editor limits.
pub(crate) const fn check_len(
    field: &'static str,
    found: usize,
    min: usize,
    max: usize,
) -> Result<(), ContentError> {
    if found < min || found > max {
        return Err(ContentError::ListSize {
            field,
            min,
            max,
            found,
        });
    }
    Ok(())
}

/// Check a free-text field against its character limit.
pub(crate) fn check_chars(field: &'static str, value: &str, max: usize) -> Result<(), ContentError> {
    if value.chars().count() > max {
        return Err(ContentError::TooLong { field, max });
    }
    Ok(())
}

/// Enforce a per-page maximum for one block type.
pub(crate) fn check_block_count<T>(
    blocks: &[StreamBlock<T>],
    block: &'static str,
    max: usize,
    is_kind: impl Fn(&T) -> bool,
) -> Result<(), ContentError> {
    let found = blocks.iter().filter(|b| is_kind(&b.block)).count();
    if found > max {
        return Err(ContentError::TooManyBlocks { block, max, found });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_stream_null_is_empty() {
        let blocks: Vec<StreamBlock<NewsBlock>> = parse_stream(&serde_json::Value::Null).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_parse_stream_keeps_block_id() {
        let value = json!([
            {"type": "quote", "value": {"text": "好土壤種出好作物", "author": "老農"}, "id": "q1"}
        ]);
        let blocks: Vec<StreamBlock<NewsBlock>> = parse_stream(&value).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.first().unwrap().id, "q1");
    }

    #[test]
    fn test_parse_stream_rejects_unknown_type() {
        let value = json!([{"type": "carousel", "value": {}}]);
        let result: Result<Vec<StreamBlock<NewsBlock>>, _> = parse_stream(&value);
        assert!(matches!(result, Err(ContentError::Invalid(_))));
    }

    #[test]
    fn test_check_len_bounds() {
        assert!(check_len("features", 1, 1, 5).is_ok());
        assert!(check_len("features", 5, 1, 5).is_ok());
        assert!(matches!(
            check_len("features", 0, 1, 5),
            Err(ContentError::ListSize { found: 0, .. })
        ));
        assert!(check_len("features", 6, 1, 5).is_err());
    }

    #[test]
    fn test_check_chars_counts_characters() {
        assert!(check_chars("subtitle", "五十字以內", 5).is_ok());
        assert!(check_chars("subtitle", "超過五個字了", 5).is_err());
    }
}
