//! Plain-text cleanup for user-submitted profile fields.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z!][^>]*>").expect("Invalid regex"));

/// Strip HTML tags and comments, keeping their text content, and trim.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "").trim().to_string()
}
