//! News post body blocks.

use serde::{Deserialize, Serialize};

use super::{ContentError, StreamBlock, check_block_count, check_chars};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NewsBlock {
    Heading(HeadingBlock),
    /// Rich text (HTML).
    Paragraph(String),
    Image(ImageBlock),
    Quote(QuoteBlock),
    CallToAction(CallToActionBlock),
    /// Video page URL (YouTube or Vimeo).
    EmbedVideo(String),
    Document(DocumentBlock),
    Table(TableBlock),
    Code(CodeBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingBlock {
    pub heading_text: String,
    #[serde(default)]
    pub size: HeadingSize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingSize {
    #[default]
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingSize {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBlock {
    pub image: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub alignment: Alignment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBlock {
    pub text: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToActionBlock {
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub button_text: String,
    pub button_url: String,
    #[serde(default)]
    pub button_style: ButtonStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Success,
    Warning,
}

impl ButtonStyle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Success => "success",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBlock {
    /// Media path or absolute URL of the file.
    pub document: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub caption: String,
    pub table_html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub language: CodeLanguage,
    pub code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    #[default]
    Python,
    Javascript,
    Html,
    Css,
    Bash,
    Json,
    Xml,
    Sql,
}

impl CodeLanguage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Html => "html",
            Self::Css => "css",
            Self::Bash => "bash",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Sql => "sql",
        }
    }
}

/// Turn a video page URL into its embeddable player URL.
///
/// Unknown hosts are returned unchanged.
#[must_use]
pub fn embed_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let host = parsed.host_str().unwrap_or_default().trim_start_matches("www.");

    match host {
        "youtube.com" | "m.youtube.com" => parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map_or_else(
                || url.to_string(),
                |(_, id)| format!("https://www.youtube.com/embed/{id}"),
            ),
        "youtu.be" => {
            let id = parsed.path().trim_start_matches('/');
            format!("https://www.youtube.com/embed/{id}")
        }
        "vimeo.com" => {
            let id = parsed.path().trim_start_matches('/');
            format!("https://player.vimeo.com/video/{id}")
        }
        _ => url.to_string(),
    }
}

impl NewsBlock {
    fn validate(&self) -> Result<(), ContentError> {
        match self {
            Self::Image(b) => {
                check_chars("caption", &b.caption, 250)?;
                check_chars("alt_text", &b.alt_text, 100)
            }
            Self::CallToAction(b) => check_chars("button_text", &b.button_text, 50),
            _ => Ok(()),
        }
    }
}

/// Validate a post body: at most ten headings and three calls to action.
///
/// # Errors
///
/// Returns the first `ContentError` found.
pub fn validate(blocks: &[StreamBlock<NewsBlock>]) -> Result<(), ContentError> {
    check_block_count(blocks, "heading", 10, |b| matches!(b, NewsBlock::Heading(_)))?;
    check_block_count(blocks, "call_to_action", 3, |b| {
        matches!(b, NewsBlock::CallToAction(_))
    })?;
    blocks.iter().try_for_each(|b| b.block.validate())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::content::parse_stream;
    use serde_json::json;

    #[test]
    fn test_heading_defaults_to_h2() {
        let value = json!([{"type": "heading", "value": {"heading_text": "市場行情"}}]);
        let blocks: Vec<StreamBlock<NewsBlock>> = parse_stream(&value).unwrap();
        let Some(NewsBlock::Heading(h)) = blocks.first().map(|b| &b.block) else {
            panic!("expected heading");
        };
        assert_eq!(h.size.tag(), "h2");
    }

    #[test]
    fn test_paragraph_is_plain_string_value() {
        let value = json!([{"type": "paragraph", "value": "<p>有機蔬菜上市</p>"}]);
        let blocks: Vec<StreamBlock<NewsBlock>> = parse_stream(&value).unwrap();
        assert!(matches!(
            blocks.first().map(|b| &b.block),
            Some(NewsBlock::Paragraph(html)) if html.contains("有機")
        ));
    }

    #[test]
    fn test_fourth_call_to_action_is_rejected() {
        let cta = json!({
            "type": "call_to_action",
            "value": {"title": "t", "button_text": "前往", "button_url": "https://example.tw"}
        });
        let value = json!([cta.clone(), cta.clone(), cta.clone(), cta]);
        let blocks: Vec<StreamBlock<NewsBlock>> = parse_stream(&value).unwrap();
        assert!(matches!(
            validate(&blocks),
            Err(ContentError::TooManyBlocks { block: "call_to_action", .. })
        ));
    }

    #[test]
    fn test_unknown_code_language_fails_parse() {
        let value = json!([{"type": "code", "value": {"language": "cobol", "code": "x"}}]);
        let result: Result<Vec<StreamBlock<NewsBlock>>, _> = parse_stream(&value);
        assert!(result.is_err());
    }

    #[test]
    fn test_embed_url_youtube_variants() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=abc123&t=5"),
            "https://www.youtube.com/embed/abc123"
        );
        assert_eq!(
            embed_url("https://youtu.be/abc123"),
            "https://www.youtube.com/embed/abc123"
        );
        assert_eq!(
            embed_url("https://vimeo.com/7654"),
            "https://player.vimeo.com/video/7654"
        );
        assert_eq!(embed_url("not a url"), "not a url");
    }
}
