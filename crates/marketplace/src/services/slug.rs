//! URL slug generation for Chinese-titled content.
//!
//! Names are translated word-by-word through small fixed dictionaries,
//! leftover CJK characters are dropped and the rest is slugified. When
//! nothing usable remains the slug falls back to `{prefix}-{id}` (or
//! `{prefix}-new` for rows without an id yet).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a news post slug.
pub const POST_SLUG_MAX_LEN: usize = 50;

static CJK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{4e00}-\x{9fff}]").expect("Invalid regex"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("Invalid regex"));
static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex"));
static SPACE_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("Invalid regex"));
static DASH_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("Invalid regex"));

/// A translation table for one kind of taxonomy.
///
/// Entries are applied in order, so longer phrases must come before the
/// words they contain.
#[derive(Debug, Clone, Copy)]
pub struct SlugDictionary {
    pub prefix: &'static str,
    pub entries: &'static [(&'static str, &'static str)],
}

impl SlugDictionary {
    pub const VENDOR_CATEGORY: Self = Self {
        prefix: "vendor-category",
        entries: &[
            ("農業商家", "agriculture-vendor"),
            ("技術商家", "technology-vendor"),
            ("食品商家", "food-vendor"),
            ("市場商家", "market-vendor"),
            ("教育商家", "education-vendor"),
        ],
    };

    pub const NEWS_CATEGORY: Self = Self {
        prefix: "category",
        entries: &[
            ("農業新聞", "agriculture-news"),
            ("技術創新", "technology-innovation"),
            ("市場行情", "market-trends"),
            ("政策法規", "policy-regulations"),
            ("有機農業", "organic-farming"),
            ("智慧農業", "smart-agriculture"),
            ("可持續發展", "sustainable-development"),
            ("農產品認證", "agricultural-certification"),
            ("食品安全", "food-safety"),
            ("區塊鏈應用", "blockchain-application"),
            ("最新消息", "latest-news"),
            ("公告", "announcement"),
            ("活動", "events"),
            ("研究", "research"),
            ("教育", "education"),
            ("培訓", "training"),
            ("合作", "cooperation"),
            ("產業", "industry"),
            ("環保", "environmental"),
            ("科技", "technology"),
        ],
    };

    pub const NEWS_TAG: Self = Self {
        prefix: "tag",
        entries: &[
            ("有機農業", "organic-farming"),
            ("智慧農業", "smart-agriculture"),
            ("可持續發展", "sustainable-development"),
            ("農產品認證", "agricultural-certification"),
            ("食品安全", "food-safety"),
            ("區塊鏈應用", "blockchain-application"),
            ("人工智慧", "artificial-intelligence"),
            ("機器學習", "machine-learning"),
            ("物聯網", "iot"),
            ("大數據", "big-data"),
            ("雲端運算", "cloud-computing"),
            ("精準農業", "precision-agriculture"),
            ("溫室栽培", "greenhouse-cultivation"),
            ("水耕栽培", "hydroponic-cultivation"),
            ("生物技術", "biotechnology"),
            ("基因改造", "genetic-modification"),
            ("農藥殘留", "pesticide-residue"),
            ("土壤改良", "soil-improvement"),
            ("氣候變遷", "climate-change"),
            ("碳足跡", "carbon-footprint"),
        ],
    };

    pub const NEWS_POST: Self = Self {
        prefix: "post",
        entries: &[
            ("農業", "agriculture"),
            ("技術", "technology"),
            ("創新", "innovation"),
            ("市場", "market"),
            ("行情", "trends"),
            ("政策", "policy"),
            ("法規", "regulations"),
            ("有機", "organic"),
            ("智慧", "smart"),
            ("發展", "development"),
            ("認證", "certification"),
            ("安全", "safety"),
            ("食品", "food"),
            ("產品", "product"),
            ("新聞", "news"),
            ("消息", "news"),
            ("公告", "announcement"),
            ("活動", "event"),
            ("研究", "research"),
            ("報告", "report"),
            ("分析", "analysis"),
            ("趨勢", "trend"),
            ("未來", "future"),
            ("科技", "technology"),
            ("數位", "digital"),
            ("永續", "sustainable"),
            ("環保", "environmental"),
            ("綠色", "green"),
            ("生態", "ecological"),
        ],
    };

    fn exact(&self, text: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find_map(|(zh, en)| (*zh == text).then_some(*en))
    }

    fn translate(&self, text: &str) -> String {
        self.entries
            .iter()
            .fold(text.to_string(), |acc, (zh, en)| acc.replace(zh, en))
    }

    fn fallback(&self, id: Option<i32>) -> String {
        id.map_or_else(
            || format!("{}-new", self.prefix),
            |id| format!("{}-{id}", self.prefix),
        )
    }
}

/// Build the base slug for a category or tag name.
///
/// Uniqueness is applied separately with [`make_unique`].
#[must_use]
pub fn taxonomy_slug_base(name: &str, dict: &SlugDictionary, id: Option<i32>) -> String {
    if let Some(slug) = dict.exact(name) {
        return slug.to_string();
    }

    let translated = dict.translate(&name.to_lowercase());
    let stripped = CJK_RE.replace_all(&translated, "");
    if stripped.trim().is_empty() {
        return dict.fallback(id);
    }

    let cleaned = NON_WORD_RE.replace_all(&stripped, "");
    let dashed = SPACE_UNDERSCORE_RE.replace_all(&cleaned, "-");
    let slug = slugify(dashed.trim_matches('-'));
    if slug.is_empty() {
        dict.fallback(id)
    } else {
        slug
    }
}

/// Build the base slug for a news post title, at most
/// [`POST_SLUG_MAX_LEN`] characters.
#[must_use]
pub fn post_slug_base(title: &str, id: Option<i32>) -> String {
    let dict = SlugDictionary::NEWS_POST;
    let processed = PUNCTUATION_RE.replace_all(title, "").to_lowercase();

    let parts: Vec<String> = processed
        .split_whitespace()
        .filter_map(|word| {
            if let Some(slug) = dict.exact(word) {
                return Some(slug.to_string());
            }
            let translated = dict.translate(word);
            let stripped = CJK_RE.replace_all(&translated, "");
            let stripped = stripped.trim();
            (!stripped.is_empty()).then(|| stripped.to_string())
        })
        .collect();

    let joined = if parts.is_empty() {
        dict.fallback(id)
    } else {
        parts.join("-")
    };

    let mut slug = slugify(&joined);
    if slug.is_empty() {
        slug = dict.fallback(id);
    }
    truncate_slug(&slug, POST_SLUG_MAX_LEN)
}

/// Reduce text to lowercase ASCII letters, digits, `_` and `-`.
///
/// Accented Latin letters are folded to their base letter; every other
/// non-ASCII character is dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let folded: String = text
        .chars()
        .filter_map(|c| if c.is_ascii() { Some(c) } else { fold_latin(c) })
        .collect::<String>()
        .to_lowercase();
    let cleaned = NON_WORD_RE.replace_all(&folded, "");
    DASH_SPACE_RE
        .replace_all(&cleaned, "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

fn fold_latin(c: char) -> Option<char> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' => 'A',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => 'E',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' => 'I',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ō' => 'O',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        'š' | 'ś' => 's',
        'Š' | 'Ś' => 'S',
        'ž' | 'ź' | 'ż' => 'z',
        'Ž' | 'Ź' | 'Ż' => 'Z',
        _ => return None,
    };
    Some(base)
}

fn truncate_slug(slug: &str, max_len: usize) -> String {
    if slug.len() <= max_len {
        return slug.to_string();
    }
    // Slugs are ASCII after slugify, so byte slicing is safe.
    slug.get(..max_len)
        .unwrap_or(slug)
        .trim_end_matches('-')
        .to_string()
}

/// Pick the first free slug among `base`, `base-1`, `base-2`, ...
///
/// `taken` holds the slugs already used by other rows. With `max_len`,
/// the base is shortened so that base plus suffix fits.
#[must_use]
pub fn make_unique(base: &str, taken: &HashSet<String>, max_len: Option<usize>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    (1..)
        .map(|counter| {
            let suffix = format!("-{counter}");
            match max_len {
                Some(max) if base.len() + suffix.len() > max => {
                    let keep = max.saturating_sub(suffix.len());
                    format!("{}{suffix}", base.get(..keep).unwrap_or(base))
                }
                _ => format!("{base}{suffix}"),
            }
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_exact_match() {
        assert_eq!(
            taxonomy_slug_base("農業新聞", &SlugDictionary::NEWS_CATEGORY, None),
            "agriculture-news"
        );
    }

    #[test]
    fn test_category_partial_translation_drops_leftover_cjk() {
        assert_eq!(
            taxonomy_slug_base("有機農業推廣", &SlugDictionary::NEWS_CATEGORY, None),
            "organic-farming"
        );
    }

    #[test]
    fn test_untranslatable_name_falls_back_to_prefix() {
        assert_eq!(
            taxonomy_slug_base("蔬果", &SlugDictionary::NEWS_CATEGORY, Some(7)),
            "category-7"
        );
        assert_eq!(
            taxonomy_slug_base("蔬果", &SlugDictionary::NEWS_TAG, None),
            "tag-new"
        );
        assert_eq!(
            taxonomy_slug_base("小農", &SlugDictionary::VENDOR_CATEGORY, Some(3)),
            "vendor-category-3"
        );
    }

    #[test]
    fn test_latin_name_is_slugified() {
        assert_eq!(
            taxonomy_slug_base("Café  Organic_Goods!", &SlugDictionary::NEWS_TAG, None),
            "cafe-organic-goods"
        );
    }

    #[test]
    fn test_post_words_are_translated() {
        assert_eq!(
            post_slug_base("農業 技術 創新", None),
            "agriculture-technology-innovation"
        );
    }

    #[test]
    fn test_post_partial_words_keep_digits() {
        assert_eq!(
            post_slug_base("2024 有機蔬菜市場報告!", None),
            "2024-organicmarketreport"
        );
    }

    #[test]
    fn test_post_without_translation_uses_id() {
        assert_eq!(post_slug_base("颱風過後", Some(42)), "post-42");
        assert_eq!(post_slug_base("！？", None), "post-new");
    }

    #[test]
    fn test_post_slug_is_truncated() {
        let title = "agriculture ".repeat(10);
        let slug = post_slug_base(&title, None);
        assert!(slug.len() <= POST_SLUG_MAX_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("agriculture-agriculture"));
    }

    #[test]
    fn test_make_unique_appends_counter() {
        let taken: HashSet<String> = ["market-trends", "market-trends-1"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(make_unique("market-trends", &taken, None), "market-trends-2");
        assert_eq!(make_unique("food-safety", &taken, None), "food-safety");
    }

    #[test]
    fn test_make_unique_respects_max_len() {
        let base = "a".repeat(50);
        let taken: HashSet<String> = std::iter::once(base.clone()).collect();
        let unique = make_unique(&base, &taken, Some(POST_SLUG_MAX_LEN));
        assert_eq!(unique.len(), 50);
        assert!(unique.ends_with("-1"));
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Hello -- World  "), "hello-world");
        assert_eq!(slugify("_edge_"), "edge");
    }
}
