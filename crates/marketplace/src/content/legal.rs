//! Privacy policy and terms of service blocks.
//!
//! Both documents share the alert, introduction and section shapes; the
//! remaining blocks are specific to one document.

use serde::{Deserialize, Serialize};

use super::{ContentError, StreamBlock, check_block_count};

// =============================================================================
// Shared blocks
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Primary,
    Secondary,
    Success,
    Danger,
    #[default]
    Warning,
    Info,
    Light,
    Dark,
}

impl AlertType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Font Awesome icon name (without the `fa-` prefix).
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Primary | Self::Info => "info-circle",
            Self::Secondary => "clipboard-list",
            Self::Success => "check-circle",
            Self::Danger => "times-circle",
            Self::Warning => "exclamation-triangle",
            Self::Light => "sun",
            Self::Dark => "moon",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertBlock {
    #[serde(default = "default_alert_label")]
    pub alert_label: String,
    #[serde(default)]
    pub alert_type: AlertType,
    pub content: String,
}

/// Nested stream that only holds alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExtraBlock {
    Alert(AlertBlock),
}

impl ExtraBlock {
    #[must_use]
    pub const fn alert(&self) -> &AlertBlock {
        match self {
            Self::Alert(alert) => alert,
        }
    }
}

pub type Extra = Vec<StreamBlock<ExtraBlock>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroductionBlock {
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionBlock {
    pub section_title: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedItem {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitledItem {
    pub title: String,
    pub description: String,
}

// =============================================================================
// Privacy policy
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrivacyBlock {
    Introduction(IntroductionBlock),
    CollectedData(CollectedDataBlock),
    DataUsage(DataUsageBlock),
    DataShare(DataShareBlock),
    DataSecurity(DataSecurityBlock),
    Rights(RightsBlock),
    CookiePolicy(CookiePolicyBlock),
    Contact(PrivacyContactBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedDataBlock {
    #[serde(default = "default_collected_title")]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SectionBlock>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataUsageBlock {
    #[serde(default = "default_usage_title")]
    pub title: String,
    #[serde(default = "default_usage_subtitle")]
    pub subtitle: String,
    #[serde(default)]
    pub usage_items: Vec<NamedItem>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCondition {
    pub condition: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataShareBlock {
    #[serde(default = "default_share_title")]
    pub title: String,
    #[serde(default = "default_share_subtitle")]
    pub subtitle: String,
    #[serde(default)]
    pub share_conditions: Vec<ShareCondition>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSecurityBlock {
    #[serde(default = "default_security_title")]
    pub title: String,
    #[serde(default = "default_security_subtitle")]
    pub subtitle: String,
    #[serde(default)]
    pub measures_left: Vec<String>,
    #[serde(default)]
    pub measures_right: Vec<String>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RightsBlock {
    #[serde(default = "default_rights_title")]
    pub title: String,
    #[serde(default = "default_rights_subtitle")]
    pub subtitle: String,
    #[serde(default)]
    pub left_items: Vec<NamedItem>,
    #[serde(default)]
    pub right_items: Vec<NamedItem>,
    #[serde(default = "default_rights_contact_text")]
    pub contact_text: String,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookiePolicyBlock {
    #[serde(default = "default_cookie_title")]
    pub title: String,
    #[serde(default = "default_cookie_subtitle")]
    pub subtitle: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default = "default_cookie_footnote")]
    pub footnote: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactIcon {
    #[default]
    Envelope,
    Phone,
    Clock,
    MapMarkerAlt,
}

impl ContactIcon {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Envelope => "envelope",
            Self::Phone => "phone",
            Self::Clock => "clock",
            Self::MapMarkerAlt => "map-marker-alt",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEntry {
    #[serde(default)]
    pub icon: ContactIcon,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyContactBlock {
    #[serde(default = "default_contact_title")]
    pub title: String,
    /// Rich text (HTML).
    #[serde(default = "default_privacy_contact_intro")]
    pub intro: String,
    #[serde(default)]
    pub left_contacts: Vec<ContactEntry>,
    #[serde(default)]
    pub right_contacts: Vec<ContactEntry>,
}

// =============================================================================
// Terms of service
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TermsBlock {
    Introduction(IntroductionBlock),
    ServiceDescription(ServiceDescriptionBlock),
    UserResponsibility(UserResponsibilityBlock),
    TransactionTerms(TransactionTermsBlock),
    IntellectualProperty(IntellectualPropertyBlock),
    ServiceLimitations(ServiceLimitationsBlock),
    Disclaimer(DisclaimerBlock),
    TermsChange(TermsChangeBlock),
    Contact(TermsContactBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptionBlock {
    #[serde(default = "default_service_title")]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SectionBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponsibilityBlock {
    #[serde(default = "default_responsibility_title")]
    pub title: String,
    /// Rich text (HTML).
    pub content: String,
    #[serde(default)]
    pub responsibilities: Vec<TitledItem>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionTermsBlock {
    #[serde(default = "default_transaction_title")]
    pub title: String,
    #[serde(default)]
    pub transaction_rules: Vec<TitledItem>,
    #[serde(default)]
    pub refund_policy: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntellectualPropertyBlock {
    #[serde(default = "default_ip_title")]
    pub title: String,
    #[serde(default)]
    pub platform_rights: Vec<String>,
    #[serde(default)]
    pub user_rights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLimitationsBlock {
    #[serde(default = "default_limitations_title")]
    pub title: String,
    #[serde(default)]
    pub platform_rights: Vec<TitledItem>,
    #[serde(default)]
    pub notice_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclaimerBlock {
    #[serde(default = "default_disclaimer_title")]
    pub title: String,
    #[serde(default)]
    pub disclaimer_items: Vec<String>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsChangeBlock {
    #[serde(default = "default_terms_change_title")]
    pub title: String,
    #[serde(default)]
    pub change_procedures: Vec<String>,
    #[serde(default)]
    pub notice_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsContactBlock {
    #[serde(default = "default_contact_title")]
    pub title: String,
    #[serde(default = "default_terms_contact_description")]
    pub description: String,
    #[serde(default = "default_terms_email")]
    pub email: String,
    #[serde(default = "default_terms_phone")]
    pub phone: String,
    #[serde(default = "default_terms_service_hours")]
    pub service_hours: String,
    #[serde(default = "default_terms_address")]
    pub address: String,
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a privacy policy body: one introduction at most.
///
/// # Errors
///
/// Returns `ContentError::TooManyBlocks` when the limit is exceeded.
pub fn validate_privacy(blocks: &[StreamBlock<PrivacyBlock>]) -> Result<(), ContentError> {
    check_block_count(blocks, "introduction", 1, |b| {
        matches!(b, PrivacyBlock::Introduction(_))
    })
}

/// Validate a terms of service body: one introduction and one contact block at most.
///
/// # Errors
///
/// Returns `ContentError::TooManyBlocks` when a limit is exceeded.
pub fn validate_terms(blocks: &[StreamBlock<TermsBlock>]) -> Result<(), ContentError> {
    check_block_count(blocks, "introduction", 1, |b| {
        matches!(b, TermsBlock::Introduction(_))
    })?;
    check_block_count(blocks, "contact", 1, |b| matches!(b, TermsBlock::Contact(_)))
}

// =============================================================================
// Field defaults
// =============================================================================

fn default_alert_label() -> String {
    "重要提醒".to_string()
}
fn default_site_name() -> String {
    "尚虎雲產銷平台".to_string()
}
fn default_collected_title() -> String {
    "我們收集的資料".to_string()
}
fn default_usage_title() -> String {
    "資料使用目的".to_string()
}
fn default_usage_subtitle() -> String {
    "我們使用您的個人資料於以下目的：".to_string()
}
fn default_share_title() -> String {
    "資料分享與揭露".to_string()
}
fn default_share_subtitle() -> String {
    "我們可能在以下情況分享您的資料：".to_string()
}
fn default_security_title() -> String {
    "資料安全措施".to_string()
}
fn default_security_subtitle() -> String {
    "我們採用多重安全措施保護您的資料：".to_string()
}
fn default_rights_title() -> String {
    "您的權利".to_string()
}
fn default_rights_subtitle() -> String {
    "根據個人資料保護法，您享有以下權利：".to_string()
}
fn default_rights_contact_text() -> String {
    "如需行使上述權利，請透過以下聯絡方式與我們聯繫。".to_string()
}
fn default_cookie_title() -> String {
    "Cookie 使用政策".to_string()
}
fn default_cookie_subtitle() -> String {
    "我們使用 Cookie 來：".to_string()
}
fn default_cookie_footnote() -> String {
    "您可以透過瀏覽器設定管理或停用 Cookie，但這可能影響部分網站功能。".to_string()
}
fn default_contact_title() -> String {
    "聯絡我們".to_string()
}
fn default_privacy_contact_intro() -> String {
    "如您對本隱私權政策有任何疑問或建議，請透過以下方式聯絡我們：".to_string()
}
fn default_service_title() -> String {
    "服務說明".to_string()
}
fn default_responsibility_title() -> String {
    "用戶責任與義務".to_string()
}
fn default_transaction_title() -> String {
    "交易條款".to_string()
}
fn default_ip_title() -> String {
    "知識產權".to_string()
}
fn default_limitations_title() -> String {
    "服務限制與終止".to_string()
}
fn default_disclaimer_title() -> String {
    "免責聲明".to_string()
}
fn default_terms_change_title() -> String {
    "條款變更".to_string()
}
fn default_terms_contact_description() -> String {
    "如您對本服務條款有任何疑問或建議，請透過以下方式聯絡我們：".to_string()
}
fn default_terms_email() -> String {
    "legal@shanghuyun.com".to_string()
}
fn default_terms_phone() -> String {
    "(02) 1234-5678".to_string()
}
fn default_terms_service_hours() -> String {
    "週一至週五 09:00-18:00".to_string()
}
fn default_terms_address() -> String {
    "台北市信義區市府路1號".to_string()
}
