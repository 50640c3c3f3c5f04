//! Marketplace configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MARKETPLACE_BASE_URL` - Public URL of the site, used for gateway callback URLs
//! - `MARKETPLACE_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `ECPAY_MERCHANT_ID` - ECPay merchant ID
//! - `ECPAY_HASH_KEY` - ECPay `HashKey` for `CheckMacValue`
//! - `ECPAY_HASH_IV` - ECPay `HashIV` for `CheckMacValue`
//!
//! ## Optional
//! - `MARKETPLACE_HOST` - Bind address (default: 127.0.0.1)
//! - `MARKETPLACE_PORT` - Listen port (default: 8000)
//! - `MARKETPLACE_MEDIA_ROOT` - Directory for uploaded files (default: media)
//! - `MARKETPLACE_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `ECPAY_ENVIRONMENT` - `stage` or `production` (default: stage)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

const ECPAY_STAGE_URL: &str = "https://payment-stage.ecpay.com.tw/Cashier/AioCheckOut/V5";
const ECPAY_PRODUCTION_URL: &str = "https://payment.ecpay.com.tw/Cashier/AioCheckOut/V5";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Marketplace application configuration.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL without a trailing slash
    pub base_url: String,
    pub session_secret: SecretString,
    /// Root directory for uploaded product images and portraits
    pub media_root: PathBuf,
    pub log_json: bool,
    pub ecpay: EcpayConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Which ECPay cashier the checkout form posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcpayEnvironment {
    Stage,
    Production,
}

impl EcpayEnvironment {
    #[must_use]
    pub const fn action_url(self) -> &'static str {
        match self {
            Self::Stage => ECPAY_STAGE_URL,
            Self::Production => ECPAY_PRODUCTION_URL,
        }
    }
}

impl std::str::FromStr for EcpayEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stage" | "staging" | "test" => Ok(Self::Stage),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected 'stage' or 'production', got '{other}'")),
        }
    }
}

/// ECPay AIO merchant credentials.
///
/// Implements `Debug` manually to redact the hash key and IV.
#[derive(Clone)]
pub struct EcpayConfig {
    pub merchant_id: String,
    pub hash_key: SecretString,
    pub hash_iv: SecretString,
    pub environment: EcpayEnvironment,
}

impl std::fmt::Debug for EcpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcpayConfig")
            .field("merchant_id", &self.merchant_id)
            .field("hash_key", &"[REDACTED]")
            .field("hash_iv", &"[REDACTED]")
            .field("environment", &self.environment)
            .finish()
    }
}

impl MarketplaceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MARKETPLACE_DATABASE_URL")?;
        let host = parse_env("MARKETPLACE_HOST", "127.0.0.1")?;
        let port = parse_env("MARKETPLACE_PORT", "8000")?;
        let base_url = normalize_base_url(&get_required_env("MARKETPLACE_BASE_URL")?);
        let session_secret = get_validated_secret("MARKETPLACE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "MARKETPLACE_SESSION_SECRET")?;
        let media_root = PathBuf::from(get_env_or_default("MARKETPLACE_MEDIA_ROOT", "media"));
        let log_json = is_truthy(get_optional_env("MARKETPLACE_LOG_JSON").as_deref());

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            media_root,
            log_json,
            ecpay: EcpayConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Build an absolute URL for a site path such as `/api/v1/payment/notify`.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl EcpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        // Hash key and IV are issued by the gateway, so only presence is checked
        Ok(Self {
            merchant_id: get_required_env("ECPAY_MERCHANT_ID")?,
            hash_key: get_required_secret("ECPAY_HASH_KEY")?,
            hash_iv: get_required_secret("ECPAY_HASH_IV")?,
            environment: parse_env("ECPAY_ENVIRONMENT", "stage")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> MarketplaceConfig {
        MarketplaceConfig {
            database_url: SecretString::from("postgres://localhost/marketplace"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_url: "https://shop.example.tw".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            media_root: PathBuf::from("media"),
            log_json: false,
            ecpay: EcpayConfig {
                merchant_id: "3002607".to_string(),
                hash_key: SecretString::from("pwFHCqoQZGmho4w6"),
                hash_iv: SecretString::from("EkRm7iFT261dpevs"),
                environment: EcpayEnvironment::Stage,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_uniform_string() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_counts_chars_not_bytes() {
        // Four distinct CJK chars carry exactly 2 bits each
        assert!((shannon_entropy("農業技術") - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("changeme-changeme-changeme", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        assert!(validate_secret_strength(&"ab".repeat(20), "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_accepts_random() {
        assert!(validate_secret_strength("q8Vz2LmN4kR7wXcT1bYp9sHd3fGj6aE0", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_ecpay_environment_parse() {
        assert_eq!(
            "production".parse::<EcpayEnvironment>().unwrap(),
            EcpayEnvironment::Production
        );
        assert_eq!("Stage".parse::<EcpayEnvironment>().unwrap(), EcpayEnvironment::Stage);
        assert!("live".parse::<EcpayEnvironment>().is_err());
    }

    #[test]
    fn test_ecpay_action_urls() {
        assert!(EcpayEnvironment::Stage.action_url().contains("payment-stage"));
        assert!(
            EcpayEnvironment::Production
                .action_url()
                .starts_with("https://payment.ecpay.com.tw")
        );
    }

    #[test]
    fn test_absolute_url_and_https() {
        let config = test_config();
        assert!(config.is_https());
        assert_eq!(
            config.absolute_url("/api/v1/payment/notify"),
            "https://shop.example.tw/api/v1/payment/notify"
        );
        assert_eq!(config.socket_addr().port(), 8000);
    }

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        assert_eq!(normalize_base_url(" http://localhost:8000/ "), "http://localhost:8000");
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("TRUE")));
        assert!(!is_truthy(Some("0")));
        assert!(!is_truthy(None));
    }

    #[test]
    fn test_ecpay_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_config().ecpay);
        assert!(debug_output.contains("3002607"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("pwFHCqoQZGmho4w6"));
        assert!(!debug_output.contains("EkRm7iFT261dpevs"));
    }
}
