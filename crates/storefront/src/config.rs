//! Storefront toolkit configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PUBLIC_TOKEN` - Storefront API public access token
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token;
//!   preferred over the public token when set
//! - `HK_APP_CART_ID` - Namespace for the persisted cart id (default: storefront)
//! - `HK_CART_STORE` - Path of the JSON file holding persisted cart ids
//!   (default: .hk-cart.json)
//! - `HK_DROP_END_AT` - Drop launch time, RFC 3339
//! - `HK_DROP_START_AT` - Countdown start time, RFC 3339 (enables progress)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2026-01";
const DEFAULT_APP_CART_ID: &str = "storefront";
const DEFAULT_CART_STORE: &str = ".hk-cart.json";

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
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

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

/// Toolkit configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Shopify Storefront API configuration
    pub shopify: ShopifyStorefrontConfig,
    /// Cart persistence configuration
    pub cart: CartConfig,
    /// Drop countdown configuration (absent when no drop is scheduled)
    pub drop: Option<DropConfig>,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration. Tracking is off without a DSN.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN
    pub dsn: Option<String>,
    /// Sentry environment name
    pub environment: Option<String>,
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API public access token (safe to expose in browser)
    pub storefront_public_token: String,
    /// Storefront API private access token (server-side only)
    pub storefront_private_token: Option<SecretString>,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_public_token", &self.storefront_public_token)
            .field(
                "storefront_private_token",
                &self.storefront_private_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Where and under which namespace the cart id is persisted.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Application cart namespace; the persisted key is `{app_cart_id}-cart-id`.
    pub app_cart_id: String,
    /// JSON file used by the file-backed cart id store.
    pub store_path: PathBuf,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            app_cart_id: DEFAULT_APP_CART_ID.to_string(),
            store_path: PathBuf::from(DEFAULT_CART_STORE),
        }
    }
}

/// Scheduled drop (product launch) window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropConfig {
    /// Launch instant.
    pub end_at: DateTime<Utc>,
    /// When the countdown started, if progress should be reported.
    pub start_at: Option<DateTime<Utc>>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the private token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            shopify: ShopifyStorefrontConfig::from_env()?,
            cart: CartConfig::from_env(),
            drop: DropConfig::from_env()?,
            sentry: SentryConfig::from_env(),
        })
    }
}

impl ShopifyStorefrontConfig {
    /// Load the Shopify settings alone.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, the store does
    /// not form a valid endpoint, or the private token fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let storefront_private_token = match get_optional_env("SHOPIFY_STOREFRONT_PRIVATE_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let config = Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            storefront_public_token: get_required_env("SHOPIFY_STOREFRONT_PUBLIC_TOKEN")?,
            storefront_private_token,
        };

        // Fail at startup rather than on the first request
        config.endpoint()?;
        Ok(config)
    }

    /// The Storefront GraphQL endpoint for this store and API version.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the store domain does not form a valid URL.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let store = self
            .store
            .trim()
            .trim_start_matches("https://")
            .trim_end_matches('/');
        Url::parse(&format!(
            "https://{store}/api/{}/graphql.json",
            self.api_version
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_STORE".to_string(), e.to_string()))
    }

    /// The header name and token used to authenticate Storefront requests.
    ///
    /// Private access tokens use a different header than public tokens.
    #[must_use]
    pub fn auth_header(&self) -> (&'static str, String) {
        self.storefront_private_token.as_ref().map_or_else(
            || {
                (
                    "X-Shopify-Storefront-Access-Token",
                    self.storefront_public_token.clone(),
                )
            },
            |token| {
                (
                    "Shopify-Storefront-Private-Token",
                    token.expose_secret().to_string(),
                )
            },
        )
    }
}

impl CartConfig {
    /// Load cart persistence settings, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            app_cart_id: get_env_or_default("HK_APP_CART_ID", DEFAULT_APP_CART_ID),
            store_path: PathBuf::from(get_env_or_default("HK_CART_STORE", DEFAULT_CART_STORE)),
        }
    }
}

impl SentryConfig {
    /// Load Sentry settings.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
        }
    }
}

impl DropConfig {
    /// Load the drop window. `None` when `HK_DROP_END_AT` is unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for malformed timestamps or a start
    /// that is not before the end.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(end_at) = get_optional_env("HK_DROP_END_AT") else {
            return Ok(None);
        };
        let end_at = parse_timestamp("HK_DROP_END_AT", &end_at)?;
        let start_at = get_optional_env("HK_DROP_START_AT")
            .map(|value| parse_timestamp("HK_DROP_START_AT", &value))
            .transpose()?;

        if let Some(start) = start_at
            && start >= end_at
        {
            return Err(ConfigError::InvalidEnvVar(
                "HK_DROP_START_AT".to_string(),
                "must be before HK_DROP_END_AT".to_string(),
            ));
        }

        Ok(Some(Self { end_at, start_at }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an RFC 3339 timestamp from an environment variable value.
fn parse_timestamp(key: &str, value: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real access tokens are random hex/base64 and have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token Shopify generated."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shopify_config(private: Option<&str>) -> ShopifyStorefrontConfig {
        ShopifyStorefrontConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_public_token: "public_token_value".to_string(),
            storefront_private_token: private.map(SecretString::from),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("3f9a1c7e5b2d8064af1e9c3b7d5a2f80", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_endpoint() {
        let config = shopify_config(None);
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "https://test.myshopify.com/api/2026-01/graphql.json"
        );
    }

    #[test]
    fn test_endpoint_strips_scheme_and_slash() {
        let mut config = shopify_config(None);
        config.store = "https://test.myshopify.com/".to_string();
        assert_eq!(
            config.endpoint().unwrap().host_str(),
            Some("test.myshopify.com")
        );
    }

    #[test]
    fn test_auth_header_prefers_private_token() {
        let (name, value) = shopify_config(Some("private_value")).auth_header();
        assert_eq!(name, "Shopify-Storefront-Private-Token");
        assert_eq!(value, "private_value");

        let (name, value) = shopify_config(None).auth_header();
        assert_eq!(name, "X-Shopify-Storefront-Access-Token");
        assert_eq!(value, "public_token_value");
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("HK_DROP_END_AT", "2021-12-07T19:00:00.000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2021-12-07T19:00:00+00:00");
        assert!(parse_timestamp("HK_DROP_END_AT", "next tuesday").is_err());
    }

    #[test]
    fn test_cart_config_default() {
        let config = CartConfig::default();
        assert_eq!(config.app_cart_id, "storefront");
        assert_eq!(config.store_path, PathBuf::from(".hk-cart.json"));
    }

    #[test]
    fn test_shopify_config_debug_redacts_secrets() {
        let config = shopify_config(Some("super_secret_private_token"));
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("test.myshopify.com"));
        assert!(debug_output.contains("public_token_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_token"));
    }
}
