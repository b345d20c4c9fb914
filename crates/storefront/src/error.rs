//! Unified error handling with Sentry integration.
//!
//! Provides a crate-level `Error` for setup paths (config, storage, API
//! calls made directly), plus helpers that forward failures and user
//! actions to Sentry. With no Sentry client bound the helpers are no-ops.

use thiserror::Error;

use crate::cart::{CartError, StoreError};
use crate::config::ConfigError;
use crate::newsletter::NewsletterError;
use crate::product::SelectionError;
use crate::shopify::ShopifyError;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// A cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Cart id persistence failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Option selection was rejected.
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Newsletter subscription failed.
    #[error("Newsletter error: {0}")]
    Newsletter(#[from] NewsletterError),
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Capture an error to Sentry and log it.
///
/// Returns the Sentry event id (nil when no client is bound).
pub fn capture<E>(error: &E, context: &str) -> sentry::types::Uuid
where
    E: std::error::Error + ?Sized,
{
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "{context}"
    );
    event_id
}

/// Add a breadcrumb for cart and product actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added line item", Some(&[("merchandise_id", "gid://...")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(ShopifyError::NotFound("product-123".to_string()));
        assert_eq!(err.to_string(), "Shopify error: Not found: product-123");

        let err = Error::from(ConfigError::MissingEnvVar("SHOPIFY_STORE".to_string()));
        assert_eq!(
            err.to_string(),
            "Config error: Missing environment variable: SHOPIFY_STORE"
        );
    }

    #[test]
    fn test_capture_without_client_is_nil() {
        let err = ShopifyError::RateLimited(2);
        let event_id = capture(&err, "test failure");
        assert!(event_id.is_nil());
    }

    #[test]
    fn test_breadcrumb_without_client_does_not_panic() {
        add_breadcrumb("cart", "Added line item", Some(&[("quantity", "1")]));
        add_breadcrumb("cart", "Opened cart", None);
    }
}
