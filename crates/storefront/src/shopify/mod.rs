//! Shopify Storefront API access.
//!
//! # Architecture
//!
//! - [`StorefrontApi`] and [`NewsletterApi`] are the seams the cart
//!   controller and the newsletter helper depend on
//! - [`StorefrontClient`] implements them over HTTP with `reqwest`, using the
//!   `graphql_client` request/response envelope and hand-written documents
//! - Shopify is source of truth - carts are never cached, products are cached
//!   in memory via `moka` (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use headless_kit_storefront::shopify::{StorefrontApi, StorefrontClient};
//!
//! let client = StorefrontClient::new(&config.shopify)?;
//!
//! let product = client.get_product_by_handle("my-product").await?;
//! let cart = client.create_cart(Some(vec![CartLineInput::new(
//!     product.variants[0].id.clone(),
//!     1,
//! )])).await?;
//! ```

mod api;
mod storefront;
pub mod types;

pub use api::{NewsletterApi, StorefrontApi};
pub use storefront::StorefrontClient;
pub use types::*;

use std::fmt;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl ShopifyError {
    /// Build a single-message GraphQL error.
    pub(crate) fn message(message: impl Into<String>) -> Self {
        Self::GraphQL(vec![GraphQLError {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }])
    }

    /// Whether this error means the requested object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// An entry of the `errors` array of a Storefront response.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    pub message: String,
    pub locations: Vec<GraphQLErrorLocation>,
    /// Response path of the failing field, e.g. `cartLinesAdd.0`.
    pub path: Vec<serde_json::Value>,
}

/// 1-indexed position in the query document.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    pub line: i64,
    pub column: i64,
}

impl GraphQLError {
    fn is_blank(&self) -> bool {
        self.message.is_empty() && self.path.is_empty() && self.locations.is_empty()
    }
}

/// `message path: a.b at line l:c`, omitting absent parts.
impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if !self.message.is_empty() {
            f.write_str(&self.message)?;
            sep = " ";
        }
        if !self.path.is_empty() {
            f.write_str(sep)?;
            f.write_str("path: ")?;
            for (i, segment) in self.path.iter().enumerate() {
                if i > 0 {
                    f.write_str(".")?;
                }
                match segment {
                    serde_json::Value::String(s) => f.write_str(s)?,
                    other => write!(f, "{other}")?,
                }
            }
            sep = " ";
        }
        if let Some(loc) = self.locations.first() {
            write!(f, "{sep}at line {}:{}", loc.line, loc.column)?;
        }
        Ok(())
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            if e.is_blank() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                e.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gql(message: &str, path: Vec<serde_json::Value>, at: Option<(i64, i64)>) -> GraphQLError {
        GraphQLError {
            message: message.to_string(),
            locations: at
                .map(|(line, column)| GraphQLErrorLocation { line, column })
                .into_iter()
                .collect(),
            path,
        }
    }

    #[test]
    fn test_not_found() {
        let err = ShopifyError::NotFound("cart-123".to_string());
        assert_eq!(err.to_string(), "Not found: cart-123");
        assert!(err.is_not_found());
        assert!(!ShopifyError::RateLimited(60).is_not_found());
    }

    #[test]
    fn test_graphql_errors_joined() {
        let err = ShopifyError::GraphQL(vec![
            gql("Field not found", vec![], None),
            gql("Invalid ID", vec![], None),
        ]);
        assert_eq!(err.to_string(), "GraphQL errors: Field not found; Invalid ID");
    }

    #[test]
    fn test_graphql_error_path_and_location() {
        let full = gql("Bad line", vec![json!("cartLinesAdd"), json!(0)], Some((5, 10)));
        assert_eq!(full.to_string(), "Bad line path: cartLinesAdd.0 at line 5:10");

        let bare = gql("", vec![json!("cart")], Some((1, 2)));
        assert_eq!(bare.to_string(), "path: cart at line 1:2");
    }

    #[test]
    fn test_graphql_errors_without_details() {
        let err = ShopifyError::GraphQL(vec![gql("", vec![], None)]);
        assert_eq!(err.to_string(), "GraphQL errors: [error 1]: (no details)");

        let err = ShopifyError::GraphQL(vec![]);
        assert_eq!(err.to_string(), "GraphQL errors: (no error details provided)");
    }

    #[test]
    fn test_message_helper() {
        let err = ShopifyError::message("Failed to create cart");
        assert_eq!(err.to_string(), "GraphQL errors: Failed to create cart");
    }
}
