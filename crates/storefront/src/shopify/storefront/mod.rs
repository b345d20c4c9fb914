//! Shopify Storefront API client implementation.
//!
//! Uses the `graphql_client` request/response envelope with `reqwest` 0.13 for
//! HTTP. Caches products using `moka` (5-minute TTL); carts are never cached.

mod cache;
mod conversions;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{QueryBody, Response};
use headless_kit_core::{CartId, CartLineId, Email};
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::{ConfigError, ShopifyStorefrontConfig};
use crate::shopify::api::{NewsletterApi, StorefrontApi};
use crate::shopify::types::{Cart, CartLineInput, CartLineUpdateInput, Customer, Product};
use crate::shopify::{GraphQLError, GraphQLErrorLocation, ShopifyError};

use cache::{CacheValue, product_key};
use conversions::{
    CartCreateData, CartLinesAddData, CartLinesRemoveData, CartLinesUpdateData,
    CustomerCreateData, FetchCartData, MutationPayload, ProductByHandleData,
};
use queries::Operation;

/// Maximum variants requested per product.
const VARIANT_COUNT: i64 = 100;

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Cheap to clone; clones share the HTTP connection pool and product cache.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    auth_header: &'static str,
    access_token: String,
    cache: Cache<String, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured store does not form a valid endpoint URL.
    pub fn new(config: &ShopifyStorefrontConfig) -> Result<Self, ConfigError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let endpoint = config.endpoint()?.to_string();
        let (auth_header, access_token) = config.auth_header();

        Ok(Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint,
                auth_header,
                access_token,
                cache,
            }),
        })
    }

    /// Execute a GraphQL operation.
    async fn execute<V, R>(&self, operation: Operation, variables: V) -> Result<R, ShopifyError>
    where
        V: Serialize,
        R: DeserializeOwned,
    {
        let request_body = QueryBody {
            variables,
            query: operation.document,
            operation_name: operation.name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(self.inner.auth_header, &self.inner.access_token)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                operation = operation.name,
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response: Response<R> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    operation = operation.name,
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(operation = operation.name, errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = operation.name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::message("No data in response")
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its handle, with options and variants.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = product_key(handle);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data: ProductByHandleData = self
            .execute(
                queries::PRODUCT_BY_HANDLE,
                json!({ "handle": handle, "variantCount": VARIANT_COUNT }),
            )
            .await?;

        let product = data
            .product
            .map(conversions::products::convert_product)
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, handle: &str) {
        self.inner.cache.invalidate(&product_key(handle)).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

// =============================================================================
// Cart Methods (not cached - mutable state)
// =============================================================================

impl StorefrontApi for StorefrontClient {
    #[instrument(skip(self, lines), fields(line_count = lines.as_ref().map_or(0, Vec::len)))]
    async fn create_cart(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, ShopifyError> {
        let data: CartCreateData = match lines {
            Some(lines) => {
                self.execute(queries::CREATE_CART_WITH_LINES, json!({ "lines": lines }))
                    .await?
            }
            None => self.execute(queries::CREATE_CART, json!({ "input": {} })).await?,
        };

        data.into_cart("Failed to create cart")
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, ShopifyError> {
        let data: FetchCartData = self
            .execute(queries::FETCH_CART, json!({ "id": cart_id }))
            .await?;

        Ok(data.cart.map(conversions::cart::convert_cart))
    }

    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        let data: CartLinesAddData = self
            .execute(
                queries::ADD_LINE_ITEM,
                json!({ "cartId": cart_id, "lines": lines }),
            )
            .await?;

        data.into_cart("Failed to add to cart")
    }

    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, ShopifyError> {
        let data: CartLinesUpdateData = self
            .execute(
                queries::UPDATE_LINE_ITEM,
                json!({ "cartId": cart_id, "lines": lines }),
            )
            .await?;

        data.into_cart("Failed to update cart")
    }

    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, ShopifyError> {
        let data: CartLinesRemoveData = self
            .execute(
                queries::REMOVE_LINE_ITEM,
                json!({ "cartId": cart_id, "lineIds": line_ids }),
            )
            .await?;

        data.into_cart("Failed to remove from cart")
    }
}

impl NewsletterApi for StorefrontClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_customer(
        &self,
        email: &Email,
        password: &str,
        accepts_marketing: bool,
    ) -> Result<Customer, ShopifyError> {
        let data: CustomerCreateData = self
            .execute(
                queries::CUSTOMER_CREATE,
                json!({
                    "input": {
                        "email": email,
                        "password": password,
                        "acceptsMarketing": accepts_marketing,
                    }
                }),
            )
            .await?;

        data.into_customer()
    }
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ShopifyStorefrontConfig {
        ShopifyStorefrontConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_public_token: "public".to_string(),
            storefront_private_token: None,
        }
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let client = StorefrontClient::new(&config()).unwrap();
        assert_eq!(
            client.inner.endpoint,
            "https://test.myshopify.com/api/2026-01/graphql.json"
        );
        assert_eq!(client.inner.auth_header, "X-Shopify-Storefront-Access-Token");
    }

    #[test]
    fn test_convert_graphql_error() {
        let raw: graphql_client::Error = serde_json::from_value(json!({
            "message": "Invalid global id",
            "locations": [{ "line": 2, "column": 3 }],
            "path": ["cart", 0]
        }))
        .unwrap();

        let converted = convert_graphql_error(raw);
        assert_eq!(converted.message, "Invalid global id");
        assert_eq!(converted.locations[0].line, 2);
        assert_eq!(converted.path, vec![json!("cart"), json!(0)]);
    }

    #[tokio::test]
    async fn test_invalidate_product_on_empty_cache() {
        let client = StorefrontClient::new(&config()).unwrap();
        client.invalidate_product("tee").await;
        client.invalidate_all().await;
        assert_eq!(client.inner.cache.entry_count(), 0);
    }
}
