//! Cache types for Storefront API responses.

use crate::shopify::types::Product;

/// Cache key for products.
pub fn product_key(handle: &str) -> String {
    format!("product:{handle}")
}

/// Cached value types. Carts are mutable state and never cached.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
}
