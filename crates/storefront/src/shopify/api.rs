//! Traits describing the Storefront operations the toolkit depends on.
//!
//! The cart controller and the newsletter helper are generic over these
//! traits so they can run against [`super::StorefrontClient`] in production
//! and against in-memory fakes in tests.

use std::future::Future;

use headless_kit_core::{CartId, CartLineId, Email};

use super::ShopifyError;
use super::types::{Cart, CartLineInput, CartLineUpdateInput, Customer};

/// Cart operations of the Storefront API.
///
/// Each call resolves to a full cart snapshot or a typed failure.
pub trait StorefrontApi: Send + Sync {
    /// Create a cart, optionally seeded with lines.
    fn create_cart(
        &self,
        lines: Option<Vec<CartLineInput>>,
    ) -> impl Future<Output = Result<Cart, ShopifyError>> + Send;

    /// Fetch a cart. `Ok(None)` means Shopify no longer knows the cart.
    fn fetch_cart(
        &self,
        cart_id: &CartId,
    ) -> impl Future<Output = Result<Option<Cart>, ShopifyError>> + Send;

    /// Add lines to an existing cart.
    fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> impl Future<Output = Result<Cart, ShopifyError>> + Send;

    /// Change quantities of existing cart lines.
    fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> impl Future<Output = Result<Cart, ShopifyError>> + Send;

    /// Remove lines from a cart.
    fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> impl Future<Output = Result<Cart, ShopifyError>> + Send;
}

/// Customer creation used for newsletter sign-ups.
pub trait NewsletterApi: Send + Sync {
    /// Create a customer with the given marketing consent.
    fn create_customer(
        &self,
        email: &Email,
        password: &str,
        accepts_marketing: bool,
    ) -> impl Future<Output = Result<Customer, ShopifyError>> + Send;
}
