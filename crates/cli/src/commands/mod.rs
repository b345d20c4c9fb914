//! Subcommand implementations.

pub mod cart;
pub mod drop_timer;
pub mod newsletter;
pub mod product;

use headless_kit_storefront::cart::{CartController, FileCartIdStore};
use headless_kit_storefront::config::{CartConfig, ShopifyStorefrontConfig};
use headless_kit_storefront::error::Result;
use headless_kit_storefront::shopify::StorefrontClient;

/// Cart controller backed by the Storefront API and the cart store file.
pub type Cart = CartController<StorefrontClient, FileCartIdStore>;

/// Build a Storefront client and a cart controller from the environment.
pub fn connect() -> Result<(StorefrontClient, Cart)> {
    let client = StorefrontClient::new(&ShopifyStorefrontConfig::from_env()?)?;
    let cart_config = CartConfig::from_env();

    tracing::debug!(
        store = %cart_config.store_path.display(),
        namespace = %cart_config.app_cart_id,
        "Using cart store"
    );

    let cart = CartController::new(
        client.clone(),
        FileCartIdStore::new(cart_config.store_path),
        &cart_config.app_cart_id,
    );
    Ok((client, cart))
}
