//! `hk subscribe` command.

use headless_kit_storefront::config::ShopifyStorefrontConfig;
use headless_kit_storefront::error::Result;
use headless_kit_storefront::newsletter::{self, SubscriptionOutcome};
use headless_kit_storefront::shopify::StorefrontClient;

#[allow(clippy::print_stdout)]
pub async fn subscribe(email: &str) -> Result<()> {
    let client = StorefrontClient::new(&ShopifyStorefrontConfig::from_env()?)?;

    match newsletter::subscribe(&client, email).await? {
        (email, SubscriptionOutcome::Subscribed(_)) => println!("Subscribed {email}."),
        (email, SubscriptionOutcome::AlreadySubscribed) => {
            println!("{email} is already subscribed.");
        }
    }
    Ok(())
}
