//! Newsletter subscriptions.
//!
//! A subscription creates a Shopify customer with marketing consent. Existing
//! customers are reported as already subscribed; they manage preferences
//! through their account.

use headless_kit_core::{Email, EmailError};
use thiserror::Error;
use tracing::instrument;

use crate::shopify::{Customer, NewsletterApi, ShopifyError};

/// Errors from [`subscribe`].
#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Subscription failed: {0}")]
    Shopify(#[from] ShopifyError),
}

/// Result of a successful subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// A new customer was created.
    Subscribed(Customer),
    /// A customer with this email already exists.
    AlreadySubscribed,
}

/// Subscribe an email address to marketing.
///
/// # Errors
///
/// Returns an error if the email is invalid or Shopify rejects the customer
/// for a reason other than the email being taken.
#[instrument(skip(api, email))]
pub async fn subscribe<A: NewsletterApi>(
    api: &A,
    email: &str,
) -> Result<(Email, SubscriptionOutcome), NewsletterError> {
    let email = Email::parse(email)?;

    // Customers created here never log in with this password.
    let password = generate_password();

    match api.create_customer(&email, &password, true).await {
        Ok(customer) => {
            tracing::info!(email = %email, "Newsletter subscription successful");
            Ok((email, SubscriptionOutcome::Subscribed(customer)))
        }
        Err(e) if is_already_taken(&e) => {
            tracing::info!(email = %email, "Email already exists, treating as subscribed");
            Ok((email, SubscriptionOutcome::AlreadySubscribed))
        }
        Err(e) => {
            tracing::warn!(email = %email, error = %e, "Newsletter subscription failed");
            Err(e.into())
        }
    }
}

/// Shopify reports duplicates as "Email has already been taken".
fn is_already_taken(error: &ShopifyError) -> bool {
    let message = error.to_string().to_lowercase();
    message.contains("already been taken") || message.contains("already exists")
}

fn generate_password() -> String {
    format!("hk-{}", uuid::Uuid::new_v4().simple())
}
