//! Customer response shapes and conversion functions.

use headless_kit_core::CustomerId;
use serde::Deserialize;

use crate::shopify::ShopifyError;
use crate::shopify::types::Customer;

use super::{UserErrorData, join_user_errors};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreateData {
    pub customer_create: Option<CustomerCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreatePayload {
    pub customer: Option<CustomerData>,
    #[serde(default)]
    pub customer_user_errors: Vec<UserErrorData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub accepts_marketing: bool,
}

impl CustomerCreateData {
    /// Resolve the mutation result into a customer.
    pub fn into_customer(self) -> Result<Customer, ShopifyError> {
        let Some(payload) = self.customer_create else {
            return Err(ShopifyError::message("Failed to create customer"));
        };

        if !payload.customer_user_errors.is_empty() {
            return Err(ShopifyError::UserError(join_user_errors(
                payload.customer_user_errors,
            )));
        }

        payload
            .customer
            .map(|c| Customer {
                id: CustomerId::new(c.id),
                email: c.email,
                accepts_marketing: c.accepts_marketing,
            })
            .ok_or_else(|| ShopifyError::message("Failed to create customer"))
    }
}
