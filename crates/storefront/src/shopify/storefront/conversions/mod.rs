//! Raw Storefront API response shapes and their conversion to domain types.

pub mod cart;
pub mod customer;
pub mod products;

use serde::Deserialize;

use crate::shopify::types::{Money, UserError};

pub use cart::{
    CartLinesAddData, CartLinesRemoveData, CartLinesUpdateData, CartCreateData, FetchCartData,
    MutationPayload,
};
pub use customer::CustomerCreateData;
pub use products::ProductByHandleData;

/// Relay-style connection (`edges { node }`).
#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

/// A single connection edge.
#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    /// Unwrap the edges into their nodes, keeping order.
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|edge| edge.node)
    }
}

/// `MoneyV2` as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyData {
    pub amount: String,
    pub currency_code: String,
}

impl From<MoneyData> for Money {
    fn from(data: MoneyData) -> Self {
        Self {
            amount: data.amount,
            currency_code: data.currency_code,
        }
    }
}

/// `userErrors` / `customerUserErrors` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UserErrorData {
    pub code: Option<String>,
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl From<UserErrorData> for UserError {
    fn from(data: UserErrorData) -> Self {
        Self {
            code: data.code,
            field: data.field,
            message: data.message,
        }
    }
}

/// Join user error messages into one `ShopifyError::UserError` text.
pub fn join_user_errors(errors: Vec<UserErrorData>) -> String {
    errors
        .into_iter()
        .map(|e| UserError::from(e).message)
        .collect::<Vec<_>>()
        .join("; ")
}
