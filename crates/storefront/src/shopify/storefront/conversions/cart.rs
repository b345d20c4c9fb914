//! Cart response shapes and conversion functions.

use headless_kit_core::{CartId, CartLineId, ProductId, VariantId};
use serde::Deserialize;
use tracing::warn;

use crate::shopify::ShopifyError;
use crate::shopify::types::{
    Cart, CartCost, CartLine, CartMerchandise, CartMerchandiseProduct, Money,
};

use super::{Connection, MoneyData, UserErrorData, join_user_errors};

// =============================================================================
// Response envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FetchCartData {
    pub cart: Option<CartData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCreateData {
    pub cart_create: Option<CartMutationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesAddData {
    pub cart_lines_add: Option<CartMutationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesUpdateData {
    pub cart_lines_update: Option<CartMutationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesRemoveData {
    pub cart_lines_remove: Option<CartMutationData>,
}

/// `{ cart, userErrors }` payload shared by every cart mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationData {
    pub cart: Option<CartData>,
    #[serde(default)]
    pub user_errors: Vec<UserErrorData>,
}

// =============================================================================
// MutationPayload - generic mutation result handling
// =============================================================================

/// A mutation response carrying an optional cart payload.
pub trait MutationPayload {
    /// The `{ cart, userErrors }` payload, if the mutation field was present.
    fn into_payload(self) -> Option<CartMutationData>;

    /// Resolve the payload into a cart, mapping user errors and missing carts.
    ///
    /// `failure` is the message used when neither a cart nor user errors came back.
    fn into_cart(self, failure: &str) -> Result<Cart, ShopifyError>
    where
        Self: Sized,
    {
        if let Some(result) = self.into_payload() {
            if !result.user_errors.is_empty() {
                return Err(ShopifyError::UserError(join_user_errors(result.user_errors)));
            }

            if let Some(cart) = result.cart {
                return Ok(convert_cart(cart));
            }
        }

        Err(ShopifyError::message(failure))
    }
}

impl MutationPayload for CartCreateData {
    fn into_payload(self) -> Option<CartMutationData> {
        self.cart_create
    }
}

impl MutationPayload for CartLinesAddData {
    fn into_payload(self) -> Option<CartMutationData> {
        self.cart_lines_add
    }
}

impl MutationPayload for CartLinesUpdateData {
    fn into_payload(self) -> Option<CartMutationData> {
        self.cart_lines_update
    }
}

impl MutationPayload for CartLinesRemoveData {
    fn into_payload(self) -> Option<CartMutationData> {
        self.cart_lines_remove
    }
}

// =============================================================================
// Cart fields
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartData {
    pub id: String,
    pub checkout_url: String,
    pub note: Option<String>,
    pub total_quantity: i64,
    pub cost: Option<CartCostData>,
    pub lines: Option<Connection<CartLineData>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCostData {
    pub subtotal_amount: MoneyData,
    pub total_amount: MoneyData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineData {
    pub id: String,
    pub quantity: i64,
    pub cost: CartLineCostData,
    pub merchandise: MerchandiseData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineCostData {
    pub total_amount: MoneyData,
}

/// Merchandise union; only `ProductVariant` fields are selected, so other
/// members arrive as an empty object.
#[derive(Debug, Deserialize)]
pub struct MerchandiseData {
    pub id: Option<String>,
    pub title: Option<String>,
    pub price: Option<MoneyData>,
    pub product: Option<MerchandiseProductData>,
}

#[derive(Debug, Deserialize)]
pub struct MerchandiseProductData {
    pub id: String,
    pub handle: String,
    pub title: String,
}

/// Convert a raw cart into the domain snapshot.
pub fn convert_cart(cart: CartData) -> Cart {
    let lines = cart.lines.map(|connection| {
        connection
            .into_nodes()
            .filter_map(|line| convert_line(line, &cart.id))
            .collect()
    });

    Cart {
        id: CartId::new(cart.id),
        checkout_url: cart.checkout_url,
        note: cart.note,
        total_quantity: cart.total_quantity,
        cost: cart.cost.map(|cost| CartCost {
            subtotal: cost.subtotal_amount.into(),
            total: cost.total_amount.into(),
        }),
        lines,
    }
}

fn convert_line(line: CartLineData, cart_id: &str) -> Option<CartLine> {
    let merchandise = line.merchandise;
    let (Some(id), Some(product)) = (merchandise.id, merchandise.product) else {
        warn!(cart_id = %cart_id, line_id = %line.id, "Skipping cart line with non-variant merchandise");
        return None;
    };

    Some(CartLine {
        id: CartLineId::new(line.id),
        quantity: line.quantity,
        total: line.cost.total_amount.into(),
        merchandise: CartMerchandise {
            id: VariantId::new(id),
            title: merchandise.title.unwrap_or_default(),
            price: merchandise.price.map_or_else(
                || Money {
                    amount: "0.0".to_string(),
                    currency_code: "USD".to_string(),
                },
                Money::from,
            ),
            product: CartMerchandiseProduct {
                id: ProductId::new(product.id),
                handle: product.handle,
                title: product.title,
            },
        },
    })
}
