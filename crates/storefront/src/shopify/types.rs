//! Domain types for the Shopify Storefront API.
//!
//! These types provide a clean, ergonomic API separate from the raw
//! GraphQL response shapes in `storefront::conversions`.

use headless_kit_core::{CartId, CartLineId, CustomerId, Price, PriceError, ProductId, VariantId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Money Types
// =============================================================================

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Parse into a typed [`Price`].
    ///
    /// # Errors
    ///
    /// Returns an error if the amount or currency code cannot be parsed.
    pub fn to_price(&self) -> Result<Price, PriceError> {
        Price::parse(&self.amount, &self.currency_code)
    }

    /// Display string such as `$19.50`, falling back to the raw amount.
    #[must_use]
    pub fn display(&self) -> String {
        self.to_price().map_or_else(
            |_| format!("{} {}", self.amount, self.currency_code),
            |price| price.to_string(),
        )
    }
}

// =============================================================================
// Product Types
// =============================================================================

/// Selected option on a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name (e.g., "Size", "Color").
    pub name: String,
    /// Selected value (e.g., "Large", "Blue").
    pub value: String,
}

impl SelectedOption {
    /// Create a new name/value pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Product option definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name (e.g., "Size").
    pub name: String,
    /// Available values (e.g., `["Small", "Medium", "Large"]`).
    pub values: Vec<String>,
}

/// A product variant (specific combination of options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title (combination of option values).
    pub title: String,
    /// Whether this variant is available for sale.
    pub available_for_sale: bool,
    /// Quantity available (if inventory tracking enabled).
    pub quantity_available: Option<i64>,
    /// Current price.
    pub price: Option<Money>,
    /// Selected options for this variant, one per product option.
    pub selected_options: Vec<SelectedOption>,
}

impl ProductVariant {
    /// The value this variant has for the named option.
    #[must_use]
    pub fn option_value(&self, name: &str) -> Option<&str> {
        self.selected_options
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }

    /// Whether this variant can currently be bought.
    ///
    /// A variant without a reported quantity counts as out of stock.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.available_for_sale && self.quantity_available.unwrap_or(0) > 0
    }
}

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// URL handle.
    pub handle: String,
    /// Product title.
    pub title: String,
    /// Whether any variant is available.
    pub available_for_sale: bool,
    /// Product options.
    pub options: Vec<ProductOption>,
    /// Product variants, in the order Shopify returned them.
    pub variants: Vec<ProductVariant>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Simplified product info for cart merchandise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMerchandiseProduct {
    /// Product ID.
    pub id: ProductId,
    /// Product handle.
    pub handle: String,
    /// Product title.
    pub title: String,
}

/// Merchandise in a cart line (simplified product variant info).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMerchandise {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title.
    pub title: String,
    /// Current price.
    pub price: Money,
    /// Parent product info.
    pub product: CartMerchandiseProduct,
}

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart line ID.
    pub id: CartLineId,
    /// Quantity.
    pub quantity: i64,
    /// Line total (after discounts).
    pub total: Money,
    /// Product variant.
    pub merchandise: CartMerchandise,
}

/// Cart cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCost {
    /// Subtotal before tax/shipping.
    pub subtotal: Money,
    /// Total amount.
    pub total: Money,
}

/// A shopping cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Checkout URL.
    pub checkout_url: String,
    /// Cart note.
    pub note: Option<String>,
    /// Total item quantity as reported by Shopify.
    pub total_quantity: i64,
    /// Cart cost summary.
    pub cost: Option<CartCost>,
    /// Cart lines. `None` when the response carried no line data.
    pub lines: Option<Vec<CartLine>>,
}

impl Cart {
    /// Find the line holding the given variant.
    #[must_use]
    pub fn line_for_merchandise(&self, merchandise_id: &str) -> Option<&CartLine> {
        self.lines
            .as_deref()?
            .iter()
            .find(|line| line.merchandise.id.as_str() == merchandise_id)
    }
}

/// Input for adding a line to cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    /// Product variant ID.
    pub merchandise_id: VariantId,
    /// Quantity to add.
    pub quantity: i64,
}

impl CartLineInput {
    /// Create a new line input.
    #[must_use]
    pub const fn new(merchandise_id: VariantId, quantity: i64) -> Self {
        Self {
            merchandise_id,
            quantity,
        }
    }
}

/// Input for updating a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineUpdateInput {
    /// Cart line ID.
    pub id: CartLineId,
    /// New quantity.
    pub quantity: i64,
}

/// User error from cart or customer mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Error code.
    pub code: Option<String>,
    /// Field path that caused the error.
    pub field: Option<Vec<String>>,
    /// Human-readable error message.
    pub message: String,
}

// =============================================================================
// Customer Types
// =============================================================================

/// A customer created through the Storefront API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID.
    pub id: CustomerId,
    /// Email address.
    pub email: Option<String>,
    /// Whether the customer accepts marketing email.
    pub accepts_marketing: bool,
}
