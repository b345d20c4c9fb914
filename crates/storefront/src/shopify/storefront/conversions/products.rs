//! Product response shapes and conversion functions.

use headless_kit_core::{ProductId, VariantId};
use serde::Deserialize;

use crate::shopify::types::{Product, ProductOption, ProductVariant, SelectedOption};

use super::{Connection, MoneyData};

#[derive(Debug, Deserialize)]
pub struct ProductByHandleData {
    pub product: Option<ProductData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub available_for_sale: bool,
    pub options: Vec<ProductOptionData>,
    pub variants: Connection<ProductVariantData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductOptionData {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantData {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub quantity_available: Option<i64>,
    pub price: Option<MoneyData>,
    pub selected_options: Vec<SelectedOptionData>,
}

#[derive(Debug, Deserialize)]
pub struct SelectedOptionData {
    pub name: String,
    pub value: String,
}

/// Convert a raw product into the domain type, keeping variant order.
pub fn convert_product(product: ProductData) -> Product {
    Product {
        id: ProductId::new(product.id),
        handle: product.handle,
        title: product.title,
        available_for_sale: product.available_for_sale,
        options: product
            .options
            .into_iter()
            .map(|o| ProductOption {
                name: o.name,
                values: o.values,
            })
            .collect(),
        variants: product
            .variants
            .into_nodes()
            .map(|v| ProductVariant {
                id: VariantId::new(v.id),
                title: v.title,
                available_for_sale: v.available_for_sale,
                quantity_available: v.quantity_available,
                price: v.price.map(Into::into),
                selected_options: v
                    .selected_options
                    .into_iter()
                    .map(|s| SelectedOption {
                        name: s.name,
                        value: s.value,
                    })
                    .collect(),
            })
            .collect(),
    }
}
