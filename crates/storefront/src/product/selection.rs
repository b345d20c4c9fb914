//! Option selection state for a product.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::shopify::{Product, ProductOption};

/// Errors raised when changing a selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The product has no option with this name.
    #[error("Unknown option: {name}")]
    UnknownOption { name: String },
}

/// Selected value per product option.
///
/// Keys are exactly the product's option names; every option starts out
/// unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    values: BTreeMap<String, Option<String>>,
}

impl Selection {
    /// An empty selection over the given options.
    #[must_use]
    pub fn for_options(options: &[ProductOption]) -> Self {
        Self {
            values: options.iter().map(|o| (o.name.clone(), None)).collect(),
        }
    }

    /// An empty selection over a product's options.
    #[must_use]
    pub fn for_product(product: &Product) -> Self {
        Self::for_options(&product.options)
    }

    /// Select a value for an option, or clear it with `None`.
    ///
    /// An empty value clears the option.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownOption`] if `name` is not one of the
    /// product's options.
    pub fn select(&mut self, name: &str, value: Option<&str>) -> Result<(), SelectionError> {
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| SelectionError::UnknownOption {
                name: name.to_string(),
            })?;
        *slot = value.filter(|v| !v.is_empty()).map(str::to_string);
        Ok(())
    }

    /// The value selected for an option.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name)?.as_deref()
    }

    /// Selected `(name, value)` pairs, skipping unselected options.
    pub fn selected(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.as_deref()?)))
    }

    /// Option names, selected or not.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the product has no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
