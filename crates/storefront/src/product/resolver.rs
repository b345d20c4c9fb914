//! Variant matching and option availability.

use serde::Serialize;

use crate::shopify::{ProductOption, ProductVariant};

use super::selection::Selection;

/// Availability of one option value under the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAvailability {
    pub value: String,
    pub not_available: bool,
}

/// Availability of every value of one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionAvailability {
    pub name: String,
    pub values: Vec<ValueAvailability>,
}

/// How much of a selection has been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionProgress {
    pub has_one_selected: bool,
    pub has_all_selected: bool,
}

/// Find the variant matching a selection.
///
/// A product with a single variant always resolves to it. Otherwise the first
/// variant agreeing with every selected option wins; unselected options match
/// anything. `None` means the selection does not resolve (yet).
#[must_use]
pub fn resolve_variant<'a>(
    variants: &'a [ProductVariant],
    selection: &Selection,
) -> Option<&'a ProductVariant> {
    if let [only] = variants {
        return Some(only);
    }

    variants.iter().find(|variant| {
        selection
            .selected()
            .all(|(name, value)| variant.option_value(name) == Some(value))
    })
}

/// Mark which option values can still lead to a purchasable variant.
///
/// For each candidate value, the consistent variants are those carrying the
/// candidate and agreeing with every other selected option. The value is not
/// available when none of them is purchasable, including when there are none.
#[must_use]
pub fn compute_option_availability(
    options: &[ProductOption],
    variants: &[ProductVariant],
    selection: &Selection,
) -> Vec<OptionAvailability> {
    options
        .iter()
        .map(|option| OptionAvailability {
            name: option.name.clone(),
            values: option
                .values
                .iter()
                .map(|candidate| ValueAvailability {
                    value: candidate.clone(),
                    not_available: !variants
                        .iter()
                        .filter(|v| is_consistent(v, &option.name, candidate, selection))
                        .any(ProductVariant::is_purchasable),
                })
                .collect(),
        })
        .collect()
}

fn is_consistent(
    variant: &ProductVariant,
    option: &str,
    candidate: &str,
    selection: &Selection,
) -> bool {
    variant.option_value(option) == Some(candidate)
        && selection
            .selected()
            .filter(|(name, _)| *name != option)
            .all(|(name, value)| variant.option_value(name) == Some(value))
}

/// Whether any, and whether all, options have a value.
#[must_use]
pub fn selection_progress(selection: &Selection) -> SelectionProgress {
    let selected = selection.selected().count();
    SelectionProgress {
        has_one_selected: selected > 0,
        has_all_selected: selected == selection.len(),
    }
}
