//! Variant resolution for products with options.

mod helper;
mod resolver;
mod selection;

pub use helper::{AddToBagOptions, AddToBagState, ProductHelper};
pub use resolver::{
    OptionAvailability, SelectionProgress, ValueAvailability, compute_option_availability,
    resolve_variant, selection_progress,
};
pub use selection::{Selection, SelectionError};
