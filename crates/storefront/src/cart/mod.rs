//! Cart lifecycle: the controller, its observable state, lifecycle events and
//! cart id persistence.

mod controller;
mod events;
mod state;
mod store;

pub use controller::{CartController, MutationOutcome};
pub use events::{CartEvent, CartNotification, EventBus, Listener};
pub use state::{
    CartError, CartErrors, CartSnapshot, CartState, FetchFailure, FetchedCart, MutationKind,
    derived_item_count,
};
pub use store::{CartIdStore, FileCartIdStore, MemoryCartIdStore, StoreError, cart_key};
