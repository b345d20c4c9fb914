//! Observable cart state.

use std::sync::Arc;

use thiserror::Error;

use crate::shopify::{Cart, ShopifyError};

/// Why a cart fetch failed.
#[derive(Debug, Clone, Error)]
pub enum FetchFailure {
    /// Shopify no longer knows the persisted cart.
    #[error("cart not found")]
    NotFound,

    /// Transport or API failure; the cart may still exist.
    #[error("{0}")]
    Unknown(Arc<ShopifyError>),
}

/// A failed cart operation.
///
/// Causes are shared so the same error can sit in [`CartErrors`] and travel
/// through event payloads.
#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Failed to create cart: {0}")]
    CreateFailed(Arc<ShopifyError>),

    #[error("Failed to add line item: {0}")]
    AddFailed(Arc<ShopifyError>),

    #[error("Failed to update line item: {0}")]
    UpdateFailed(Arc<ShopifyError>),

    #[error("Failed to remove line item: {0}")]
    RemoveFailed(Arc<ShopifyError>),

    #[error("Failed to fetch cart: {0}")]
    FetchFailed(FetchFailure),
}

impl CartError {
    /// The underlying Shopify error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&ShopifyError> {
        match self {
            Self::CreateFailed(e) | Self::AddFailed(e) | Self::UpdateFailed(e) | Self::RemoveFailed(e) => {
                Some(e)
            }
            Self::FetchFailed(FetchFailure::Unknown(e)) => Some(e),
            Self::FetchFailed(FetchFailure::NotFound) => None,
        }
    }
}

/// Mutation kinds tracked in [`CartErrors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Add,
    Update,
    Remove,
}

impl MutationKind {
    /// Wrap a Shopify error as this kind's [`CartError`].
    #[must_use]
    pub fn error(self, cause: ShopifyError) -> CartError {
        let cause = Arc::new(cause);
        match self {
            Self::Create => CartError::CreateFailed(cause),
            Self::Add => CartError::AddFailed(cause),
            Self::Update => CartError::UpdateFailed(cause),
            Self::Remove => CartError::RemoveFailed(cause),
        }
    }
}

/// Last error per operation kind. Cleared by the next success of that kind.
#[derive(Debug, Clone, Default)]
pub struct CartErrors {
    pub create: Option<CartError>,
    pub add: Option<CartError>,
    pub update: Option<CartError>,
    pub remove: Option<CartError>,
    /// Last failed [`refresh`](super::CartController::refresh).
    pub fetch: Option<CartError>,
}

impl CartErrors {
    /// The error recorded for a mutation kind.
    #[must_use]
    pub const fn get(&self, kind: MutationKind) -> Option<&CartError> {
        match kind {
            MutationKind::Create => self.create.as_ref(),
            MutationKind::Add => self.add.as_ref(),
            MutationKind::Update => self.update.as_ref(),
            MutationKind::Remove => self.remove.as_ref(),
        }
    }

    pub(crate) const fn slot(&mut self, kind: MutationKind) -> &mut Option<CartError> {
        match kind {
            MutationKind::Create => &mut self.create,
            MutationKind::Add => &mut self.add,
            MutationKind::Update => &mut self.update,
            MutationKind::Remove => &mut self.remove,
        }
    }

    /// Whether any error is recorded.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.create.is_some()
            || self.add.is_some()
            || self.update.is_some()
            || self.remove.is_some()
            || self.fetch.is_some()
    }
}

/// The in-memory cart.
#[derive(Debug, Clone, Default)]
pub enum CartSnapshot {
    /// Not loaded yet, or the last fetch failed.
    #[default]
    Unknown,
    /// Confirmed: no cart exists.
    Empty,
    /// The latest snapshot returned by Shopify.
    Loaded(Cart),
}

impl CartSnapshot {
    /// The cart, when loaded.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Loaded(cart) => Some(cart),
            Self::Unknown | Self::Empty => None,
        }
    }
}

/// Result of [`fetch_current_cart`](super::CartController::fetch_current_cart).
#[derive(Debug, Clone)]
pub enum FetchedCart {
    /// No persisted id, or Shopify reported the cart gone.
    NoCart,
    /// The current cart.
    Cart(Cart),
    /// The fetch failed; the persisted id was kept.
    Unknown(CartError),
}

impl From<FetchedCart> for CartSnapshot {
    fn from(fetched: FetchedCart) -> Self {
        match fetched {
            FetchedCart::NoCart => Self::Empty,
            FetchedCart::Cart(cart) => Self::Loaded(cart),
            FetchedCart::Unknown(_) => Self::Unknown,
        }
    }
}

/// Everything observers of a cart see.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    pub cart: CartSnapshot,
    pub errors: CartErrors,
    /// Whether the cart drawer is open.
    pub is_open: bool,
}

impl CartState {
    /// Item count derived from the snapshot.
    #[must_use]
    pub fn item_count(&self) -> Option<i64> {
        derived_item_count(&self.cart)
    }
}

/// Total quantity across cart lines.
///
/// `Some(0)` when no cart exists. `None` while the count is unknown: the
/// cart has not been loaded, or it carries no line data.
#[must_use]
pub fn derived_item_count(snapshot: &CartSnapshot) -> Option<i64> {
    match snapshot {
        CartSnapshot::Empty => Some(0),
        CartSnapshot::Unknown => None,
        CartSnapshot::Loaded(cart) => cart
            .lines
            .as_ref()
            .map(|lines| lines.iter().map(|line| line.quantity).sum()),
    }
}
