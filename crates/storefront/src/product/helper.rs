//! Product page state: option selection, resolved variant and add-to-bag.

use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::cart::{CartController, CartError, CartIdStore, MutationOutcome};
use crate::shopify::{Product, ProductVariant, StorefrontApi};

use super::resolver::{
    OptionAvailability, SelectionProgress, compute_option_availability, resolve_variant,
    selection_progress,
};
use super::selection::{Selection, SelectionError};

/// Progress of the last add-to-bag action.
#[derive(Debug, Clone, Default)]
pub enum AddToBagState {
    #[default]
    Idle,
    Loading,
    Success,
    Error(CartError),
}

/// Options for [`ProductHelper::add_to_bag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddToBagOptions {
    pub quantity: i64,
    /// Open the cart drawer once the line was added.
    pub open_cart_on_success: bool,
}

impl Default for AddToBagOptions {
    fn default() -> Self {
        Self {
            quantity: 1,
            open_cart_on_success: false,
        }
    }
}

/// Tracks the selection on a product page and adds the resolved variant to a cart.
pub struct ProductHelper {
    product: Product,
    selection: Selection,
    add_to_bag: watch::Sender<AddToBagState>,
}

impl ProductHelper {
    /// Start with nothing selected.
    #[must_use]
    pub fn new(product: Product) -> Self {
        let selection = Selection::for_product(&product);
        Self {
            product,
            selection,
            add_to_bag: watch::Sender::new(AddToBagState::Idle),
        }
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Select or clear an option value.
    ///
    /// # Errors
    ///
    /// Returns an error if the product has no option named `name`.
    pub fn select_option(&mut self, name: &str, value: Option<&str>) -> Result<(), SelectionError> {
        self.selection.select(name, value)
    }

    /// The variant the current selection resolves to.
    #[must_use]
    pub fn selected_variant(&self) -> Option<&ProductVariant> {
        resolve_variant(&self.product.variants, &self.selection)
    }

    /// Per-value availability under the current selection.
    #[must_use]
    pub fn options(&self) -> Vec<OptionAvailability> {
        compute_option_availability(&self.product.options, &self.product.variants, &self.selection)
    }

    #[must_use]
    pub fn progress(&self) -> SelectionProgress {
        selection_progress(&self.selection)
    }

    /// Whether [`add_to_bag`](Self::add_to_bag) would send a mutation.
    ///
    /// Products with several variants need every option selected.
    #[must_use]
    pub fn can_add_to_bag(&self) -> bool {
        self.selected_variant().is_some()
            && (self.product.variants.len() <= 1 || self.progress().has_all_selected)
    }

    /// Current add-to-bag state.
    #[must_use]
    pub fn add_to_bag_state(&self) -> AddToBagState {
        self.add_to_bag.borrow().clone()
    }

    /// Receiver notified on add-to-bag state changes.
    #[must_use]
    pub fn subscribe_add_to_bag(&self) -> watch::Receiver<AddToBagState> {
        self.add_to_bag.subscribe()
    }

    /// Add the selected variant to the cart.
    ///
    /// Does nothing and returns `None` when [`can_add_to_bag`](Self::can_add_to_bag)
    /// is false.
    #[instrument(skip(self, cart), fields(product = %self.product.handle))]
    pub async fn add_to_bag<A, S>(
        &self,
        cart: &CartController<A, S>,
        options: AddToBagOptions,
    ) -> Option<MutationOutcome>
    where
        A: StorefrontApi,
        S: CartIdStore,
    {
        if !self.can_add_to_bag() {
            debug!("Selection incomplete, not adding to bag");
            return None;
        }
        let variant_id = self.selected_variant()?.id.clone();

        self.add_to_bag.send_replace(AddToBagState::Loading);
        let outcome = cart.add_line_item(&variant_id, options.quantity).await;

        let state = match &outcome {
            MutationOutcome::Failed(error) => AddToBagState::Error(error.clone()),
            MutationOutcome::Applied(_) | MutationOutcome::Skipped => {
                if options.open_cart_on_success {
                    cart.open_cart();
                }
                AddToBagState::Success
            }
        };
        self.add_to_bag.send_replace(state);

        Some(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use headless_kit_core::{CartId, CartLineId, ProductId, VariantId};

    use super::*;
    use crate::cart::MemoryCartIdStore;
    use crate::shopify::{
        Cart, CartLineInput, CartLineUpdateInput, ProductOption, SelectedOption, ShopifyError,
    };

    /// Creates carts and records the lines it was asked for.
    #[derive(Default)]
    struct RecordingApi {
        fail: bool,
        added: Mutex<Vec<CartLineInput>>,
    }

    impl RecordingApi {
        fn respond(&self, lines: Vec<CartLineInput>) -> Result<Cart, ShopifyError> {
            self.added.lock().unwrap().extend(lines);
            if self.fail {
                return Err(ShopifyError::UserError("out of stock".to_string()));
            }
            Ok(Cart {
                id: CartId::new("gid://shopify/Cart/1"),
                checkout_url: String::new(),
                note: None,
                total_quantity: 1,
                cost: None,
                lines: Some(vec![]),
            })
        }
    }

    impl StorefrontApi for RecordingApi {
        async fn create_cart(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, ShopifyError> {
            self.respond(lines.unwrap_or_default())
        }

        async fn fetch_cart(&self, _: &CartId) -> Result<Option<Cart>, ShopifyError> {
            Ok(None)
        }

        async fn add_lines(&self, _: &CartId, lines: Vec<CartLineInput>) -> Result<Cart, ShopifyError> {
            self.respond(lines)
        }

        async fn update_lines(&self, _: &CartId, _: Vec<CartLineUpdateInput>) -> Result<Cart, ShopifyError> {
            self.respond(vec![])
        }

        async fn remove_lines(&self, _: &CartId, _: Vec<CartLineId>) -> Result<Cart, ShopifyError> {
            self.respond(vec![])
        }
    }

    fn variant(id: u32, color: &str, size: &str) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(format!("gid://shopify/ProductVariant/{id}")),
            title: format!("{color} / {size}"),
            available_for_sale: true,
            quantity_available: Some(2),
            price: None,
            selected_options: vec![
                SelectedOption::new("Color", color),
                SelectedOption::new("Size", size),
            ],
        }
    }

    fn product() -> Product {
        Product {
            id: ProductId::new("gid://shopify/Product/1"),
            handle: "tee".to_string(),
            title: "Tee".to_string(),
            available_for_sale: true,
            options: vec![
                ProductOption {
                    name: "Color".to_string(),
                    values: vec!["Red".to_string(), "Blue".to_string()],
                },
                ProductOption {
                    name: "Size".to_string(),
                    values: vec!["S".to_string()],
                },
            ],
            variants: vec![variant(1, "Red", "S"), variant(2, "Blue", "S")],
        }
    }

    fn cart(fail: bool) -> CartController<RecordingApi, MemoryCartIdStore> {
        CartController::new(
            RecordingApi {
                fail,
                ..RecordingApi::default()
            },
            MemoryCartIdStore::new(),
            "test",
        )
    }

    #[tokio::test]
    async fn test_add_to_bag_requires_full_selection() {
        let cart = cart(false);
        let mut helper = ProductHelper::new(product());
        helper.select_option("Color", Some("Blue")).unwrap();

        assert!(helper.selected_variant().is_some());
        assert!(!helper.can_add_to_bag());
        assert!(helper.add_to_bag(&cart, AddToBagOptions::default()).await.is_none());
        assert!(matches!(helper.add_to_bag_state(), AddToBagState::Idle));
    }

    #[tokio::test]
    async fn test_add_to_bag_success_opens_cart() {
        let cart = cart(false);
        let mut helper = ProductHelper::new(product());
        helper.select_option("Color", Some("Blue")).unwrap();
        helper.select_option("Size", Some("S")).unwrap();

        let outcome = helper
            .add_to_bag(
                &cart,
                AddToBagOptions {
                    quantity: 3,
                    open_cart_on_success: true,
                },
            )
            .await
            .unwrap();

        assert!(outcome.cart().is_some());
        assert!(matches!(helper.add_to_bag_state(), AddToBagState::Success));
        assert!(cart.state().is_open);
        assert_eq!(
            *cart_api_lines(&cart),
            vec![CartLineInput::new(
                VariantId::new("gid://shopify/ProductVariant/2"),
                3
            )]
        );
    }

    #[tokio::test]
    async fn test_add_to_bag_failure() {
        let cart = cart(true);
        let mut helper = ProductHelper::new(product());
        helper.select_option("Color", Some("Red")).unwrap();
        helper.select_option("Size", Some("S")).unwrap();
        let rx = helper.subscribe_add_to_bag();

        helper
            .add_to_bag(
                &cart,
                AddToBagOptions {
                    open_cart_on_success: true,
                    ..AddToBagOptions::default()
                },
            )
            .await;

        assert!(matches!(*rx.borrow(), AddToBagState::Error(CartError::AddFailed(_))));
        assert!(!cart.state().is_open);
    }

    #[test]
    fn test_single_variant_product_can_add_without_selection() {
        let mut product = product();
        product.variants.truncate(1);
        let helper = ProductHelper::new(product);

        assert!(!helper.progress().has_one_selected);
        assert!(helper.can_add_to_bag());
        assert_eq!(helper.options().len(), 2);
    }

    #[test]
    fn test_select_unknown_option() {
        let mut helper = ProductHelper::new(product());
        assert!(helper.select_option("Fit", Some("Slim")).is_err());
    }

    fn cart_api_lines(
        cart: &CartController<RecordingApi, MemoryCartIdStore>,
    ) -> std::sync::MutexGuard<'_, Vec<CartLineInput>> {
        cart.api().added.lock().unwrap()
    }
}
