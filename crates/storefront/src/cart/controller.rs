//! The cart controller.

use std::sync::Arc;

use headless_kit_core::{CartId, CartLineId, VariantId};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{add_breadcrumb, capture};
use crate::shopify::{Cart, CartLineInput, CartLineUpdateInput, StorefrontApi};

use super::events::{CartEvent, CartNotification, EventBus};
use super::state::{
    CartError, CartSnapshot, CartState, FetchFailure, FetchedCart, MutationKind,
    derived_item_count,
};
use super::store::{CartIdStore, cart_key};

/// Result of a cart mutation.
///
/// Failures are also recorded in [`CartState::errors`] and emitted on the
/// event bus, so callers are free to ignore this value.
#[derive(Debug, Clone)]
pub enum MutationOutcome {
    /// Shopify accepted the mutation; this is the new snapshot.
    Applied(Cart),
    /// The mutation failed.
    Failed(CartError),
    /// No cart exists, so there was nothing to change.
    Skipped,
}

impl MutationOutcome {
    /// The new cart, when the mutation was applied.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Applied(cart) => Some(cart),
            Self::Failed(_) | Self::Skipped => None,
        }
    }

    /// The error, when the mutation failed.
    #[must_use]
    pub const fn error(&self) -> Option<&CartError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Applied(_) | Self::Skipped => None,
        }
    }
}

impl From<Result<Cart, CartError>> for MutationOutcome {
    fn from(result: Result<Cart, CartError>) -> Self {
        match result {
            Ok(cart) => Self::Applied(cart),
            Err(error) => Self::Failed(error),
        }
    }
}

const fn events_for(kind: MutationKind) -> (CartEvent, CartEvent) {
    match kind {
        MutationKind::Create => (CartEvent::CreateCartSuccess, CartEvent::CreateCartError),
        MutationKind::Add => (CartEvent::AddLineItemSuccess, CartEvent::AddLineItemError),
        MutationKind::Update => (CartEvent::UpdateLineItemSuccess, CartEvent::UpdateLineItemError),
        MutationKind::Remove => (CartEvent::RemoveLineItemSuccess, CartEvent::RemoveLineItemError),
    }
}

/// Owns one cart, identified by an id persisted under `{namespace}-cart-id`.
///
/// State is published through a [`watch`] channel: [`state`](Self::state)
/// returns a snapshot and [`subscribe`](Self::subscribe) a receiver that is
/// notified on every change. Each change replaces the snapshot together with
/// the matching error slot in one step.
///
/// # Concurrency
///
/// No lock is held across API calls. Concurrent mutations race and the one
/// that resolves last replaces the snapshot, even if it was issued first.
/// Reading and writing the persisted id is not atomic either: two concurrent
/// [`add_line_item`](Self::add_line_item) calls on a fresh namespace can both
/// create a cart, and the id persisted last wins.
pub struct CartController<A, S> {
    api: A,
    store: S,
    storage_key: String,
    state: watch::Sender<CartState>,
    events: EventBus,
}

impl<A, S> CartController<A, S>
where
    A: StorefrontApi,
    S: CartIdStore,
{
    /// Create a controller for a cart namespace.
    pub fn new(api: A, store: S, namespace: &str) -> Self {
        Self {
            api,
            store,
            storage_key: cart_key(namespace),
            state: watch::Sender::new(CartState::default()),
            events: EventBus::new(),
        }
    }

    /// The Storefront API the controller talks to.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Key the cart id is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Lifecycle event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Item count of the current snapshot.
    #[must_use]
    pub fn item_count(&self) -> Option<i64> {
        derived_item_count(&self.state.borrow().cart)
    }

    /// The persisted cart id. `None` means no cart exists yet.
    ///
    /// A store that cannot be read is reported to Sentry and treated as empty.
    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        match self.store.get(&self.storage_key) {
            Ok(Some(id)) if !id.is_empty() => Some(CartId::new(id)),
            Ok(_) => None,
            Err(e) => {
                capture(&e, "Failed to read persisted cart id");
                None
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a variant to the cart, creating the cart on first use.
    ///
    /// Creating the cart also records and emits the create outcome. A failed
    /// creation is reported as an add failure as well.
    ///
    /// `quantity` must be positive. Callers validate it; release builds pass
    /// it on and leave rejection to Shopify.
    #[instrument(skip(self), fields(merchandise_id = %merchandise_id))]
    pub async fn add_line_item(&self, merchandise_id: &VariantId, quantity: i64) -> MutationOutcome {
        debug_assert!(quantity > 0, "line item quantity must be positive, got {quantity}");
        add_breadcrumb(
            "cart",
            "Add line item",
            Some(&[("merchandise_id", merchandise_id.as_str())]),
        );

        let lines = vec![CartLineInput::new(merchandise_id.clone(), quantity)];

        let result = match self.cart_id() {
            None => {
                debug!("No persisted cart, creating one with the line");
                self.create(Some(lines)).await.map_err(|e| match e {
                    CartError::CreateFailed(cause) => CartError::AddFailed(cause),
                    other => other,
                })
            }
            Some(cart_id) => self
                .api
                .add_lines(&cart_id, lines)
                .await
                .map_err(|e| MutationKind::Add.error(e)),
        };

        self.settle(MutationKind::Add, result).into()
    }

    /// Set the quantity of a line.
    ///
    /// `line` is either a cart line id or the merchandise id of a line in the
    /// current snapshot. Does nothing when no cart exists.
    #[instrument(skip(self), fields(line = %line))]
    pub async fn update_line_item(&self, line: &str, quantity: i64) -> MutationOutcome {
        let Some(cart_id) = self.cart_id() else {
            debug!("No persisted cart, skipping update");
            return MutationOutcome::Skipped;
        };
        add_breadcrumb("cart", "Update line item", Some(&[("line", line)]));

        let lines = vec![CartLineUpdateInput {
            id: self.line_id(line),
            quantity,
        }];
        let result = self
            .api
            .update_lines(&cart_id, lines)
            .await
            .map_err(|e| MutationKind::Update.error(e));

        self.settle(MutationKind::Update, result).into()
    }

    /// Remove a line. Accepts the same identifiers as
    /// [`update_line_item`](Self::update_line_item).
    #[instrument(skip(self), fields(line = %line))]
    pub async fn remove_line_item(&self, line: &str) -> MutationOutcome {
        let Some(cart_id) = self.cart_id() else {
            debug!("No persisted cart, skipping removal");
            return MutationOutcome::Skipped;
        };
        add_breadcrumb("cart", "Remove line item", Some(&[("line", line)]));

        let result = self
            .api
            .remove_lines(&cart_id, vec![self.line_id(line)])
            .await
            .map_err(|e| MutationKind::Remove.error(e));

        self.settle(MutationKind::Remove, result).into()
    }

    /// Create an empty cart and persist its id, replacing any previous one.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> MutationOutcome {
        self.create(None).await.into()
    }

    async fn create(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, CartError> {
        let result = self
            .api
            .create_cart(lines)
            .await
            .map_err(|e| MutationKind::Create.error(e));

        if let Ok(cart) = &result {
            info!(cart_id = %cart.id, "Created cart");
            if let Err(e) = self.store.set(&self.storage_key, cart.id.as_str()) {
                capture(&e, "Failed to persist cart id");
            }
        }

        self.settle(MutationKind::Create, result)
    }

    /// Record a mutation result and emit its event.
    fn settle(&self, kind: MutationKind, result: Result<Cart, CartError>) -> Result<Cart, CartError> {
        let (success, failure) = events_for(kind);

        match &result {
            Ok(cart) => {
                self.state.send_modify(|state| {
                    state.cart = CartSnapshot::Loaded(cart.clone());
                    *state.errors.slot(kind) = None;
                });
                self.events
                    .emit(success, &CartNotification::Success(cart.clone()));
            }
            Err(error) => {
                capture(error, "Cart mutation failed");
                self.state.send_modify(|state| {
                    *state.errors.slot(kind) = Some(error.clone());
                });
                self.events
                    .emit(failure, &CartNotification::Failure(error.clone()));
            }
        }

        result
    }

    /// Map a merchandise id held by the caller to its line in the current
    /// snapshot, falling back to treating it as a line id.
    fn line_id(&self, line: &str) -> CartLineId {
        let state = self.state.borrow();
        state
            .cart
            .cart()
            .and_then(|cart| cart.line_for_merchandise(line))
            .map_or_else(|| CartLineId::new(line), |l| l.id.clone())
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Fetch the persisted cart without touching the observable state.
    ///
    /// A cart Shopify no longer knows has its persisted id cleared. Any other
    /// failure keeps the id and yields [`FetchedCart::Unknown`].
    #[instrument(skip(self))]
    pub async fn fetch_current_cart(&self) -> FetchedCart {
        let Some(cart_id) = self.cart_id() else {
            return FetchedCart::NoCart;
        };

        match self.api.fetch_cart(&cart_id).await {
            Ok(Some(cart)) => FetchedCart::Cart(cart),
            Ok(None) => self.forget(&cart_id),
            Err(e) if e.is_not_found() => self.forget(&cart_id),
            Err(e) => {
                let error = CartError::FetchFailed(FetchFailure::Unknown(Arc::new(e)));
                capture(&error, "Failed to fetch cart");
                FetchedCart::Unknown(error)
            }
        }
    }

    fn forget(&self, cart_id: &CartId) -> FetchedCart {
        warn!(cart_id = %cart_id, "Persisted cart no longer exists, clearing id");
        if let Err(e) = self.store.remove(&self.storage_key) {
            capture(&e, "Failed to clear persisted cart id");
        }
        FetchedCart::NoCart
    }

    /// Fetch the persisted cart and publish the result.
    pub async fn refresh(&self) -> FetchedCart {
        let fetched = self.fetch_current_cart().await;

        self.state.send_modify(|state| {
            state.errors.fetch = match &fetched {
                FetchedCart::Unknown(error) => Some(error.clone()),
                FetchedCart::NoCart | FetchedCart::Cart(_) => None,
            };
            state.cart = fetched.clone().into();
        });

        fetched
    }

    // =========================================================================
    // Drawer
    // =========================================================================

    /// Open the cart drawer.
    pub fn open_cart(&self) {
        self.set_open(true);
    }

    /// Close the cart drawer.
    pub fn close_cart(&self) {
        self.set_open(false);
    }

    /// Flip the cart drawer and return whether it is now open.
    pub fn toggle_cart(&self) -> bool {
        let mut open = false;
        self.state.send_modify(|state| {
            state.is_open = !state.is_open;
            open = state.is_open;
        });
        open
    }

    fn set_open(&self, open: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_open != open;
            state.is_open = open;
            changed
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use headless_kit_core::{ProductId, VariantId};

    use super::*;
    use crate::cart::store::MemoryCartIdStore;
    use crate::shopify::{
        CartLine, CartMerchandise, CartMerchandiseProduct, Money, ShopifyError,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(Option<Vec<CartLineInput>>),
        Fetch(CartId),
        Add(CartId, Vec<CartLineInput>),
        Update(CartId, Vec<CartLineUpdateInput>),
        Remove(CartId, Vec<CartLineId>),
    }

    /// Replays scripted responses in order.
    #[derive(Default)]
    struct ScriptedApi {
        calls: Mutex<Vec<Call>>,
        carts: Mutex<VecDeque<Result<Cart, ShopifyError>>>,
        fetches: Mutex<VecDeque<Result<Option<Cart>, ShopifyError>>>,
    }

    impl ScriptedApi {
        fn reply(self, response: Result<Cart, ShopifyError>) -> Self {
            self.carts.lock().unwrap().push_back(response);
            self
        }

        fn fetch_reply(self, response: Result<Option<Cart>, ShopifyError>) -> Self {
            self.fetches.lock().unwrap().push_back(response);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn next(&self, call: Call) -> Result<Cart, ShopifyError> {
            self.calls.lock().unwrap().push(call);
            self.carts.lock().unwrap().pop_front().unwrap()
        }
    }

    impl StorefrontApi for ScriptedApi {
        async fn create_cart(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, ShopifyError> {
            self.next(Call::Create(lines))
        }

        async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, ShopifyError> {
            self.calls.lock().unwrap().push(Call::Fetch(cart_id.clone()));
            self.fetches.lock().unwrap().pop_front().unwrap()
        }

        async fn add_lines(&self, cart_id: &CartId, lines: Vec<CartLineInput>) -> Result<Cart, ShopifyError> {
            self.next(Call::Add(cart_id.clone(), lines))
        }

        async fn update_lines(
            &self,
            cart_id: &CartId,
            lines: Vec<CartLineUpdateInput>,
        ) -> Result<Cart, ShopifyError> {
            self.next(Call::Update(cart_id.clone(), lines))
        }

        async fn remove_lines(&self, cart_id: &CartId, line_ids: Vec<CartLineId>) -> Result<Cart, ShopifyError> {
            self.next(Call::Remove(cart_id.clone(), line_ids))
        }
    }

    fn money() -> Money {
        Money {
            amount: "20.0".to_string(),
            currency_code: "USD".to_string(),
        }
    }

    fn cart(id: &str, lines: &[(u32, i64)]) -> Cart {
        Cart {
            id: CartId::new(format!("gid://shopify/Cart/{id}")),
            checkout_url: "https://shop.example/checkout".to_string(),
            note: None,
            total_quantity: lines.iter().map(|(_, q)| q).sum(),
            cost: None,
            lines: Some(
                lines
                    .iter()
                    .map(|&(n, quantity)| CartLine {
                        id: CartLineId::new(format!("gid://shopify/CartLine/{n}")),
                        quantity,
                        total: money(),
                        merchandise: CartMerchandise {
                            id: VariantId::new(format!("gid://shopify/ProductVariant/{n}")),
                            title: "Default".to_string(),
                            price: money(),
                            product: CartMerchandiseProduct {
                                id: ProductId::new("gid://shopify/Product/1"),
                                handle: "tee".to_string(),
                                title: "Tee".to_string(),
                            },
                        },
                    })
                    .collect(),
            ),
        }
    }

    fn variant(n: u32) -> VariantId {
        VariantId::new(format!("gid://shopify/ProductVariant/{n}"))
    }

    fn controller(api: ScriptedApi) -> CartController<ScriptedApi, MemoryCartIdStore> {
        CartController::new(api, MemoryCartIdStore::new(), "test")
    }

    fn with_cart(api: ScriptedApi, id: &str) -> CartController<ScriptedApi, MemoryCartIdStore> {
        let store = MemoryCartIdStore::new();
        store
            .set("test-cart-id", &format!("gid://shopify/Cart/{id}"))
            .unwrap();
        CartController::new(api, store, "test")
    }

    #[tokio::test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "quantity must be positive")]
    async fn test_add_rejects_non_positive_quantity() {
        let ctl = controller(ScriptedApi::default());
        ctl.add_line_item(&variant(7), 0).await;
    }

    #[tokio::test]
    async fn test_first_add_creates_cart_with_line() {
        let ctl = controller(ScriptedApi::default().reply(Ok(cart("1", &[(7, 2)]))));
        let seen = Arc::new(Mutex::new(Vec::new()));
        for event in CartEvent::ALL {
            let seen = Arc::clone(&seen);
            ctl.events().subscribe(event, move |_| seen.lock().unwrap().push(event));
        }

        let outcome = ctl.add_line_item(&variant(7), 2).await;

        assert!(outcome.cart().is_some());
        assert_eq!(
            ctl.api.calls(),
            vec![Call::Create(Some(vec![CartLineInput::new(variant(7), 2)]))]
        );
        assert_eq!(ctl.cart_id().unwrap().as_str(), "gid://shopify/Cart/1");
        assert_eq!(ctl.item_count(), Some(2));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![CartEvent::CreateCartSuccess, CartEvent::AddLineItemSuccess]
        );
    }

    #[tokio::test]
    async fn test_add_uses_persisted_cart() {
        let ctl = with_cart(ScriptedApi::default().reply(Ok(cart("9", &[(1, 1)]))), "9");

        ctl.add_line_item(&variant(1), 1).await;

        assert_eq!(
            ctl.api.calls(),
            vec![Call::Add(
                CartId::new("gid://shopify/Cart/9"),
                vec![CartLineInput::new(variant(1), 1)]
            )]
        );
    }

    #[tokio::test]
    async fn test_add_failure_keeps_snapshot_and_next_success_clears_error() {
        let ctl = with_cart(
            ScriptedApi::default()
                .reply(Ok(cart("1", &[(1, 1)])))
                .reply(Err(ShopifyError::UserError("sold out".to_string())))
                .reply(Ok(cart("1", &[(1, 1), (2, 1)]))),
            "1",
        );
        let failures = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&failures);
        ctl.events().subscribe(CartEvent::AddLineItemError, move |n| {
            assert!(n.error().is_some());
            *counter.lock().unwrap() += 1;
        });

        ctl.add_line_item(&variant(1), 1).await;
        let outcome = ctl.add_line_item(&variant(2), 1).await;

        assert!(matches!(outcome, MutationOutcome::Failed(CartError::AddFailed(_))));
        let state = ctl.state();
        assert!(state.errors.add.is_some());
        assert_eq!(state.item_count(), Some(1));
        assert_eq!(*failures.lock().unwrap(), 1);

        ctl.add_line_item(&variant(2), 1).await;
        let state = ctl.state();
        assert!(state.errors.add.is_none());
        assert_eq!(state.item_count(), Some(2));
    }

    #[tokio::test]
    async fn test_failed_creation_reports_create_and_add() {
        let ctl = controller(
            ScriptedApi::default().reply(Err(ShopifyError::UserError("closed".to_string()))),
        );

        let outcome = ctl.add_line_item(&variant(1), 1).await;

        assert!(matches!(outcome, MutationOutcome::Failed(CartError::AddFailed(_))));
        let state = ctl.state();
        assert!(matches!(state.errors.create, Some(CartError::CreateFailed(_))));
        assert!(matches!(state.errors.add, Some(CartError::AddFailed(_))));
        assert!(ctl.cart_id().is_none());
        assert!(matches!(state.cart, CartSnapshot::Unknown));
    }

    #[tokio::test]
    async fn test_update_and_remove_without_cart_are_noops() {
        let ctl = controller(ScriptedApi::default());

        assert!(matches!(
            ctl.update_line_item("gid://shopify/CartLine/1", 3).await,
            MutationOutcome::Skipped
        ));
        assert!(matches!(
            ctl.remove_line_item("gid://shopify/CartLine/1").await,
            MutationOutcome::Skipped
        ));
        assert!(ctl.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_maps_merchandise_to_line_id() {
        let ctl = with_cart(
            ScriptedApi::default()
                .reply(Ok(cart("1", &[(4, 1)])))
                .reply(Ok(cart("1", &[(4, 3)])))
                .reply(Ok(cart("1", &[]))),
            "1",
        );
        ctl.add_line_item(&variant(4), 1).await;

        ctl.update_line_item(variant(4).as_str(), 3).await;
        assert_eq!(ctl.item_count(), Some(3));

        ctl.remove_line_item("gid://shopify/CartLine/4").await;
        assert_eq!(ctl.item_count(), Some(0));

        let calls = ctl.api.calls();
        assert_eq!(
            calls[1],
            Call::Update(
                CartId::new("gid://shopify/Cart/1"),
                vec![CartLineUpdateInput {
                    id: CartLineId::new("gid://shopify/CartLine/4"),
                    quantity: 3,
                }]
            )
        );
        assert_eq!(
            calls[2],
            Call::Remove(
                CartId::new("gid://shopify/Cart/1"),
                vec![CartLineId::new("gid://shopify/CartLine/4")]
            )
        );
    }

    #[tokio::test]
    async fn test_fetch_without_cart_id() {
        let ctl = controller(ScriptedApi::default());
        assert!(matches!(ctl.fetch_current_cart().await, FetchedCart::NoCart));
        assert!(ctl.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_not_found_clears_id() {
        let ctl = with_cart(ScriptedApi::default().fetch_reply(Ok(None)), "1");

        assert!(matches!(ctl.refresh().await, FetchedCart::NoCart));
        assert!(ctl.cart_id().is_none());
        assert_eq!(ctl.item_count(), Some(0));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_id() {
        let ctl = with_cart(
            ScriptedApi::default().fetch_reply(Err(ShopifyError::RateLimited(2))),
            "1",
        );

        let fetched = ctl.refresh().await;

        assert!(matches!(
            fetched,
            FetchedCart::Unknown(CartError::FetchFailed(FetchFailure::Unknown(_)))
        ));
        assert!(ctl.cart_id().is_some());
        let state = ctl.state();
        assert!(state.errors.fetch.is_some());
        assert_eq!(state.item_count(), None);
    }

    #[tokio::test]
    async fn test_refresh_loads_cart() {
        let ctl = with_cart(
            ScriptedApi::default().fetch_reply(Ok(Some(cart("1", &[(1, 2), (2, 3)])))),
            "1",
        );
        let mut rx = ctl.subscribe();

        assert!(matches!(ctl.refresh().await, FetchedCart::Cart(_)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().item_count(), Some(5));
    }

    #[tokio::test]
    async fn test_create_cart_replaces_persisted_id() {
        let ctl = with_cart(ScriptedApi::default().reply(Ok(cart("2", &[]))), "1");

        ctl.create_cart().await;

        assert_eq!(ctl.api.calls(), vec![Call::Create(None)]);
        assert_eq!(ctl.cart_id().unwrap().as_str(), "gid://shopify/Cart/2");
    }

    #[test]
    fn test_drawer_toggle() {
        let ctl = controller(ScriptedApi::default());
        let mut rx = ctl.subscribe();

        ctl.close_cart();
        assert!(!rx.has_changed().unwrap());

        ctl.open_cart();
        assert!(ctl.state().is_open);
        assert!(!ctl.toggle_cart());
        assert!(ctl.toggle_cart());
        assert!(rx.has_changed().unwrap());
    }
}
