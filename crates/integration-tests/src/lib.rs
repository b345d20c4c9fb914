//! Integration test support for Headless Kit.
//!
//! [`FakeStorefront`] is an in-memory stand-in for the Shopify Storefront
//! API. It keeps real cart state (lines merge by variant, totals follow the
//! quantities) so tests can drive a [`CartController`] end to end without a
//! network. Failures are injected per call with [`FakeStorefront::fail_next`].
//! [`GatedStorefront`] holds every response until the test releases it, to
//! replay responses arriving out of order.
//!
//! [`CartController`]: headless_kit_storefront::cart::CartController

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};

use headless_kit_core::{CartId, CartLineId, ProductId, VariantId};
use headless_kit_storefront::shopify::{
    Cart, CartCost, CartLine, CartLineInput, CartLineUpdateInput, CartMerchandise,
    CartMerchandiseProduct, Money, Product, ProductOption, ProductVariant, SelectedOption,
    ShopifyError, StorefrontApi,
};

/// Price of every unit in the fake store, in whole dollars.
pub const UNIT_PRICE: i64 = 10;

/// A call received by [`FakeStorefront`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateCart(Option<Vec<CartLineInput>>),
    FetchCart(CartId),
    AddLines(CartId, Vec<CartLineInput>),
    UpdateLines(CartId, Vec<CartLineUpdateInput>),
    RemoveLines(CartId, Vec<CartLineId>),
}

#[derive(Debug, Clone)]
struct FakeLine {
    id: CartLineId,
    merchandise: VariantId,
    quantity: i64,
}

#[derive(Debug, Default)]
struct Inner {
    carts: BTreeMap<CartId, Vec<FakeLine>>,
    calls: Vec<ApiCall>,
    failures: VecDeque<ShopifyError>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn add(&mut self, cart_id: &CartId, lines: Vec<CartLineInput>) {
        for input in lines {
            let existing = self
                .carts
                .get_mut(cart_id)
                .and_then(|cart| cart.iter_mut().find(|l| l.merchandise == input.merchandise_id));
            if let Some(line) = existing {
                line.quantity += input.quantity;
                continue;
            }
            let id = CartLineId::new(format!("gid://shopify/CartLine/{}", self.next_id()));
            self.carts.entry(cart_id.clone()).or_default().push(FakeLine {
                id,
                merchandise: input.merchandise_id,
                quantity: input.quantity,
            });
        }
    }
}

/// In-memory Storefront API.
#[derive(Debug, Default)]
pub struct FakeStorefront {
    inner: Mutex<Inner>,
}

impl FakeStorefront {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `error`. Queued failures are consumed in
    /// order, one per call.
    pub fn fail_next(&self, error: ShopifyError) {
        self.lock().failures.push_back(error);
    }

    /// Forget a cart, as Shopify does once a cart expires or is checked out.
    pub fn expire(&self, cart_id: &CartId) {
        self.lock().carts.remove(cart_id);
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Number of carts created and not expired.
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.lock().carts.len()
    }

    /// Current snapshot of a cart, without recording a call.
    #[must_use]
    pub fn snapshot(&self, cart_id: &CartId) -> Option<Cart> {
        let inner = self.lock();
        inner.carts.get(cart_id).map(|lines| render(cart_id, lines))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` and pop an injected failure, if any.
    fn begin(&self, call: ApiCall) -> Result<MutexGuard<'_, Inner>, ShopifyError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        match inner.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(inner),
        }
    }
}

fn missing(cart_id: &CartId) -> ShopifyError {
    ShopifyError::UserError(format!("The specified cart does not exist: {cart_id}"))
}

impl StorefrontApi for FakeStorefront {
    async fn create_cart(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, ShopifyError> {
        let mut inner = self.begin(ApiCall::CreateCart(lines.clone()))?;

        let cart_id = CartId::new(format!("gid://shopify/Cart/{}", inner.next_id()));
        inner.carts.insert(cart_id.clone(), Vec::new());
        inner.add(&cart_id, lines.unwrap_or_default());

        let cart = inner.carts.get(&cart_id).map(|l| render(&cart_id, l));
        cart.ok_or_else(|| missing(&cart_id))
    }

    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, ShopifyError> {
        let inner = self.begin(ApiCall::FetchCart(cart_id.clone()))?;
        Ok(inner.carts.get(cart_id).map(|lines| render(cart_id, lines)))
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        let mut inner = self.begin(ApiCall::AddLines(cart_id.clone(), lines.clone()))?;
        if !inner.carts.contains_key(cart_id) {
            return Err(missing(cart_id));
        }
        inner.add(cart_id, lines);
        inner
            .carts
            .get(cart_id)
            .map(|l| render(cart_id, l))
            .ok_or_else(|| missing(cart_id))
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, ShopifyError> {
        let mut inner = self.begin(ApiCall::UpdateLines(cart_id.clone(), lines.clone()))?;
        let cart = inner.carts.get_mut(cart_id).ok_or_else(|| missing(cart_id))?;

        for update in lines {
            let line = cart
                .iter_mut()
                .find(|l| l.id == update.id)
                .ok_or_else(|| ShopifyError::UserError(format!("Unknown line: {}", update.id)))?;
            line.quantity = update.quantity;
        }
        cart.retain(|l| l.quantity > 0);

        Ok(render(cart_id, cart))
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, ShopifyError> {
        let mut inner = self.begin(ApiCall::RemoveLines(cart_id.clone(), line_ids.clone()))?;
        let cart = inner.carts.get_mut(cart_id).ok_or_else(|| missing(cart_id))?;

        if let Some(unknown) = line_ids.iter().find(|id| !cart.iter().any(|l| &l.id == *id)) {
            return Err(ShopifyError::UserError(format!("Unknown line: {unknown}")));
        }
        cart.retain(|l| !line_ids.contains(&l.id));

        Ok(render(cart_id, cart))
    }
}

/// Lets several controllers talk to one backend.
impl StorefrontApi for &FakeStorefront {
    async fn create_cart(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, ShopifyError> {
        (**self).create_cart(lines).await
    }

    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, ShopifyError> {
        (**self).fetch_cart(cart_id).await
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        (**self).add_lines(cart_id, lines).await
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, ShopifyError> {
        (**self).update_lines(cart_id, lines).await
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, ShopifyError> {
        (**self).remove_lines(cart_id, line_ids).await
    }
}

// =============================================================================
// Out-of-order responses
// =============================================================================

/// A [`FakeStorefront`] whose responses are held back.
///
/// Each call is applied to the backend as soon as it arrives, then waits
/// until [`release`](Self::release) is called with its arrival index. Calls
/// are numbered from 0 in arrival order.
#[derive(Debug)]
pub struct GatedStorefront {
    backend: FakeStorefront,
    arrivals: watch::Sender<usize>,
    pending: Mutex<Vec<Option<oneshot::Sender<()>>>>,
}

impl Default for GatedStorefront {
    fn default() -> Self {
        Self {
            backend: FakeStorefront::new(),
            arrivals: watch::Sender::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }
}

impl GatedStorefront {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The backend, for setup and inspection without going through a gate.
    #[must_use]
    pub const fn backend(&self) -> &FakeStorefront {
        &self.backend
    }

    /// Wait until `count` calls have arrived. Returns false if the
    /// storefront was dropped first.
    pub async fn arrived(&self, count: usize) -> bool {
        let mut rx = self.arrivals.subscribe();
        rx.wait_for(|&arrived| arrived >= count).await.is_ok()
    }

    /// Deliver the response of the call that arrived `index`-th. Returns
    /// false if there is no such call or it was already released.
    pub fn release(&self, index: usize) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending
            .get_mut(index)
            .and_then(Option::take)
            .is_some_and(|gate| gate.send(()).is_ok())
    }

    fn enter(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Some(tx));
        self.arrivals.send_modify(|arrived| *arrived += 1);
        rx
    }

    async fn hold<T>(&self, result: T) -> T {
        let gate = self.enter();
        // A dropped sender releases the call too.
        let _ = gate.await;
        result
    }
}

impl StorefrontApi for GatedStorefront {
    async fn create_cart(&self, lines: Option<Vec<CartLineInput>>) -> Result<Cart, ShopifyError> {
        let result = self.backend.create_cart(lines).await;
        self.hold(result).await
    }

    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, ShopifyError> {
        let result = self.backend.fetch_cart(cart_id).await;
        self.hold(result).await
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        let result = self.backend.add_lines(cart_id, lines).await;
        self.hold(result).await
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, ShopifyError> {
        let result = self.backend.update_lines(cart_id, lines).await;
        self.hold(result).await
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, ShopifyError> {
        let result = self.backend.remove_lines(cart_id, line_ids).await;
        self.hold(result).await
    }
}

fn usd(dollars: i64) -> Money {
    Money {
        amount: format!("{dollars}.00"),
        currency_code: "USD".to_string(),
    }
}

fn render(cart_id: &CartId, lines: &[FakeLine]) -> Cart {
    let total_quantity = lines.iter().map(|l| l.quantity).sum::<i64>();
    let lines = lines
        .iter()
        .map(|line| CartLine {
            id: line.id.clone(),
            quantity: line.quantity,
            total: usd(line.quantity * UNIT_PRICE),
            merchandise: CartMerchandise {
                id: line.merchandise.clone(),
                title: "Default Title".to_string(),
                price: usd(UNIT_PRICE),
                product: CartMerchandiseProduct {
                    id: ProductId::new("gid://shopify/Product/1"),
                    handle: "fake-product".to_string(),
                    title: "Fake Product".to_string(),
                },
            },
        })
        .collect();

    Cart {
        id: cart_id.clone(),
        checkout_url: format!(
            "https://shop.example.com/checkouts/{}",
            cart_id.numeric_id().unwrap_or_default()
        ),
        note: None,
        total_quantity,
        cost: Some(CartCost {
            subtotal: usd(total_quantity * UNIT_PRICE),
            total: usd(total_quantity * UNIT_PRICE),
        }),
        lines: Some(lines),
    }
}

// =============================================================================
// Product fixtures
// =============================================================================

/// A variant with the given option values and inventory.
#[must_use]
pub fn variant(
    id: u32,
    options: &[(&str, &str)],
    available_for_sale: bool,
    quantity_available: Option<i64>,
) -> ProductVariant {
    ProductVariant {
        id: VariantId::new(format!("gid://shopify/ProductVariant/{id}")),
        title: options
            .iter()
            .map(|(_, value)| *value)
            .collect::<Vec<_>>()
            .join(" / "),
        available_for_sale,
        quantity_available,
        price: Some(usd(UNIT_PRICE)),
        selected_options: options
            .iter()
            .map(|(name, value)| SelectedOption::new(*name, *value))
            .collect(),
    }
}

/// A product with the given options and variants.
#[must_use]
pub fn product(options: &[(&str, &[&str])], variants: Vec<ProductVariant>) -> Product {
    Product {
        id: ProductId::new("gid://shopify/Product/1"),
        handle: "classic-tee".to_string(),
        title: "Classic Tee".to_string(),
        available_for_sale: variants.iter().any(|v| v.available_for_sale),
        options: options
            .iter()
            .map(|(name, values)| ProductOption {
                name: (*name).to_string(),
                values: values.iter().map(|v| (*v).to_string()).collect(),
            })
            .collect(),
        variants,
    }
}

/// Color × Size tee: Red/S and Red/M in stock, Blue/S sold out, Blue/M
/// without a reported quantity.
#[must_use]
pub fn classic_tee() -> Product {
    product(
        &[("Color", &["Red", "Blue"]), ("Size", &["S", "M"])],
        vec![
            variant(1, &[("Color", "Red"), ("Size", "S")], true, Some(5)),
            variant(2, &[("Color", "Red"), ("Size", "M")], true, Some(1)),
            variant(3, &[("Color", "Blue"), ("Size", "S")], false, Some(0)),
            variant(4, &[("Color", "Blue"), ("Size", "M")], true, None),
        ],
    )
}

/// A unique path under the system temp directory.
#[must_use]
pub fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("hk-{name}-{}.json", uuid::Uuid::new_v4().simple()))
}
