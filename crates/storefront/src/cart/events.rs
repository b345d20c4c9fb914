//! Cart lifecycle events.
//!
//! [`EventBus`] keeps an ordered listener list per [`CartEvent`]. Emission
//! runs over a copy of the list taken when `emit` is called, with the lock
//! released, so handlers may subscribe or unsubscribe (themselves included)
//! without affecting the dispatch in progress.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::shopify::Cart;

use super::state::CartError;

/// The eight cart lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartEvent {
    CreateCartSuccess,
    CreateCartError,
    AddLineItemSuccess,
    AddLineItemError,
    UpdateLineItemSuccess,
    UpdateLineItemError,
    RemoveLineItemSuccess,
    RemoveLineItemError,
}

impl CartEvent {
    /// Every event, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::CreateCartSuccess,
        Self::CreateCartError,
        Self::AddLineItemSuccess,
        Self::AddLineItemError,
        Self::UpdateLineItemSuccess,
        Self::UpdateLineItemError,
        Self::RemoveLineItemSuccess,
        Self::RemoveLineItemError,
    ];

    /// Event name as used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateCartSuccess => "createCartSuccess",
            Self::CreateCartError => "createCartError",
            Self::AddLineItemSuccess => "addLineItemSuccess",
            Self::AddLineItemError => "addLineItemError",
            Self::UpdateLineItemSuccess => "updateLineItemSuccess",
            Self::UpdateLineItemError => "updateLineItemError",
            Self::RemoveLineItemSuccess => "removeLineItemSuccess",
            Self::RemoveLineItemError => "removeLineItemError",
        }
    }
}

impl fmt::Display for CartEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered with an event.
#[derive(Debug, Clone)]
pub enum CartNotification {
    /// The cart snapshot produced by a successful mutation.
    Success(Cart),
    /// The error recorded for a failed mutation.
    Failure(CartError),
}

impl CartNotification {
    /// The cart, for success payloads.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Success(cart) => Some(cart),
            Self::Failure(_) => None,
        }
    }

    /// The error, for failure payloads.
    #[must_use]
    pub const fn error(&self) -> Option<&CartError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

type Handler = dyn Fn(&CartNotification) + Send + Sync;

/// A registered handler.
///
/// Listeners compare by identity: a clone refers to the same handler, so it
/// can be passed to [`EventBus::unsubscribe`] or subscribed a second time.
#[derive(Clone)]
pub struct Listener(Arc<Handler>);

impl Listener {
    /// Wrap a handler.
    pub fn new(handler: impl Fn(&CartNotification) + Send + Sync + 'static) -> Self {
        Self(Arc::new(handler))
    }

    fn call(&self, notification: &CartNotification) {
        (self.0)(notification);
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Synchronous publish/subscribe for cart events.
#[derive(Debug, Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<CartEvent, Vec<Listener>>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler and return its listener handle.
    pub fn subscribe(
        &self,
        event: CartEvent,
        handler: impl Fn(&CartNotification) + Send + Sync + 'static,
    ) -> Listener {
        let listener = Listener::new(handler);
        self.add_listener(event, listener.clone());
        listener
    }

    /// Append an existing listener. The same listener may be added repeatedly
    /// and is then invoked once per registration.
    pub fn add_listener(&self, event: CartEvent, listener: Listener) {
        self.lock().entry(event).or_default().push(listener);
    }

    /// Remove the first registration of `listener`. Returns whether one was found.
    pub fn unsubscribe(&self, event: CartEvent, listener: &Listener) -> bool {
        let mut listeners = self.lock();
        let Some(list) = listeners.get_mut(&event) else {
            return false;
        };
        let Some(position) = list.iter().position(|l| l.same(listener)) else {
            return false;
        };
        list.remove(position);
        true
    }

    /// Replace every listener of `event` with this handler.
    pub fn only(
        &self,
        event: CartEvent,
        handler: impl Fn(&CartNotification) + Send + Sync + 'static,
    ) -> Listener {
        let listener = Listener::new(handler);
        self.lock().insert(event, vec![listener.clone()]);
        listener
    }

    /// Invoke the listeners of `event` in subscription order.
    pub fn emit(&self, event: CartEvent, notification: &CartNotification) {
        let snapshot = self.lock().get(&event).cloned().unwrap_or_default();
        tracing::trace!(event = %event, listeners = snapshot.len(), "Emitting cart event");
        for listener in &snapshot {
            listener.call(notification);
        }
    }

    /// Number of registrations for `event`.
    #[must_use]
    pub fn listener_count(&self, event: CartEvent) -> usize {
        self.lock().get(&event).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CartEvent, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cart::state::FetchFailure;

    fn failure() -> CartNotification {
        CartNotification::Failure(CartError::FetchFailed(FetchFailure::NotFound))
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Arc::clone(log);
        Listener::new(move |_| log.lock().unwrap().push(tag))
    }

    #[test]
    fn test_emit_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.add_listener(CartEvent::AddLineItemError, recorder(&log, "a"));
        bus.add_listener(CartEvent::AddLineItemError, recorder(&log, "b"));
        bus.add_listener(CartEvent::AddLineItemSuccess, recorder(&log, "other"));

        bus.emit(CartEvent::AddLineItemError, &failure());

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicates_invoked_per_registration() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let listener = bus.subscribe(CartEvent::CreateCartError, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.add_listener(CartEvent::CreateCartError, listener.clone());

        bus.emit(CartEvent::CreateCartError, &failure());
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(bus.unsubscribe(CartEvent::CreateCartError, &listener));
        bus.emit(CartEvent::CreateCartError, &failure());
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert!(bus.unsubscribe(CartEvent::CreateCartError, &listener));
        assert!(!bus.unsubscribe(CartEvent::CreateCartError, &listener));
        assert_eq!(bus.listener_count(CartEvent::CreateCartError), 0);
    }

    #[test]
    fn test_unsubscribe_removes_first_instance_only() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");
        bus.add_listener(CartEvent::RemoveLineItemError, a.clone());
        bus.add_listener(CartEvent::RemoveLineItemError, recorder(&log, "b"));
        bus.add_listener(CartEvent::RemoveLineItemError, a.clone());

        bus.unsubscribe(CartEvent::RemoveLineItemError, &a);
        bus.emit(CartEvent::RemoveLineItemError, &failure());

        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_only_replaces_listeners() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.add_listener(CartEvent::UpdateLineItemError, recorder(&log, "old"));
        bus.add_listener(CartEvent::UpdateLineItemError, recorder(&log, "old"));

        let log_only = Arc::clone(&log);
        bus.only(CartEvent::UpdateLineItemError, move |_| {
            log_only.lock().unwrap().push("only");
        });
        bus.emit(CartEvent::UpdateLineItemError, &failure());

        assert_eq!(*log.lock().unwrap(), vec!["only"]);
    }

    #[test]
    fn test_unsubscribe_during_emit_does_not_affect_dispatch() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let b = recorder(&log, "b");

        let bus_inner = Arc::clone(&bus);
        let b_inner = b.clone();
        let log_a = Arc::clone(&log);
        bus.subscribe(CartEvent::AddLineItemError, move |_| {
            log_a.lock().unwrap().push("a");
            bus_inner.unsubscribe(CartEvent::AddLineItemError, &b_inner);
        });
        bus.add_listener(CartEvent::AddLineItemError, b);

        bus.emit(CartEvent::AddLineItemError, &failure());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        bus.emit(CartEvent::AddLineItemError, &failure());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_emit_without_listeners() {
        let bus = EventBus::new();
        bus.emit(CartEvent::CreateCartSuccess, &failure());
        assert_eq!(bus.listener_count(CartEvent::CreateCartSuccess), 0);
    }

    #[test]
    fn test_event_names() {
        let names: Vec<_> = CartEvent::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names[0], "createCartSuccess");
        assert_eq!(names[7], "removeLineItemError");
    }

    #[test]
    fn test_notification_accessors() {
        let n = failure();
        assert!(n.cart().is_none());
        assert!(n.error().is_some());
    }
}
