//! Per-instance bookkeeping.
//!
//! A [`Hub`] holds everything the runtime attaches to an observable
//! instance: the observer set, the computed cache, the message subscribers
//! and the dependency map used by cross-object tracking. It does not know
//! the domain type, so instances of different types can be linked together
//! through their hubs.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::disposer::Disposer;
use super::listener::{ListenerId, ListenerSet};
use crate::graph::DependencyMap;

/// A zero-argument observer callback.
pub(crate) type Observer = dyn Fn() + Send + Sync;

/// A message subscriber. Messages are type-erased here and downcast by the
/// wrapper installed in [`subscribe`](crate::reactive::subscribe).
pub(crate) type MessageListener = dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync;

/// Cached computed values, keyed by declared property name.
///
/// `generation` moves on every reset. A value evaluated under an older
/// generation is never stored, whichever path the reset came through.
#[derive(Default)]
struct ComputedCache {
    generation: u64,
    values: IndexMap<&'static str, Box<dyn Any + Send + Sync>>,
}

/// Stable identity of an observable instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(u64);

impl ObservableId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping shared by every handle to one observable instance.
pub struct Hub {
    id: ObservableId,
    observers: ListenerSet<Observer>,
    subscribers: ListenerSet<MessageListener>,
    computed: Mutex<ComputedCache>,
    pub(crate) dependencies: DependencyMap,
}

impl Hub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ObservableId::next(),
            observers: ListenerSet::new(),
            subscribers: ListenerSet::new(),
            computed: Mutex::new(ComputedCache::default()),
            dependencies: DependencyMap::new(),
        })
    }

    /// The instance's identity.
    pub fn id(&self) -> ObservableId {
        self.id
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Number of registered message subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of sources this instance currently tracks.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Number of computed values currently cached.
    pub fn cached_count(&self) -> usize {
        self.computed.lock().values.len()
    }

    pub(crate) fn add_observer(self: &Arc<Self>, observer: Arc<Observer>) -> Disposer {
        let id = self.observers.insert(observer);
        let hub = Arc::downgrade(self);
        Disposer::new(move || remove_listener(&hub, id, |hub, id| hub.observers.remove(id)))
    }

    pub(crate) fn add_subscriber(self: &Arc<Self>, subscriber: Arc<MessageListener>) -> Disposer {
        let id = self.subscribers.insert(subscriber);
        let hub = Arc::downgrade(self);
        Disposer::new(move || remove_listener(&hub, id, |hub, id| hub.subscribers.remove(id)))
    }

    /// Call every observer. Does nothing (and allocates nothing) when there
    /// are none.
    ///
    /// If an observer panics the broadcast stops there and the panic
    /// propagates to the caller; the hub itself stays usable.
    pub(crate) fn notify_observers(&self) {
        let notified = self.observers.broadcast(|observer| observer());
        if notified > 0 {
            tracing::trace!(observable = %self.id, notified, "notified observers");
        }
    }

    /// Hand `message` to every subscriber. Returns how many were called.
    pub(crate) fn send_message(&self, message: &(dyn Any + Send + Sync)) -> usize {
        let delivered = self.subscribers.broadcast(|subscriber| subscriber(message));
        if delivered > 0 {
            tracing::trace!(observable = %self.id, delivered, "sent message");
        }
        delivered
    }

    /// Drop every cached computed value and start a new cache generation.
    pub(crate) fn reset_computed(&self) {
        let mut cache = self.computed.lock();
        cache.generation = cache.generation.wrapping_add(1);
        cache.values.clear();
    }

    /// The current cache generation. Take it before evaluating a getter and
    /// hand it back to [`store_computed`](Self::store_computed).
    pub(crate) fn cache_generation(&self) -> u64 {
        self.computed.lock().generation
    }

    /// Reset the computed cache, then notify observers.
    pub(crate) fn invalidate(&self) {
        self.reset_computed();
        self.notify_observers();
    }

    /// Look up a cached computed value of type `R`.
    ///
    /// A value cached under the same name with a different type counts as a
    /// miss.
    pub(crate) fn cached<R>(&self, name: &str) -> Option<R>
    where
        R: Clone + 'static,
    {
        self.computed
            .lock()
            .values
            .get(name)
            .and_then(|value| value.downcast_ref::<R>())
            .cloned()
    }

    /// Cache `value` unless the cache was reset since `generation` was
    /// taken. Returns whether the value was stored.
    pub(crate) fn store_computed<R>(&self, name: &'static str, value: R, generation: u64) -> bool
    where
        R: Send + Sync + 'static,
    {
        let mut cache = self.computed.lock();
        if cache.generation != generation {
            return false;
        }
        cache.values.insert(name, Box::new(value));
        true
    }
}

fn remove_listener(
    hub: &Weak<Hub>,
    id: ListenerId,
    remove: impl FnOnce(&Hub, ListenerId) -> bool,
) {
    if let Some(hub) = hub.upgrade() {
        if remove(&hub, id) {
            tracing::trace!(observable = %hub.id, ?id, "removed listener");
        }
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("id", &self.id)
            .field("observer_count", &self.observer_count())
            .field("subscriber_count", &self.subscriber_count())
            .field("dependency_count", &self.dependency_count())
            .field("cached_count", &self.cached_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn hub_ids_are_unique() {
        let a = Hub::new();
        let b = Hub::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn observer_disposer_removes_only_its_listener() {
        let hub = Hub::new();
        let calls = Arc::new(AtomicI32::new(0));

        let calls_clone = calls.clone();
        let first = hub.add_observer(Arc::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        let calls_clone = calls.clone();
        let _second = hub.add_observer(Arc::new(move || {
            calls_clone.fetch_add(10, Ordering::SeqCst);
        }));

        hub.notify_observers();
        assert_eq!(calls.load(Ordering::SeqCst), 11);

        first.dispose();
        first.dispose();
        hub.notify_observers();
        assert_eq!(calls.load(Ordering::SeqCst), 21);
        assert_eq!(hub.observer_count(), 1);
    }

    #[test]
    fn disposer_outliving_hub_is_harmless() {
        let hub = Hub::new();
        let disposer = hub.add_observer(Arc::new(|| {}));
        drop(hub);
        disposer.dispose();
    }

    #[test]
    fn computed_cache_round_trip() {
        let hub = Hub::new();
        assert_eq!(hub.cached::<i32>("total"), None);

        assert!(hub.store_computed("total", 42_i32, hub.cache_generation()));
        assert_eq!(hub.cached::<i32>("total"), Some(42));
        assert_eq!(hub.cached_count(), 1);

        // Wrong type is a miss, not a panic.
        assert_eq!(hub.cached::<String>("total"), None);

        hub.reset_computed();
        assert_eq!(hub.cached::<i32>("total"), None);
    }

    #[test]
    fn invalidate_resets_before_notifying() {
        let hub = Hub::new();
        hub.store_computed("total", 1_i32, hub.cache_generation());

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let weak = Arc::downgrade(&hub);
        let _disposer = hub.add_observer(Arc::new(move || {
            let hub = weak.upgrade().unwrap();
            *seen_clone.lock() = Some(hub.cached::<i32>("total"));
        }));

        hub.invalidate();
        assert_eq!(*seen.lock(), Some(None));
    }

    #[test]
    fn value_from_an_older_generation_is_not_stored() {
        let hub = Hub::new();
        let generation = hub.cache_generation();

        // A reset lands while the getter is still evaluating.
        hub.reset_computed();
        assert!(!hub.store_computed("total", 1_i32, generation));
        assert_eq!(hub.cached::<i32>("total"), None);

        assert!(hub.store_computed("total", 2_i32, hub.cache_generation()));
        assert_eq!(hub.cached::<i32>("total"), Some(2));
    }

    #[test]
    fn send_message_counts_deliveries() {
        let hub = Hub::new();
        assert_eq!(hub.send_message(&"nobody listens"), 0);

        let received = Arc::new(AtomicI32::new(0));
        let received_clone = received.clone();
        let _disposer = hub.add_subscriber(Arc::new(move |_: &(dyn Any + Send + Sync)| {
            received_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hub.send_message(&"hello"), 1);
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }
}
