//! Observable Instances
//!
//! An [`Observable`] wraps a domain value together with the runtime's
//! bookkeeping for it. Handles are cheap to clone; every clone refers to the
//! same instance.
//!
//! # Actions
//!
//! Mutations go through [`Observable::action`] and friends. Each call names
//! the operation it performs. If the name is a declared action of the class,
//! the call settles in two phases once the operation has finished:
//!
//! 1. The computed cache is cleared while the value's write lock is still
//!    held.
//! 2. Observers are notified, after every lock has been released.
//!
//! Asynchronous actions run the same settle step after their work completes,
//! and fallible actions only settle on success.
//!
//! # Computed Properties
//!
//! [`Observable::computed`] evaluates a getter and, for declared names,
//! caches the result until the next action. Cached values are cloned out, so
//! an `Arc` result keeps its identity across reads.
//!
//! Every reset starts a new cache generation. A getter result is stored only
//! if no reset happened while it was being evaluated, whether the reset came
//! from an action on this instance or from a tracked source on another
//! thread. A result evaluated from stale state is returned but never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! let cart = Class::<Cart>::of().create(Cart::default());
//!
//! let disposer = observe(&cart, || println!("cart changed"));
//! cart.action("add_item", |cart| cart.items.push(item)); // prints
//! let total = cart.computed("total", |cart| cart.items.iter().map(|i| i.price).sum::<u64>());
//! disposer.dispose();
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Serialize, Serializer};

use super::class::{class_entry, ClassEntry, Model};
use super::hub::{Hub, ObservableId};

struct Instance<T> {
    hub: Arc<Hub>,
    class: Arc<ClassEntry>,
    value: RwLock<T>,
}

/// A domain value instrumented with observers and a computed cache.
pub struct Observable<T> {
    inner: Arc<Instance<T>>,
}

impl<T: Model> Observable<T> {
    /// Wrap `value` using the current declarations of `T`.
    pub fn new(value: T) -> Self {
        Self::with_class(value, class_entry::<T>())
    }

    pub(crate) fn with_class(value: T, class: Arc<ClassEntry>) -> Self {
        Self {
            inner: Arc::new(Instance {
                hub: Hub::new(),
                class,
                value: RwLock::new(value),
            }),
        }
    }
}

impl<T> Observable<T> {
    /// The instance's identity.
    pub fn id(&self) -> ObservableId {
        self.inner.hub.id()
    }

    /// The instance's bookkeeping.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.inner.hub
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the instance alive.
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            id: self.id(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Read the domain value. No caching, no tracking.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Mutate the domain value without invalidating or notifying.
    ///
    /// This is what an undeclared operation does; asynchronous actions use
    /// it for their intermediate steps.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut *self.inner.value.write())
    }

    /// Run the operation `name`.
    ///
    /// If `name` is a declared action, the computed cache is cleared and
    /// observers are notified after `f` returns. The output of `f` is passed
    /// through unchanged.
    pub fn action<R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> R {
        let instrumented = self.is_action(name);
        let output = {
            let mut value = self.inner.value.write();
            let output = f(&mut *value);
            if instrumented {
                self.inner.hub.reset_computed();
            }
            output
        };
        if instrumented {
            self.inner.hub.notify_observers();
        }
        output
    }

    /// Run a fallible operation. Only `Ok` settles the action; an `Err`
    /// leaves the cache and observers untouched and is returned as-is.
    pub fn try_action<R, E>(
        &self,
        name: &str,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E> {
        let instrumented = self.is_action(name);
        let output = {
            let mut value = self.inner.value.write();
            let output = f(&mut *value);
            if instrumented && output.is_ok() {
                self.inner.hub.reset_computed();
            }
            output
        };
        if instrumented && output.is_ok() {
            self.inner.hub.notify_observers();
        }
        output
    }

    /// Run an asynchronous operation. Nothing is invalidated or notified
    /// until `work` completes.
    ///
    /// `work` should mutate through a clone of this handle (for example with
    /// [`with_mut`](Self::with_mut)); no lock is held while it is pending.
    pub async fn action_async<Fut>(&self, name: &str, work: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let output = work.await;
        if self.is_action(name) {
            self.settle();
        }
        output
    }

    /// Run a fallible asynchronous operation. Only `Ok` settles the action.
    pub async fn try_action_async<Fut, R, E>(&self, name: &str, work: Fut) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
    {
        let output = work.await;
        if output.is_ok() && self.is_action(name) {
            self.settle();
        }
        output
    }

    /// Evaluate the getter `name`.
    ///
    /// Declared computed properties are served from the cache when possible;
    /// on a miss `getter` runs and its result is cached. Undeclared names run
    /// `getter` on every call.
    pub fn computed<R>(&self, name: &str, getter: impl FnOnce(&T) -> R) -> R
    where
        R: Clone + Send + Sync + 'static,
    {
        let Some(key) = self.inner.class.computed_key(name) else {
            return self.read(getter);
        };
        if let Some(cached) = self.inner.hub.cached::<R>(key) {
            return cached;
        }

        tracing::trace!(observable = %self.id(), property = key, "computing");
        // A reset between here and the store (an action on this instance or
        // on a tracked source) makes the store a no-op.
        let generation = self.inner.hub.cache_generation();
        let result = self.read(getter);
        if !self.inner.hub.store_computed(key, result.clone(), generation) {
            tracing::trace!(observable = %self.id(), property = key, "invalidated during evaluation, not cached");
        }
        result
    }

    /// Reset the computed cache and notify observers, exactly as a declared
    /// action does when it finishes.
    pub fn invalidate(&self) {
        self.settle();
    }

    /// Notify observers without touching the computed cache.
    pub fn notify(&self) {
        self.inner.hub.notify_observers();
    }

    fn is_action(&self, name: &str) -> bool {
        let declared = self.inner.class.is_action(name);
        if !declared {
            tracing::trace!(observable = %self.id(), operation = name, "undeclared operation, not notifying");
        }
        declared
    }

    fn settle(&self) {
        {
            let _value = self.inner.value.write();
            self.inner.hub.reset_computed();
        }
        self.inner.hub.notify_observers();
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.id())
            .field("value", &*self.inner.value.read())
            .field("observer_count", &self.inner.hub.observer_count())
            .finish()
    }
}

/// Only the domain value is serialized; observers, caches and links are
/// runtime state.
impl<T: Serialize> Serialize for Observable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.value.read().serialize(serializer)
    }
}

/// A non-owning handle to an [`Observable`].
///
/// It remembers the instance's id even after the instance is gone, so a
/// dependency on a dead source can still be untracked.
pub struct WeakObservable<T> {
    id: ObservableId,
    inner: Weak<Instance<T>>,
}

impl<T> WeakObservable<T> {
    pub fn id(&self) -> ObservableId {
        self.id
    }

    /// Recover a strong handle if the instance is still alive.
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObservable")
            .field("id", &self.id)
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
