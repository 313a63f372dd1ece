//! Listener registries.
//!
//! Every observable instance keeps two of these: one for zero-argument
//! observers and one for message subscribers. Both need the same things:
//! cheap insertion, removal by handle, and a broadcast that tolerates
//! listeners adding or removing other listeners while it runs.
//!
//! # Broadcast Semantics
//!
//! A broadcast takes a snapshot of the registered listeners and releases the
//! lock before calling any of them. Before each call it re-checks that the
//! listener is still registered, so a listener removed by an earlier one in
//! the same broadcast is skipped. Listeners added during a broadcast are not
//! part of the snapshot and first fire on the next broadcast.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

/// Unique identifier for a registered listener.
///
/// Ids are never reused, so a stale id can never remove a listener that was
/// registered later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a listener set, taken at the start of a broadcast.
type Snapshot<F> = SmallVec<[(ListenerId, Arc<F>); 4]>;

/// An insertion-ordered set of listeners of type `F`.
pub(crate) struct ListenerSet<F: ?Sized> {
    entries: Mutex<IndexMap<ListenerId, Arc<F>>>,
}

impl<F: ?Sized> ListenerSet<F> {
    /// Create an empty set. Does not allocate.
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Register a listener and return its handle.
    pub(crate) fn insert(&self, listener: Arc<F>) -> ListenerId {
        let id = ListenerId::new();
        self.entries.lock().insert(id, listener);
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        // Dropped after the lock is released: a listener may own the last
        // handle to something that touches this set when it drops.
        let removed = self.entries.lock().shift_remove(&id);
        removed.is_some()
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Call `invoke` once for every listener registered when the broadcast
    /// starts and still registered when its turn comes.
    ///
    /// Returns the number of listeners invoked.
    pub(crate) fn broadcast(&self, mut invoke: impl FnMut(&F)) -> usize {
        let snapshot: Snapshot<F> = {
            let entries = self.entries.lock();
            if entries.is_empty() {
                return 0;
            }
            entries
                .iter()
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect()
        };

        let mut invoked = 0;
        for (id, listener) in snapshot {
            if !self.contains(id) {
                continue;
            }
            invoke(&listener);
            invoked += 1;
        }
        invoked
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    type Listener = dyn Fn() + Send + Sync;

    fn counter_listener(count: &Arc<AtomicI32>) -> Arc<Listener> {
        let count_clone = count.clone();
        Arc::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn listener_ids_are_unique() {
        let id1 = ListenerId::new();
        let id2 = ListenerId::new();
        let id3 = ListenerId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn broadcast_calls_every_listener_once() {
        let set: ListenerSet<Listener> = ListenerSet::new();
        let count = Arc::new(AtomicI32::new(0));

        set.insert(counter_listener(&count));
        set.insert(counter_listener(&count));

        assert_eq!(set.broadcast(|listener| listener()), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let set: ListenerSet<Listener> = ListenerSet::new();
        let count = Arc::new(AtomicI32::new(0));

        let id = set.insert(counter_listener(&count));
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());

        set.broadcast(|listener| listener());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_broadcast_invokes_nothing() {
        let set: ListenerSet<Listener> = ListenerSet::new();
        assert_eq!(set.broadcast(|listener| listener()), 0);
    }

    #[test]
    fn listener_removed_mid_broadcast_does_not_fire() {
        let set: Arc<ListenerSet<Listener>> = Arc::new(ListenerSet::new());
        let count = Arc::new(AtomicI32::new(0));
        let victim = Arc::new(Mutex::new(None::<ListenerId>));

        // The first listener removes the second before it gets its turn.
        let set_clone = set.clone();
        let victim_clone = victim.clone();
        set.insert(Arc::new(move || {
            if let Some(id) = *victim_clone.lock() {
                set_clone.remove(id);
            }
        }));
        let id = set.insert(counter_listener(&count));
        *victim.lock() = Some(id);

        assert_eq!(set.broadcast(|listener| listener()), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn listener_added_mid_broadcast_fires_next_time() {
        let set: Arc<ListenerSet<Listener>> = Arc::new(ListenerSet::new());
        let count = Arc::new(AtomicI32::new(0));
        let added = Arc::new(AtomicI32::new(0));

        let set_clone = set.clone();
        let count_clone = count.clone();
        let added_clone = added.clone();
        set.insert(Arc::new(move || {
            if added_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                set_clone.insert(counter_listener(&count_clone));
            }
        }));

        set.broadcast(|listener| listener());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        set.broadcast(|listener| listener());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
