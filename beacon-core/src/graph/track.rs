//! Tracking
//!
//! `track(target, source)` makes `target` behave as if it had run an action
//! whenever `source` notifies: the target's computed cache is cleared and
//! its observers are called. This is how a composite object whose getters
//! read another object's state stays coherent with it.
//!
//! # Rules
//!
//! - At most one link per (target, source) pair. Tracking a pair again
//!   disposes the previous link first.
//! - Attaching and detaching both invalidate the target once, so it
//!   immediately reflects the new arrangement.
//! - The listener installed on the source holds the target weakly; a source
//!   never keeps a dropped target alive.
//! - Calls involving something that is not a live observable do nothing.

use std::sync::Arc;

use crate::reactive::{Disposer, Hub, Observable, ObservableId, WeakObservable};

/// Anything that may stand for an observable instance.
///
/// Tracking accepts strong handles, weak handles, optional handles and
/// references to any of them, and quietly ignores the ones that do not (or
/// no longer) resolve to a live instance.
pub trait Trackable {
    /// The live instance's bookkeeping, if there is one.
    fn tracking_hub(&self) -> Option<Arc<Hub>>;

    /// The identity to key dependency links by. Defaults to the live hub's
    /// id; weak handles remember it even after the instance is gone.
    fn tracking_id(&self) -> Option<ObservableId> {
        self.tracking_hub().map(|hub| hub.id())
    }
}

impl<T> Trackable for Observable<T> {
    fn tracking_hub(&self) -> Option<Arc<Hub>> {
        Some(Arc::clone(self.hub()))
    }
}

impl<T> Trackable for WeakObservable<T> {
    fn tracking_hub(&self) -> Option<Arc<Hub>> {
        self.upgrade().map(|observable| Arc::clone(observable.hub()))
    }

    fn tracking_id(&self) -> Option<ObservableId> {
        Some(self.id())
    }
}

impl<X: Trackable> Trackable for Option<X> {
    fn tracking_hub(&self) -> Option<Arc<Hub>> {
        self.as_ref().and_then(Trackable::tracking_hub)
    }

    fn tracking_id(&self) -> Option<ObservableId> {
        self.as_ref().and_then(Trackable::tracking_id)
    }
}

impl<X: Trackable + ?Sized> Trackable for &X {
    fn tracking_hub(&self) -> Option<Arc<Hub>> {
        (**self).tracking_hub()
    }

    fn tracking_id(&self) -> Option<ObservableId> {
        (**self).tracking_id()
    }
}

/// Make `target` follow `source`.
///
/// Returns a disposer that detaches this particular link. If the pair has
/// been re-tracked since, the disposer only removes its own stale listener.
pub fn track(target: &impl Trackable, source: &impl Trackable) -> Disposer {
    let (Some(target), Some(source)) = (target.tracking_hub(), source.tracking_hub()) else {
        tracing::debug!("track ignored: target or source is not a live observable");
        return Disposer::noop();
    };
    if Arc::ptr_eq(&target, &source) {
        tracing::debug!(observable = %target.id(), "track ignored: an instance cannot track itself");
        return Disposer::noop();
    }

    let source_id = source.id();
    if let Some(previous) = target.dependencies.remove(source_id) {
        tracing::debug!(observable = %target.id(), source = %source_id, "replacing existing link");
        previous.dispose();
    }

    let follower = Arc::downgrade(&target);
    let link = source.add_observer(Arc::new(move || {
        if let Some(target) = follower.upgrade() {
            target.invalidate();
        }
    }));
    if let Some(raced) = target.dependencies.insert(source_id, link.clone()) {
        raced.dispose();
    }
    tracing::debug!(observable = %target.id(), source = %source_id, "tracking");

    target.invalidate();

    let follower = Arc::downgrade(&target);
    Disposer::new(move || match follower.upgrade() {
        Some(target) if target.dependencies.remove_if_same(source_id, &link) => {
            link.dispose();
            tracing::debug!(observable = %target.id(), source = %source_id, "link disposed");
            target.invalidate();
        }
        _ => link.dispose(),
    })
}

/// Stop `target` from following `source`. Does nothing if it was not.
pub fn untrack(target: &impl Trackable, source: &impl Trackable) {
    let (Some(target), Some(source_id)) = (target.tracking_hub(), source.tracking_id()) else {
        tracing::debug!("untrack ignored: target or source is not an observable");
        return;
    };
    let Some(link) = target.dependencies.remove(source_id) else {
        return;
    };
    link.dispose();
    tracing::debug!(observable = %target.id(), source = %source_id, "untracked");
    target.invalidate();
}

/// Drop every link `target` holds. The target is invalidated once if
/// anything was removed.
pub fn untrack_all(target: &impl Trackable) {
    let Some(target) = target.tracking_hub() else {
        return;
    };
    let links = target.dependencies.drain();
    if links.is_empty() {
        return;
    }
    for (_, link) in &links {
        link.dispose();
    }
    tracing::debug!(observable = %target.id(), removed = links.len(), "untracked all sources");
    target.invalidate();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
