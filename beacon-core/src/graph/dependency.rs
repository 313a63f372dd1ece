//! Dependency Map
//!
//! Each instance records the sources it tracks, keyed by the source's
//! [`ObservableId`]. The value is the disposer of the listener installed on
//! the source. Keeping at most one entry per source is what makes
//! re-tracking replace a link instead of stacking a second one.

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::reactive::{Disposer, ObservableId};

/// Links from one target to the sources it tracks.
pub(crate) struct DependencyMap {
    links: Mutex<IndexMap<ObservableId, Disposer>>,
}

impl DependencyMap {
    pub(crate) fn new() -> Self {
        Self {
            links: Mutex::new(IndexMap::new()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, source: ObservableId) -> bool {
        self.links.lock().contains_key(&source)
    }

    /// Record the link to `source`, returning the one it replaces.
    pub(crate) fn insert(&self, source: ObservableId, link: Disposer) -> Option<Disposer> {
        self.links.lock().insert(source, link)
    }

    pub(crate) fn remove(&self, source: ObservableId) -> Option<Disposer> {
        self.links.lock().shift_remove(&source)
    }

    /// Remove the entry for `source` only if it is still `link`.
    pub(crate) fn remove_if_same(&self, source: ObservableId, link: &Disposer) -> bool {
        let mut links = self.links.lock();
        match links.get(&source) {
            Some(current) if current.same_as(link) => {
                links.shift_remove(&source);
                true
            }
            _ => false,
        }
    }

    /// Remove every link, in the order they were made.
    pub(crate) fn drain(&self) -> Vec<(ObservableId, Disposer)> {
        self.links.lock().drain(..).collect()
    }
}
