//! Disposers.
//!
//! Every operation that creates a registration (observe, subscribe, track,
//! reaction) returns a [`Disposer`]. Calling it is the only way to cancel the
//! registration. The runtime never disposes anything on its own, and
//! dropping a disposer leaves the registration in place.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

type Teardown = Box<dyn FnOnce() + Send>;

/// An idempotent cancellation handle.
///
/// Clones share the same teardown: whichever clone is disposed first runs
/// it, every later call on any clone is a no-op.
#[derive(Clone)]
pub struct Disposer {
    teardown: Arc<Mutex<Option<Teardown>>>,
}

impl Disposer {
    /// Create a disposer that runs `teardown` on its first call.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Arc::new(Mutex::new(Some(Box::new(teardown)))),
        }
    }

    /// A disposer with nothing to tear down.
    pub fn noop() -> Self {
        Self {
            teardown: Arc::new(Mutex::new(None)),
        }
    }

    /// A disposer that disposes every disposer in `parts`, in order.
    pub fn all<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Disposer>,
    {
        let parts: SmallVec<[Disposer; 2]> = parts.into_iter().collect();
        Self::new(move || {
            for part in parts {
                part.dispose();
            }
        })
    }

    /// Run the teardown if it has not run yet.
    pub fn dispose(&self) {
        // Take it out first so the teardown runs without the lock held.
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether the teardown has already run (or there never was one).
    pub fn is_disposed(&self) -> bool {
        self.teardown.lock().is_none()
    }

    /// Whether two disposers are clones of the same handle.
    pub fn same_as(&self, other: &Disposer) -> bool {
        Arc::ptr_eq(&self.teardown, &other.teardown)
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
