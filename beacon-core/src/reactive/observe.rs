//! Observers
//!
//! Observers are zero-argument callbacks fired after every declared action
//! on an instance (and whenever something it tracks changes).
//!
//! # Throttling
//!
//! A throttled observer fires on the leading edge: the first notification
//! after a quiet period calls it straight away and opens a cooldown window.
//! Notifications inside the window are folded into a single pending flag.
//! When the window closes, a pending notification fires the listener once
//! more and opens a new window; otherwise the throttle goes quiet again.
//!
//! The window timer runs on the tokio runtime that was current when the
//! observer was registered. Disposing the observer aborts the timer, and no
//! trailing call happens after disposal.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use super::disposer::Disposer;
use super::hub::Hub;
use super::observable::Observable;
use crate::config::ObserveConfig;
use crate::error::{ReactiveError, Result};

/// Register `listener` to run after every notification of `target`.
pub fn observe<T, F>(target: &Observable<T>, listener: F) -> Disposer
where
    F: Fn() + Send + Sync + 'static,
{
    observe_hub(target.hub(), listener)
}

/// Register `listener` with at most one call per `interval` (plus one
/// trailing call for notifications that arrived during the window).
///
/// A zero `interval` registers a plain observer. Fails with
/// [`ReactiveError::NoRuntime`] outside a tokio runtime.
pub fn observe_throttled<T, F>(target: &Observable<T>, listener: F, interval: Duration) -> Result<Disposer>
where
    F: Fn() + Send + Sync + 'static,
{
    observe_hub_throttled(target.hub(), listener, interval)
}

pub(crate) fn observe_hub<F>(hub: &Arc<Hub>, listener: F) -> Disposer
where
    F: Fn() + Send + Sync + 'static,
{
    hub.add_observer(Arc::new(listener))
}

pub(crate) fn observe_hub_throttled<F>(hub: &Arc<Hub>, listener: F, interval: Duration) -> Result<Disposer>
where
    F: Fn() + Send + Sync + 'static,
{
    if interval.is_zero() {
        return Ok(observe_hub(hub, listener));
    }
    let runtime = Handle::try_current().map_err(|_| ReactiveError::NoRuntime)?;

    let throttle = Arc::new(Throttle {
        interval,
        runtime,
        listener: Box::new(listener),
        state: Mutex::new(ThrottleState::default()),
    });

    let on_notify = Arc::clone(&throttle);
    let registration = hub.add_observer(Arc::new(move || on_notify.on_notify()));

    Ok(Disposer::new(move || {
        registration.dispose();
        throttle.dispose();
    }))
}

/// Register `listener` the way `config` describes.
pub fn observe_with<T, F>(target: &Observable<T>, listener: F, config: &ObserveConfig) -> Result<Disposer>
where
    F: Fn() + Send + Sync + 'static,
{
    match config.interval() {
        Some(interval) => observe_throttled(target, listener, interval),
        None => Ok(observe(target, listener)),
    }
}

/// Notify the observers of `target` without touching its computed cache.
pub fn notify<T>(target: &Observable<T>) {
    target.notify();
}

/// Reset the computed cache of `target` and notify its observers.
pub fn invalidate<T>(target: &Observable<T>) {
    target.invalidate();
}

#[derive(Default)]
struct ThrottleState {
    cooling: bool,
    pending: bool,
    disposed: bool,
    timer: Option<AbortHandle>,
}

struct Throttle {
    interval: Duration,
    runtime: Handle,
    listener: Box<dyn Fn() + Send + Sync>,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    fn on_notify(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            if state.cooling {
                state.pending = true;
                return;
            }
            state.cooling = true;
        }
        // Open the window before calling out, so a panicking listener
        // cannot leave the throttle stuck in cooldown.
        self.start_window();
        (self.listener)();
    }

    fn start_window(self: &Arc<Self>) {
        let throttle = Arc::downgrade(self);
        let interval = self.interval;
        let task = self.runtime.spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !Throttle::close_window(&throttle) {
                    return;
                }
            }
        });

        let mut state = self.state.lock();
        if state.disposed {
            task.abort();
        } else {
            state.timer = Some(task.abort_handle());
        }
    }

    /// Called when a window elapses. Returns `true` if a trailing call fired
    /// and a new window has started.
    fn close_window(throttle: &Weak<Self>) -> bool {
        let Some(throttle) = throttle.upgrade() else {
            return false;
        };
        {
            let mut state = throttle.state.lock();
            if state.disposed {
                return false;
            }
            if !state.pending {
                state.cooling = false;
                state.timer = None;
                return false;
            }
            state.pending = false;
        }
        (throttle.listener)();
        true
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.pending = false;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
