//! Message channel.
//!
//! Besides observers, every instance carries an independent set of message
//! subscribers. Messages are point events that do not change state (a click,
//! a "game over" signal) so sending one neither clears the computed cache
//! nor wakes observers.
//!
//! Messages are typed: a subscriber registered for `M` only sees messages of
//! type `M`.

use std::any::Any;
use std::sync::Arc;

use super::disposer::Disposer;
use super::observable::Observable;

/// Register `callback` for messages of type `M` sent to `target`.
pub fn subscribe<T, M, F>(target: &Observable<T>, callback: F) -> Disposer
where
    M: Any + Send + Sync,
    F: Fn(&M) + Send + Sync + 'static,
{
    target
        .hub()
        .add_subscriber(Arc::new(move |message: &(dyn Any + Send + Sync)| {
            if let Some(message) = message.downcast_ref::<M>() {
                callback(message);
            }
        }))
}

/// Deliver `message` to every subscriber of `target` registered for `M`.
pub fn send<T, M>(target: &Observable<T>, message: M)
where
    M: Any + Send + Sync,
{
    target.hub().send_message(&message);
}
