//! Observable Primitives
//!
//! This module implements the observable runtime: instrumented instances,
//! observers, the message channel and reactions. Cross-object tracking lives
//! in [`crate::graph`].
//!
//! # Concepts
//!
//! ## Observables
//!
//! An [`Observable`] wraps a plain domain value. Its class declares which
//! operations are *actions* (they notify observers and drop cached values)
//! and which getters are *computed* (cached until the next action).
//!
//! ## Observers
//!
//! An observer is a zero-argument callback registered with [`observe`]. It
//! runs synchronously after every action, optionally throttled.
//!
//! ## Messages
//!
//! [`subscribe`] and [`send`] form a second, independent channel for point
//! events that do not change state.
//!
//! ## Reactions
//!
//! A [`reaction`] runs a selector after each notification and an effect only
//! when the selected values changed.
//!
//! # Implementation Notes
//!
//! Nothing here records which fields a getter reads. Dependencies are
//! declared: the action list, the computed list, and explicit tracking
//! links. Every registration returns a [`Disposer`], and nothing is ever
//! disposed automatically.

mod channel;
mod class;
mod disposer;
mod hub;
mod listener;
mod observable;
mod observe;
mod reaction;

pub use channel::{send, subscribe};
pub use class::{instrument, Class, Declarations, Model};
pub use disposer::Disposer;
pub use hub::{Hub, ObservableId};
pub use listener::ListenerId;
pub use observable::{Observable, WeakObservable};
pub use observe::{invalidate, notify, observe, observe_throttled, observe_with};
pub use reaction::{reaction, reaction_throttled, ReactionTargets, Selection, Value};
