//! Beacon Core
//!
//! This crate provides the core runtime for the Beacon observable state
//! manager. It implements:
//!
//! - Observable instances with declared actions and cached computed values
//! - Observers, throttled observers and a separate message channel
//! - Explicit cross-object dependency links (track / untrack)
//! - Reactions that fire only when a selected tuple of values changes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Observable instances, observers, messages and reactions
//! - `graph`: Dependency links between observable instances
//! - `config`: Declarative observer configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_core::{observe, reaction, Model, Observable, Value};
//!
//! #[derive(Default)]
//! struct Counter { count: i64 }
//!
//! impl Model for Counter {
//!     const OBSERVABLE_ACTIONS: &'static [&'static str] = &["increment"];
//!     const COMPUTED_PROPERTIES: &'static [&'static str] = &["doubled"];
//! }
//!
//! let counter = Observable::new(Counter::default());
//!
//! // Observe every action
//! let stop = observe(&counter, || println!("changed"));
//!
//! // React only to multiples of five
//! let stop_reaction = reaction(
//!     counter.clone(),
//!     |c: &Observable<Counter>| {
//!         let n = c.read(|c| c.count);
//!         if n % 5 == 0 { vec![Value::from(n)] } else { vec![] }
//!     },
//!     |values: &[Value]| println!("hit {:?}", values),
//! )?;
//!
//! counter.action("increment", |c| c.count += 1);
//! // Prints: "changed"
//!
//! let doubled = counter.computed("doubled", |c| c.count * 2);
//!
//! stop.dispose();
//! stop_reaction.dispose();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::ObserveConfig;
pub use error::{ReactiveError, Result};
pub use graph::{track, untrack, untrack_all, Trackable};
pub use reactive::{
    instrument, invalidate, notify, observe, observe_throttled, observe_with, reaction,
    reaction_throttled, send, subscribe, Class, Declarations, Disposer, Hub, Model, Observable,
    ObservableId, ReactionTargets, Selection, Value, WeakObservable,
};
