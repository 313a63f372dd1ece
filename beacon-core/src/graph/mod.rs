//! Dependency Graph
//!
//! Observable instances form a loose graph through explicit tracking links:
//! an edge from a source to a target means "when the source notifies, the
//! target's derived state is stale". Unlike an automatic dependency tracker,
//! nothing here is inferred from what a getter reads; collaborators add and
//! remove edges themselves with [`track`] and [`untrack`].
//!
//! # Design Decisions
//!
//! 1. Edges are stored on the target, keyed by the source's stable id, so a
//!    target can find and remove a link without holding the source.
//!
//! 2. The listener on the source side holds the target weakly. Links left
//!    behind by a dropped target are inert; links whose source is gone can
//!    still be removed through a [`WeakObservable`](crate::reactive::WeakObservable).
//!
//! 3. There is no cycle detection beyond refusing self-links. Two instances
//!    tracking each other will notify each other forever.

mod dependency;
mod track;

pub(crate) use dependency::DependencyMap;
pub use track::{track, untrack, untrack_all, Trackable};
