//! Error types for the Beacon runtime.
//!
//! Almost everything in the runtime is permissive by design: declaring a
//! name that is never used, tracking a dead instance or disposing twice are
//! all silent. The errors below cover the few calls that cannot do anything
//! sensible with their input.

use thiserror::Error;

/// Errors returned by subscription-creating operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A throttled subscription needs a tokio runtime to schedule its
    /// trailing-edge timer, and none was running on the calling thread.
    #[error("throttled observers require a running tokio runtime")]
    NoRuntime,

    /// A reaction was asked to watch an empty list of targets.
    #[error("a reaction needs at least one target")]
    EmptyTargets,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
