//! Observer configuration.
//!
//! Consumers that wire observers from declarative configuration (for
//! example a component describing which of its fields to watch) can
//! deserialize an [`ObserveConfig`] and hand it to
//! [`observe_with`](crate::reactive::observe_with).

use std::time::Duration;

use serde::Deserialize;

/// How an observer should be attached.
///
/// ```rust,ignore
/// let config: ObserveConfig = serde_json::from_str(r#"{ "throttle_ms": 500 }"#)?;
/// let disposer = observe_with(&user, move || view.request_update(), &config)?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObserveConfig {
    /// Minimum time between two listener calls, in milliseconds.
    /// `None` and `Some(0)` both mean "call on every notification".
    pub throttle_ms: Option<u64>,
}

impl ObserveConfig {
    /// An unthrottled configuration.
    pub fn immediate() -> Self {
        Self { throttle_ms: None }
    }

    /// A configuration throttled to one call per `interval`.
    pub fn throttled(interval: Duration) -> Self {
        Self {
            throttle_ms: Some(interval.as_millis().min(u64::MAX as u128) as u64),
        }
    }

    /// The throttle window, if any.
    pub fn interval(&self) -> Option<Duration> {
        match self.throttle_ms {
            None | Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        }
    }
}
