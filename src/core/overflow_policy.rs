//! Overflow policies for the export queue
//!
//! The export queue is bounded. When it is full, the policy decides which
//! record gives way. `enqueue` never returns an error either way; drops are
//! counted in the pipeline metrics and reported through diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Policy for handling a full export queue
///
/// # Example
///
/// ```
/// use otlp_log_emitter::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: evict the oldest queued record
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropOldest);
///
/// // Wait briefly for space, then drop the new record
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to make room for the new one
    #[default]
    DropOldest,

    /// Drop the incoming record
    DropNewest,

    /// Wait up to the given duration for space, then drop the incoming record
    BlockWithTimeout(#[serde(with = "crate::export::config::duration_millis")] Duration),
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
        }
    }
}
