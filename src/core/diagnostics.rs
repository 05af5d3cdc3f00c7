//! Internal diagnostics channel
//!
//! Failures that must not reach the caller of `emit` (delivery errors,
//! dropped records, local sink failures) are reported here instead of being
//! swallowed. Diagnostics never travel through the export pipeline they
//! describe.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// An internal pipeline event worth reporting
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A batch could not be delivered to the collector
    DeliveryFailed {
        records: usize,
        attempts: u32,
        error: String,
    },

    /// Records were dropped before delivery
    ///
    /// `count` is this occurrence, `total` every drop so far.
    RecordsDropped {
        count: usize,
        total: u64,
        reason: DropReason,
    },

    /// The worker did not drain the queue before the shutdown deadline
    ShutdownTimedOut { pending: usize, timeout: Duration },

    /// A local sink failed to accept a record
    SinkFailed { sink: String, error: String },

    /// A fresh access token was installed on the export transport
    TokenRefreshed,
}

/// Why records were dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Evicted from a full queue to make room for a newer record
    QueueFullOldest,
    /// Rejected because the queue was full
    QueueFullNewest,
    /// The pipeline was already shut down
    PipelineClosed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::QueueFullOldest => write!(f, "queue full, oldest record evicted"),
            DropReason::QueueFullNewest => write!(f, "queue full, new record rejected"),
            DropReason::PipelineClosed => write!(f, "pipeline closed"),
        }
    }
}

impl Diagnostic {
    /// `true` for events that indicate lost records
    pub fn is_error(&self) -> bool {
        !matches!(self, Diagnostic::TokenRefreshed)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DeliveryFailed {
                records,
                attempts,
                error,
            } => write!(
                f,
                "Failed to export {} records after {} attempt(s): {}",
                records, attempts, error
            ),
            Diagnostic::RecordsDropped {
                count,
                total,
                reason,
            } => write!(
                f,
                "{} records dropped ({}), {} dropped in total",
                count, reason, total
            ),
            Diagnostic::ShutdownTimedOut { pending, timeout } => write!(
                f,
                "Export worker did not finish within {:?}, {} unsent records lost",
                timeout, pending
            ),
            Diagnostic::SinkFailed { sink, error } => {
                write!(f, "Local sink '{}' failed: {}", sink, error)
            }
            Diagnostic::TokenRefreshed => write!(f, "Access token refreshed"),
        }
    }
}

/// Callback receiving pipeline diagnostics
pub type DiagnosticsHandler = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Destination for diagnostics; defaults to stderr
#[derive(Clone, Default)]
pub struct Diagnostics {
    handler: Option<DiagnosticsHandler>,
}

impl Diagnostics {
    /// Report to stderr
    pub fn stderr() -> Self {
        Self { handler: None }
    }

    /// Report to a custom handler
    pub fn with_handler(handler: DiagnosticsHandler) -> Self {
        Self {
            handler: Some(handler),
        }
    }

    /// Discard every diagnostic
    pub fn silent() -> Self {
        Self {
            handler: Some(Arc::new(|_| {})),
        }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match self.handler {
            Some(ref handler) => handler(&diagnostic),
            None if diagnostic.is_error() => eprintln!("[EXPORTER ERROR] {}", diagnostic),
            None => eprintln!("[EXPORTER INFO] {}", diagnostic),
        }
    }

    /// Report a drop, throttled to the first and every 1000th occurrence.
    ///
    /// `previous_total` is the dropped count before this drop.
    pub fn report_drop(&self, previous_total: u64, count: usize, reason: DropReason) {
        let total = previous_total + count as u64;
        let crossed_thousand = previous_total / 1000 != total / 1000;
        if previous_total == 0 || crossed_thousand {
            self.report(Diagnostic::RecordsDropped {
                count,
                total,
                reason,
            });
        }
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}
