//! Export pipeline metrics for observability
//!
//! Counters for queue admission, delivery, and loss. They are the numeric
//! side of the diagnostics channel: every dropped or undeliverable record
//! shows up here even when the diagnostics handler ignores it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for export pipeline observability
///
/// # Example
///
/// ```
/// use otlp_log_emitter::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
///
/// metrics.record_enqueued();
/// metrics.record_exported(1);
///
/// assert_eq!(metrics.enqueued_count(), 1);
/// assert_eq!(metrics.exported_count(), 1);
/// assert_eq!(metrics.dropped_count(), 0);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Records accepted into the queue
    enqueued: AtomicU64,

    /// Records acknowledged by the collector
    exported: AtomicU64,

    /// Records lost to overflow, delivery failure, or shutdown timeout
    dropped: AtomicU64,

    /// Batches delivered successfully
    batches_exported: AtomicU64,

    /// Batches that could not be delivered
    batches_failed: AtomicU64,

    /// Number of times the queue was found full
    queue_full_events: AtomicU64,

    /// Number of times an enqueue waited for queue space
    block_events: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            exported: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            batches_exported: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn exported_count(&self) -> u64 {
        self.exported.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_exported(&self) -> u64 {
        self.batches_exported.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Record an accepted record
    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a delivered batch of `count` records
    #[inline]
    pub fn record_exported(&self, count: usize) {
        self.exported.fetch_add(count as u64, Ordering::Relaxed);
        self.batches_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an undeliverable batch of `count` records
    #[inline]
    pub fn record_failed(&self, count: usize) {
        self.dropped.fetch_add(count as u64, Ordering::Relaxed);
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record dropped records, returning the previous total
    #[inline]
    pub fn record_dropped(&self, count: usize) -> u64 {
        self.dropped.fetch_add(count as u64, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been delivered or dropped yet.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.exported_count() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued_count()),
            exported: AtomicU64::new(self.exported_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            batches_exported: AtomicU64::new(self.batches_exported()),
            batches_failed: AtomicU64::new(self.batches_failed()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}
