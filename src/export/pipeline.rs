//! Batched, asynchronous export pipeline
//!
//! Callers hand records to [`ExportPipeline::enqueue`], which only touches a
//! bounded in-memory queue. A dedicated worker thread owns the transport and
//! exports a batch when it reaches `max_batch_size` records or when
//! `max_delay` has passed since the first record of the batch arrived,
//! whichever comes first.

use super::config::{BatchConfig, ExportConfig, RetryConfig};
use super::transport::{ExportRequest, LogTransport};
use crate::auth::Credential;
use crate::core::diagnostics::panic_message;
use crate::core::{
    Diagnostic, Diagnostics, DropReason, EmitterError, LogRecord, OverflowPolicy, PipelineMetrics,
    Result,
};
use crossbeam_channel::{
    bounded, never, select, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender,
    TrySendError,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Evictions attempted before a `DropOldest` enqueue gives up and drops the new record
const MAX_EVICTION_ROUNDS: usize = 8;

enum Control {
    Flush(Sender<()>),
}

/// Bearer token in force, with its expiry when known
#[derive(Debug, Clone)]
struct BearerToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Records the worker has taken off the queue but not yet settled
#[derive(Debug, Default)]
struct Held {
    records: usize,
    /// Set when shutdown gave up on the worker; everything held was counted as dropped
    abandoned: bool,
}

/// Owns one transport, one bounded queue, and one worker thread.
#[derive(Debug)]
pub struct ExportPipeline {
    records: RwLock<Option<Sender<LogRecord>>>,
    control: Mutex<Option<Sender<Control>>>,
    /// Receiving end kept for `DropOldest` eviction and shutdown accounting
    evictor: Receiver<LogRecord>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    held: Arc<Mutex<Held>>,
    token: Arc<RwLock<Option<BearerToken>>>,
    metrics: Arc<PipelineMetrics>,
    diagnostics: Diagnostics,
    overflow_policy: OverflowPolicy,
    shutdown_timeout: Duration,
    transport_name: String,
}

impl ExportPipeline {
    /// Validate `config` and start the worker thread around `transport`.
    ///
    /// The endpoint host is not resolved here; that is the transport's job.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::PipelineConstruction`] for an invalid
    /// configuration or when the worker thread cannot be spawned.
    pub fn start(
        config: &ExportConfig,
        transport: Box<dyn LogTransport>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        config.validate_settings()?;

        let (record_tx, record_rx) = bounded(config.batch.max_queue_size);
        let (control_tx, control_rx) = unbounded();
        let token = Arc::new(RwLock::new(None));
        let metrics = Arc::new(PipelineMetrics::new());
        let held = Arc::new(Mutex::new(Held::default()));
        let transport_name = transport.name().to_string();

        let worker = Worker {
            transport,
            held: Arc::clone(&held),
            token: Arc::clone(&token),
            metrics: Arc::clone(&metrics),
            diagnostics: diagnostics.clone(),
            batch: config.batch.clone(),
            retry: config.retry.clone(),
            buffer: Vec::with_capacity(config.batch.max_batch_size),
        };
        let worker_rx = record_rx.clone();
        let handle = thread::Builder::new()
            .name("otlp-export".to_string())
            .spawn(move || worker.run(worker_rx, control_rx))
            .map_err(|e| {
                EmitterError::construction("worker", format!("failed to spawn export thread: {}", e))
            })?;

        Ok(Self {
            records: RwLock::new(Some(record_tx)),
            control: Mutex::new(Some(control_tx)),
            evictor: record_rx,
            worker: Mutex::new(Some(handle)),
            held,
            token,
            metrics,
            diagnostics,
            overflow_policy: config.batch.overflow_policy,
            shutdown_timeout: config.shutdown_timeout,
            transport_name,
        })
    }

    /// Queue a record for export.
    ///
    /// Never waits on the network. When the queue is full the overflow
    /// policy applies; lost records are counted and reported through
    /// diagnostics, never returned to the caller.
    pub fn enqueue(&self, record: LogRecord) {
        let guard = self.records.read();
        let Some(sender) = guard.as_ref() else {
            self.drop_records(1, DropReason::PipelineClosed);
            return;
        };

        match sender.try_send(record) {
            Ok(()) => {
                self.metrics.record_enqueued();
            }
            Err(TrySendError::Full(record)) => self.handle_overflow(sender, record),
            Err(TrySendError::Disconnected(_)) => self.drop_records(1, DropReason::PipelineClosed),
        }
    }

    fn handle_overflow(&self, sender: &Sender<LogRecord>, record: LogRecord) {
        self.metrics.record_queue_full();

        match self.overflow_policy {
            OverflowPolicy::DropOldest => {
                let mut record = record;
                for _ in 0..MAX_EVICTION_ROUNDS {
                    if self.evictor.try_recv().is_ok() {
                        self.drop_records(1, DropReason::QueueFullOldest);
                    }
                    match sender.try_send(record) {
                        Ok(()) => {
                            self.metrics.record_enqueued();
                            return;
                        }
                        Err(TrySendError::Full(r)) => record = r,
                        Err(TrySendError::Disconnected(_)) => {
                            self.drop_records(1, DropReason::PipelineClosed);
                            return;
                        }
                    }
                }
                self.drop_records(1, DropReason::QueueFullNewest);
            }

            OverflowPolicy::DropNewest => self.drop_records(1, DropReason::QueueFullNewest),

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(record, timeout) {
                    Ok(()) => {
                        self.metrics.record_enqueued();
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.drop_records(1, DropReason::QueueFullNewest)
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        self.drop_records(1, DropReason::PipelineClosed)
                    }
                }
            }
        }
    }

    fn drop_records(&self, count: usize, reason: DropReason) {
        let previous = self.metrics.record_dropped(count);
        self.diagnostics.report_drop(previous, count, reason);
    }

    /// Export everything enqueued before this call and wait for the worker.
    ///
    /// # Errors
    ///
    /// [`EmitterError::FlushTimeout`] when the worker does not finish within
    /// `timeout`, [`EmitterError::PipelineShutDown`] after shutdown.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        {
            let control = self.control.lock();
            let sender = control.as_ref().ok_or(EmitterError::PipelineShutDown)?;
            sender
                .send(Control::Flush(ack_tx))
                .map_err(|_| EmitterError::PipelineShutDown)?;
        }

        ack_rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => EmitterError::FlushTimeout(timeout),
            RecvTimeoutError::Disconnected => EmitterError::PipelineShutDown,
        })
    }

    /// Use `token` as bearer credential for every export from now on.
    ///
    /// Batches already delivered are not resent.
    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(BearerToken {
            token: token.into(),
            expires_at: None,
        });
    }

    /// Install `credential` unless the token in force outlives it.
    ///
    /// Returns `true` when the bearer token changed. A credential fetched
    /// before a concurrent refresh carries an earlier expiry and is ignored.
    pub fn install_credential(&self, credential: &Credential) -> bool {
        let mut current = self.token.write();
        let replace = match current.as_ref() {
            Some(held) if held.token == credential.access_token() => false,
            Some(held) => held
                .expires_at
                .map_or(true, |expires_at| credential.expires_at() > expires_at),
            None => true,
        };
        if replace {
            *current = Some(BearerToken {
                token: credential.access_token().to_string(),
                expires_at: Some(credential.expires_at()),
            });
        }
        replace
    }

    /// Stop sending an `Authorization` header
    pub fn clear_auth(&self) {
        *self.token.write() = None;
    }

    /// Whether `token` is the bearer credential currently in force
    pub fn has_auth_token(&self, token: &str) -> bool {
        self.token.read().as_ref().map(|t| t.token.as_str()) == Some(token)
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Records waiting in the queue (not yet picked up by the worker)
    pub fn queue_len(&self) -> usize {
        self.evictor.len()
    }

    pub fn transport_name(&self) -> &str {
        &self.transport_name
    }

    pub fn is_shut_down(&self) -> bool {
        self.records.read().is_none()
    }

    /// Close the queue, let the worker export what is left, and wait up to
    /// `timeout` for it to finish.
    ///
    /// Returns `false` if the worker did not finish in time or panicked.
    /// On timeout every unsettled record, queued or already held by the
    /// worker, is counted as dropped and reported.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        // Closing both channels lets the worker drain and exit
        drop(self.records.write().take());
        drop(self.control.lock().take());

        let Some(handle) = self.worker.lock().take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[EXPORTER ERROR] Export worker panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                let pending = {
                    let mut held = self.held.lock();
                    held.abandoned = true;
                    std::mem::take(&mut held.records) + self.evictor.try_iter().count()
                };
                if pending > 0 {
                    self.metrics.record_dropped(pending);
                }
                self.diagnostics
                    .report(Diagnostic::ShutdownTimedOut { pending, timeout });
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for ExportPipeline {
    fn drop(&mut self) {
        self.shutdown(self.shutdown_timeout);
    }
}

struct Worker {
    transport: Box<dyn LogTransport>,
    held: Arc<Mutex<Held>>,
    token: Arc<RwLock<Option<BearerToken>>>,
    metrics: Arc<PipelineMetrics>,
    diagnostics: Diagnostics,
    batch: BatchConfig,
    retry: RetryConfig,
    buffer: Vec<LogRecord>,
}

impl Worker {
    fn run(mut self, records: Receiver<LogRecord>, control: Receiver<Control>) {
        let mut deadline: Option<Instant> = None;
        let mut control = Some(control);

        loop {
            let timer = match deadline {
                Some(at) => crossbeam_channel::at(at),
                None => never(),
            };
            let commands = control.clone().unwrap_or_else(never);

            select! {
                recv(records) -> msg => match msg {
                    Ok(record) => {
                        if self.buffer.is_empty() {
                            deadline = Some(Instant::now() + self.batch.max_delay);
                        }
                        self.accept(record);
                        if self.buffer.len() >= self.batch.max_batch_size {
                            self.export_buffered();
                            deadline = None;
                        }
                    }
                    // Disconnected: every sender is gone and the queue is empty
                    Err(_) => {
                        self.export_buffered();
                        break;
                    }
                },
                recv(commands) -> cmd => match cmd {
                    Ok(Control::Flush(ack)) => {
                        for record in records.try_iter() {
                            self.accept(record);
                        }
                        self.export_buffered();
                        deadline = None;
                        let _ = ack.send(());
                    }
                    Err(_) => control = None,
                },
                recv(timer) -> _ => {
                    self.export_buffered();
                    deadline = None;
                }
            }
        }
    }

    /// Take custody of a dequeued record
    fn accept(&mut self, record: LogRecord) {
        let mut held = self.held.lock();
        if held.abandoned {
            // Shutdown already gave up; this one was still in flight from the queue
            self.metrics.record_dropped(1);
            return;
        }
        held.records += 1;
        self.buffer.push(record);
    }

    /// Export the buffer in batches of at most `max_batch_size`
    fn export_buffered(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.buffer);
        for chunk in pending.chunks(self.batch.max_batch_size) {
            let outcome = self.deliver(chunk);

            {
                let mut held = self.held.lock();
                if held.abandoned {
                    break;
                }
                held.records -= chunk.len();
            }

            match outcome {
                Ok(()) => self.metrics.record_exported(chunk.len()),
                Err((attempts, e)) => {
                    self.metrics.record_failed(chunk.len());
                    self.diagnostics.report(Diagnostic::DeliveryFailed {
                        records: chunk.len(),
                        attempts,
                        error: e.to_string(),
                    });
                }
            }
        }
        pending.clear();
        self.buffer = pending;
    }

    /// Send one batch, retrying transient failures.
    ///
    /// On failure returns the attempts made and the last error.
    fn deliver(&mut self, batch: &[LogRecord]) -> std::result::Result<(), (u32, EmitterError)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let authorization = self.token.read().as_ref().map(|t| format!("Bearer {}", t.token));
            let request = ExportRequest {
                records: batch,
                authorization: authorization.as_deref(),
            };

            // A panicking transport must not take the worker down with it
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                self.transport.export(request)
            }))
            .unwrap_or_else(|panic_info| {
                Err(EmitterError::delivery(
                    format!("transport panicked: {}", panic_message(&*panic_info)),
                    false,
                ))
            });

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    thread::sleep(self.retry.backoff(attempt));
                }
                Err(e) => return Err((attempt, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attributes, Level};
    use chrono::Utc;

    type Batches = Arc<Mutex<Vec<(Vec<String>, Option<String>)>>>;

    struct RecordingTransport {
        batches: Batches,
    }

    impl LogTransport for RecordingTransport {
        fn export(&mut self, request: ExportRequest<'_>) -> Result<()> {
            let messages = request.records.iter().map(|r| r.message().to_string()).collect();
            self.batches
                .lock()
                .push((messages, request.authorization.map(str::to_string)));
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    /// Blocks every export until the gate sender is dropped
    struct GatedTransport {
        entered: Sender<()>,
        gate: Receiver<()>,
        batches: Batches,
    }

    impl LogTransport for GatedTransport {
        fn export(&mut self, request: ExportRequest<'_>) -> Result<()> {
            let _ = self.entered.send(());
            let _ = self.gate.recv();
            let messages = request.records.iter().map(|r| r.message().to_string()).collect();
            self.batches.lock().push((messages, None));
            Ok(())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    struct FlakyTransport {
        failures_left: usize,
        retryable: bool,
        calls: Arc<Mutex<usize>>,
    }

    impl LogTransport for FlakyTransport {
        fn export(&mut self, _request: ExportRequest<'_>) -> Result<()> {
            *self.calls.lock() += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(EmitterError::delivery("collector unavailable", self.retryable));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn record(message: &str) -> LogRecord {
        LogRecord::build(message, Level::Info, message, Attributes::new(), Utc::now())
    }

    fn config(batch_size: usize, delay: Duration) -> ExportConfig {
        ExportConfig::default()
            .with_endpoint("http://127.0.0.1:4318/v1/logs")
            .with_max_batch_size(batch_size)
            .with_max_delay(delay)
            .with_retry(RetryConfig::disabled())
    }

    fn recording(config: &ExportConfig) -> (ExportPipeline, Batches) {
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            batches: Arc::clone(&batches),
        };
        let pipeline = ExportPipeline::start(config, Box::new(transport), Diagnostics::silent()).unwrap();
        (pipeline, batches)
    }

    fn collecting() -> (Diagnostics, Arc<Mutex<Vec<Diagnostic>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (
            Diagnostics::with_handler(Arc::new(move |d| sink.lock().push(d.clone()))),
            seen,
        )
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_batch_size_threshold_triggers_one_export() {
        let (pipeline, batches) = recording(&config(5, Duration::from_secs(30)));

        for i in 0..4 {
            pipeline.enqueue(record(&format!("r{i}")));
        }
        thread::sleep(Duration::from_millis(100));
        assert!(batches.lock().is_empty(), "partial batch must not be exported");

        pipeline.enqueue(record("r4"));
        assert!(wait_until(Duration::from_secs(2), || batches.lock().len() == 1));
        assert_eq!(batches.lock()[0].0.len(), 5);
    }

    #[test]
    fn test_max_delay_exports_partial_batch() {
        let (pipeline, batches) = recording(&config(100, Duration::from_millis(50)));

        pipeline.enqueue(record("a"));
        pipeline.enqueue(record("b"));

        assert!(wait_until(Duration::from_secs(2), || batches.lock().len() == 1));
        assert_eq!(batches.lock()[0].0, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_flush_exports_buffered_records() {
        let (pipeline, batches) = recording(&config(100, Duration::from_secs(60)));

        for i in 0..3 {
            pipeline.enqueue(record(&format!("r{i}")));
        }
        pipeline.flush(Duration::from_secs(2)).unwrap();

        let batches = batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0.len(), 3);
        assert_eq!(pipeline.metrics().exported_count(), 3);
    }

    #[test]
    fn test_flush_splits_into_max_batch_size() {
        let (pipeline, batches) = recording(&config(4, Duration::from_secs(60)).with_max_queue_size(64));
        for i in 0..10 {
            pipeline.enqueue(record(&format!("r{i}")));
        }
        pipeline.flush(Duration::from_secs(2)).unwrap();

        let sizes: Vec<usize> = batches.lock().iter().map(|(m, _)| m.len()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 10);
        assert!(sizes.iter().all(|&s| s <= 4));
    }

    #[test]
    fn test_auth_token_applies_to_later_exports() {
        let (pipeline, batches) = recording(&config(100, Duration::from_secs(60)));

        pipeline.enqueue(record("before"));
        pipeline.flush(Duration::from_secs(2)).unwrap();

        pipeline.set_auth_token("t1");
        assert!(pipeline.has_auth_token("t1"));
        pipeline.enqueue(record("after"));
        pipeline.flush(Duration::from_secs(2)).unwrap();

        let batches = batches.lock();
        assert_eq!(batches[0].1, None);
        assert_eq!(batches[1].1.as_deref(), Some("Bearer t1"));
    }

    #[test]
    fn test_earlier_expiring_credential_does_not_replace_token() {
        let (pipeline, batches) = recording(&config(100, Duration::from_secs(60)));
        let now = Utc::now();
        let stale = Credential::new("t1", now + chrono::Duration::seconds(10));
        let refreshed = Credential::new("t2", now + chrono::Duration::seconds(3600));

        assert!(pipeline.install_credential(&stale));
        assert!(pipeline.install_credential(&refreshed));
        // The stale credential arrives after the refresh
        assert!(!pipeline.install_credential(&stale));
        assert!(!pipeline.install_credential(&refreshed));
        assert!(pipeline.has_auth_token("t2"));

        pipeline.enqueue(record("a"));
        pipeline.flush(Duration::from_secs(2)).unwrap();
        assert_eq!(batches.lock()[0].1.as_deref(), Some("Bearer t2"));
    }

    #[test]
    fn test_delivery_failure_is_reported_not_raised() {
        let (diagnostics, seen) = collecting();
        let calls = Arc::new(Mutex::new(0));
        let transport = FlakyTransport {
            failures_left: usize::MAX,
            retryable: false,
            calls: Arc::clone(&calls),
        };
        let pipeline = ExportPipeline::start(
            &config(2, Duration::from_secs(60)),
            Box::new(transport),
            diagnostics,
        )
        .unwrap();

        pipeline.enqueue(record("a"));
        pipeline.enqueue(record("b"));
        assert!(wait_until(Duration::from_secs(2), || pipeline.metrics().batches_failed() == 1));

        assert_eq!(pipeline.metrics().dropped_count(), 2);
        assert!(matches!(
            seen.lock().first(),
            Some(Diagnostic::DeliveryFailed { records: 2, attempts: 1, .. })
        ));

        // Later emissions still reach the transport
        pipeline.enqueue(record("c"));
        pipeline.flush(Duration::from_secs(2)).unwrap();
        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let calls = Arc::new(Mutex::new(0));
        let transport = FlakyTransport {
            failures_left: 2,
            retryable: true,
            calls: Arc::clone(&calls),
        };
        let config = config(1, Duration::from_secs(60)).with_retry(RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        });
        let pipeline = ExportPipeline::start(&config, Box::new(transport), Diagnostics::silent()).unwrap();

        pipeline.enqueue(record("a"));
        pipeline.flush(Duration::from_secs(2)).unwrap();

        assert_eq!(*calls.lock(), 3);
        assert_eq!(pipeline.metrics().exported_count(), 1);
        assert_eq!(pipeline.metrics().batches_failed(), 0);
    }

    fn gated(policy: OverflowPolicy) -> (ExportPipeline, Receiver<()>, Sender<()>, Batches) {
        let (entered_tx, entered_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded::<()>();
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let transport = GatedTransport {
            entered: entered_tx,
            gate: gate_rx,
            batches: Arc::clone(&batches),
        };
        let config = config(1, Duration::from_secs(60))
            .with_max_queue_size(2)
            .with_overflow_policy(policy);
        let pipeline = ExportPipeline::start(&config, Box::new(transport), Diagnostics::silent()).unwrap();
        (pipeline, entered_rx, gate_tx, batches)
    }

    #[test]
    fn test_drop_oldest_evicts_queued_record() {
        let (pipeline, entered, gate, batches) = gated(OverflowPolicy::DropOldest);

        pipeline.enqueue(record("r0"));
        entered.recv_timeout(Duration::from_secs(2)).unwrap();

        pipeline.enqueue(record("r1"));
        pipeline.enqueue(record("r2"));
        pipeline.enqueue(record("r3"));
        assert_eq!(pipeline.metrics().dropped_count(), 1);

        drop(gate);
        pipeline.flush(Duration::from_secs(2)).unwrap();

        let exported: Vec<String> = batches.lock().iter().flat_map(|(m, _)| m.clone()).collect();
        assert_eq!(exported, vec!["r0", "r2", "r3"]);
    }

    #[test]
    fn test_drop_newest_rejects_incoming_record() {
        let (pipeline, entered, gate, batches) = gated(OverflowPolicy::DropNewest);

        pipeline.enqueue(record("r0"));
        entered.recv_timeout(Duration::from_secs(2)).unwrap();

        pipeline.enqueue(record("r1"));
        pipeline.enqueue(record("r2"));
        pipeline.enqueue(record("r3"));
        assert_eq!(pipeline.metrics().dropped_count(), 1);
        assert_eq!(pipeline.metrics().queue_full_events(), 1);

        drop(gate);
        pipeline.flush(Duration::from_secs(2)).unwrap();

        let exported: Vec<String> = batches.lock().iter().flat_map(|(m, _)| m.clone()).collect();
        assert_eq!(exported, vec!["r0", "r1", "r2"]);
    }

    #[test]
    fn test_block_with_timeout_drops_after_waiting() {
        let (pipeline, entered, gate, _batches) =
            gated(OverflowPolicy::BlockWithTimeout(Duration::from_millis(30)));

        pipeline.enqueue(record("r0"));
        entered.recv_timeout(Duration::from_secs(2)).unwrap();
        pipeline.enqueue(record("r1"));
        pipeline.enqueue(record("r2"));

        let start = Instant::now();
        pipeline.enqueue(record("r3"));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(pipeline.metrics().block_events(), 1);
        assert_eq!(pipeline.metrics().dropped_count(), 1);
        drop(gate);
    }

    #[test]
    fn test_shutdown_exports_pending_records() {
        let (pipeline, batches) = recording(&config(100, Duration::from_secs(60)));
        for i in 0..3 {
            pipeline.enqueue(record(&format!("r{i}")));
        }

        assert!(pipeline.shutdown(Duration::from_secs(2)));
        assert!(pipeline.is_shut_down());
        assert_eq!(batches.lock().iter().map(|(m, _)| m.len()).sum::<usize>(), 3);
    }

    #[test]
    fn test_shutdown_timeout_reports_dropped_records() {
        let (entered_tx, entered_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded::<()>();
        let (diagnostics, seen) = collecting();
        let transport = GatedTransport {
            entered: entered_tx,
            gate: gate_rx,
            batches: Arc::new(Mutex::new(Vec::new())),
        };
        let config = config(1, Duration::from_secs(60)).with_max_queue_size(8);
        let pipeline = ExportPipeline::start(&config, Box::new(transport), diagnostics).unwrap();

        pipeline.enqueue(record("r0"));
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        pipeline.enqueue(record("r1"));
        pipeline.enqueue(record("r2"));

        assert!(!pipeline.shutdown(Duration::from_millis(50)));
        // r0 is in the transport, r1 and r2 still queued
        assert_eq!(pipeline.metrics().dropped_count(), 3);
        assert!(seen
            .lock()
            .contains(&Diagnostic::ShutdownTimedOut {
                pending: 3,
                timeout: Duration::from_millis(50)
            }));
        drop(gate_tx);
    }

    #[test]
    fn test_shutdown_timeout_accounts_for_records_held_by_worker() {
        let (entered_tx, entered_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded::<()>();
        let (diagnostics, seen) = collecting();
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let transport = GatedTransport {
            entered: entered_tx,
            gate: gate_rx,
            batches: Arc::clone(&batches),
        };
        let config = config(4, Duration::from_secs(60)).with_max_queue_size(8);
        let pipeline = ExportPipeline::start(&config, Box::new(transport), diagnostics).unwrap();

        // A full batch goes in flight, two more wait behind it
        for i in 0..4 {
            pipeline.enqueue(record(&format!("r{i}")));
        }
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        pipeline.enqueue(record("r4"));
        pipeline.enqueue(record("r5"));

        assert!(!pipeline.shutdown(Duration::from_millis(100)));
        assert!(seen.lock().contains(&Diagnostic::ShutdownTimedOut {
            pending: 6,
            timeout: Duration::from_millis(100)
        }));

        // The stalled batch completing late must not be counted twice
        drop(gate_tx);
        assert!(wait_until(Duration::from_secs(2), || batches.lock().len() == 1));
        thread::sleep(Duration::from_millis(50));

        let metrics = pipeline.metrics();
        assert_eq!(metrics.enqueued_count(), 6);
        assert_eq!(metrics.exported_count(), 0);
        assert_eq!(metrics.dropped_count(), 6);
        assert_eq!(
            metrics.exported_count() + metrics.dropped_count(),
            metrics.enqueued_count()
        );
    }

    #[test]
    fn test_start_does_not_resolve_endpoint_host() {
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            batches: Arc::clone(&batches),
        };
        let config = config(1, Duration::from_secs(60)).with_endpoint("http://collector.invalid:4318/v1/logs");

        let pipeline = ExportPipeline::start(&config, Box::new(transport), Diagnostics::silent()).unwrap();
        pipeline.enqueue(record("a"));
        pipeline.flush(Duration::from_secs(2)).unwrap();
        assert_eq!(batches.lock().len(), 1);

        let bad = config.with_max_queue_size(0);
        let transport = RecordingTransport { batches };
        assert!(ExportPipeline::start(&bad, Box::new(transport), Diagnostics::silent()).is_err());
    }

    #[test]
    fn test_enqueue_after_shutdown_is_dropped() {
        let (pipeline, batches) = recording(&config(1, Duration::from_secs(60)));
        assert!(pipeline.shutdown(Duration::from_secs(1)));

        pipeline.enqueue(record("late"));
        assert_eq!(pipeline.metrics().dropped_count(), 1);
        assert!(batches.lock().is_empty());
        assert!(matches!(
            pipeline.flush(Duration::from_millis(10)),
            Err(EmitterError::PipelineShutDown)
        ));
    }
}
