//! Shared test transports and helpers

#![allow(dead_code)]

use otlp_log_emitter::export::{ExportConfig, ExportRequest, LogTransport, PipelineRegistry};
use otlp_log_emitter::{Diagnostic, Diagnostics, EmitterBuilder, Emitter, LogRecord, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One export call as the transport saw it
#[derive(Debug, Clone)]
pub struct ExportedBatch {
    pub records: Vec<LogRecord>,
    pub authorization: Option<String>,
}

pub type Batches = Arc<Mutex<Vec<ExportedBatch>>>;

pub struct RecordingTransport {
    batches: Batches,
}

impl RecordingTransport {
    pub fn new(batches: &Batches) -> Self {
        Self {
            batches: Arc::clone(batches),
        }
    }
}

impl LogTransport for RecordingTransport {
    fn export(&mut self, request: ExportRequest<'_>) -> Result<()> {
        self.batches.lock().push(ExportedBatch {
            records: request.records.to_vec(),
            authorization: request.authorization.map(str::to_string),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn batches() -> Batches {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn exported_messages(batches: &Batches) -> Vec<String> {
    batches
        .lock()
        .iter()
        .flat_map(|b| b.records.iter().map(|r| r.message().to_string()))
        .collect()
}

/// A registry private to one test, so tests do not share the global pipeline
pub fn private_registry() -> &'static PipelineRegistry {
    Box::leak(Box::new(PipelineRegistry::new()))
}

/// Local config that never waits on the delay timer during a test
pub fn test_config() -> ExportConfig {
    ExportConfig::default()
        .with_endpoint("http://127.0.0.1:4318/v1/logs")
        .with_max_delay(Duration::from_secs(60))
}

/// Emitter exporting into `batches` through a private registry
pub fn recording_emitter(batches: &Batches) -> EmitterBuilder {
    let batches = Arc::clone(batches);
    Emitter::builder()
        .registry(private_registry())
        .config(test_config())
        .diagnostics(Diagnostics::silent())
        .transport_factory(move |_| {
            let transport: Box<dyn LogTransport> = Box::new(RecordingTransport::new(&batches));
            Ok(transport)
        })
}

pub fn collecting_diagnostics() -> (Diagnostics, Arc<Mutex<Vec<Diagnostic>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let diagnostics = Diagnostics::with_handler(Arc::new(move |d: &Diagnostic| sink.lock().push(d.clone())));
    (diagnostics, seen)
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
