//! Emission facade
//!
//! [`Emitter::emit`] is the one operation callers need: it renders the
//! template, settles the level, builds the record, writes it to the local
//! sinks, and hands a copy to the process-wide export pipeline.

use crate::auth::Authenticator;
use crate::core::diagnostics::panic_message;
use crate::core::{
    format_message, Appender, Attributes, Diagnostic, Diagnostics, DiagnosticsHandler, Level,
    LevelPolicy, LogRecord, Result, UniformRandomLevel,
};
use crate::export::{
    ExportConfig, ExportPipeline, ExportPipelineHandle, LogTransport, OtlpHttpTransport,
    PipelineRegistry, ShutdownGuard,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Builds the transport of a freshly constructed pipeline
pub type TransportFactory =
    Arc<dyn Fn(&ExportConfig) -> Result<Box<dyn LogTransport>> + Send + Sync>;

/// What an emission produced, as reported back to the requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitResponse {
    pub formatted_message: String,
    pub emitted_level: Level,
    pub emitted_at: DateTime<Utc>,
}

impl From<&LogRecord> for EmitResponse {
    fn from(record: &LogRecord) -> Self {
        Self {
            formatted_message: record.message().to_string(),
            emitted_level: record.level(),
            emitted_at: record.timestamp(),
        }
    }
}

pub struct Emitter {
    registry: &'static PipelineRegistry,
    config: ExportConfig,
    sinks: Mutex<Vec<Box<dyn Appender>>>,
    level_policy: Box<dyn LevelPolicy>,
    authenticator: Option<Authenticator>,
    transport_factory: TransportFactory,
    diagnostics: Diagnostics,
}

impl Emitter {
    pub fn builder() -> EmitterBuilder {
        EmitterBuilder::new()
    }

    /// Emit one record.
    ///
    /// Steps, in order: render `template` against `attributes`, resolve the
    /// level, build the record, obtain an access token (authenticated
    /// emitters only), write to the local sinks, then enqueue a copy on the
    /// export pipeline, constructing it on first use.
    ///
    /// Delivery to the collector happens in the background; its failures
    /// are reported through diagnostics and never returned here.
    ///
    /// # Errors
    ///
    /// - `EmitterError::Format`: nothing is written or enqueued
    /// - `EmitterError::Auth`: nothing is written or enqueued and the
    ///   pipeline is not touched
    /// - `EmitterError::PipelineConstruction`: the record reached the local
    ///   sinks but could not be enqueued
    pub fn emit(&self, template: &str, level: Option<Level>, attributes: Attributes) -> Result<LogRecord> {
        let message = format_message(template, &attributes)?;
        let level = self.level_policy.resolve(level);
        let record = LogRecord::build(message, level, template, attributes, Utc::now());

        let credential = match self.authenticator {
            Some(ref authenticator) => Some(authenticator.credential()?),
            None => None,
        };

        self.write_local(&record);

        let pipeline = self.pipeline()?;
        if let Some(credential) = credential {
            if pipeline.install_credential(&credential) {
                self.diagnostics.report(Diagnostic::TokenRefreshed);
            }
        }
        pipeline.enqueue(record.clone());

        Ok(record)
    }

    /// [`emit`](Self::emit), reporting the outcome as an [`EmitResponse`]
    pub fn emit_response(
        &self,
        template: &str,
        level: Option<Level>,
        attributes: Attributes,
    ) -> Result<EmitResponse> {
        self.emit(template, level, attributes)
            .map(|record| EmitResponse::from(&record))
    }

    /// The process pipeline, constructed from this emitter's config on first use
    pub fn pipeline(&self) -> Result<ExportPipelineHandle> {
        self.registry.get_or_create_with(&self.config, |config| {
            let transport = (self.transport_factory)(config)?;
            ExportPipeline::start(config, transport, self.diagnostics.clone())
        })
    }

    fn write_local(&self, record: &LogRecord) {
        let mut sinks = self.sinks.lock();
        for sink in sinks.iter_mut() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.append(record)));

            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic_info) => format!("panicked: {}", panic_message(&*panic_info)),
            };
            self.diagnostics.report(Diagnostic::SinkFailed {
                sink: sink.name().to_string(),
                error,
            });
        }
    }

    /// Flush local sinks and export everything queued so far.
    ///
    /// # Errors
    ///
    /// `EmitterError::FlushTimeout` when the export worker does not finish in
    /// time. Does nothing to the pipeline if none exists yet.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.flush_sinks();
        match self.registry.current() {
            Some(pipeline) => pipeline.flush(timeout),
            None => Ok(()),
        }
    }

    fn flush_sinks(&self) {
        let mut sinks = self.sinks.lock();
        for sink in sinks.iter_mut() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.flush()));
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic_info) => format!("panicked during flush: {}", panic_message(&*panic_info)),
            };
            self.diagnostics.report(Diagnostic::SinkFailed {
                sink: sink.name().to_string(),
                error,
            });
        }
    }

    /// Flush local sinks and tear down the process pipeline.
    ///
    /// Returns `false` when queued records had to be dropped because the
    /// worker did not finish within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.flush_sinks();
        self.registry.teardown(timeout)
    }

    /// Guard that tears the pipeline down on drop, waiting up to the
    /// configured `shutdown_timeout`.
    ///
    /// The pipeline is shared by every emitter in the process, so dropping
    /// an `Emitter` leaves it running; keep a guard alive in `main` instead.
    pub fn shutdown_guard(&self) -> ShutdownGuard {
        self.registry.shutdown_guard(self.config.shutdown_timeout)
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn registry(&self) -> &'static PipelineRegistry {
        self.registry
    }

    pub fn level_policy_name(&self) -> &str {
        self.level_policy.name()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticator.is_some()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }
}

/// Builder for [`Emitter`]
pub struct EmitterBuilder {
    registry: &'static PipelineRegistry,
    config: ExportConfig,
    sinks: Vec<Box<dyn Appender>>,
    level_policy: Box<dyn LevelPolicy>,
    authenticator: Option<Authenticator>,
    transport_factory: Option<TransportFactory>,
    diagnostics: Diagnostics,
}

impl EmitterBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults: the global registry, default export config, no local sinks,
    /// uniform random fallback level, no authentication, OTLP/HTTP transport,
    /// diagnostics to stderr.
    pub fn new() -> Self {
        Self {
            registry: PipelineRegistry::global(),
            config: ExportConfig::default(),
            sinks: Vec::new(),
            level_policy: Box::new(UniformRandomLevel),
            authenticator: None,
            transport_factory: None,
            diagnostics: Diagnostics::stderr(),
        }
    }

    /// Export configuration used if this emitter constructs the pipeline
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a local sink
    #[must_use = "builder methods return a new value"]
    pub fn appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.sinks.push(Box::new(appender));
        self
    }

    /// Strategy for records emitted without a level
    #[must_use = "builder methods return a new value"]
    pub fn level_policy<P: LevelPolicy + 'static>(mut self, policy: P) -> Self {
        self.level_policy = Box::new(policy);
        self
    }

    /// Sign in before use and send `Authorization: Bearer <token>` on exports
    #[must_use = "builder methods return a new value"]
    pub fn authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Replace the OTLP/HTTP transport built on pipeline construction
    #[must_use = "builder methods return a new value"]
    pub fn transport_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ExportConfig) -> Result<Box<dyn LogTransport>> + Send + Sync + 'static,
    {
        let factory: TransportFactory = Arc::new(factory);
        self.transport_factory = Some(factory);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Send diagnostics to `handler` instead of stderr
    #[must_use = "builder methods return a new value"]
    pub fn on_diagnostic(mut self, handler: DiagnosticsHandler) -> Self {
        self.diagnostics = Diagnostics::with_handler(handler);
        self
    }

    /// Use a registry other than the process-wide one
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: &'static PipelineRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Emitter {
        let transport_factory = match self.transport_factory {
            Some(factory) => factory,
            None => {
                let otlp_http: TransportFactory = Arc::new(|config: &ExportConfig| {
                    let transport: Box<dyn LogTransport> = Box::new(OtlpHttpTransport::new(config)?);
                    Ok(transport)
                });
                otlp_http
            }
        };

        Emitter {
            registry: self.registry,
            config: self.config,
            sinks: Mutex::new(self.sinks),
            level_policy: self.level_policy,
            authenticator: self.authenticator,
            transport_factory,
            diagnostics: self.diagnostics,
        }
    }
}

impl Default for EmitterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
