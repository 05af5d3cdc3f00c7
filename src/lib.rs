//! # OTLP Log Emitter
//!
//! Structured log emission with batched export to an OpenTelemetry
//! collector over OTLP/HTTP.
//!
//! ## Features
//!
//! - **Templated messages**: `{name}` placeholders filled from the record's
//!   attributes, with the raw template kept under `message_template`
//! - **Non-blocking export**: a bounded queue and one background worker per
//!   process, batching by size and by delay
//! - **Single pipeline**: every emitter in the process shares one exporter
//! - **Bearer authentication**: sign in once, refresh before expiry
//! - **Local sinks**: console and JSON-lines output alongside the export
//!
//! ## Example
//!
//! ```no_run
//! use otlp_log_emitter::prelude::*;
//!
//! let emitter = Emitter::builder()
//!     .config(ExportConfig::default().with_resource(ServiceResource::new("checkout")))
//!     .appender(ConsoleAppender::new())
//!     .build();
//!
//! let record = emitter.emit("hello {name}", None, Attributes::new().with("name", "world"))?;
//! assert_eq!(record.message(), "hello world");
//! # Ok::<(), EmitterError>(())
//! ```

pub mod appenders;
pub mod auth;
pub mod core;
pub mod emitter;
pub mod export;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::appenders::ConsoleAppender;
    pub use crate::appenders::JsonAppender;
    pub use crate::auth::{Authenticator, Credential, CredentialProvider};
    pub use crate::core::{
        Appender, AttributeValue, Attributes, Diagnostic, Diagnostics, EmitterError, FixedLevel,
        Level, LevelPolicy, LogRecord, OverflowPolicy, PipelineMetrics, Result,
        UniformRandomLevel,
    };
    pub use crate::emitter::{EmitResponse, Emitter, EmitterBuilder};
    pub use crate::export::{
        Compression, ExportConfig, ExportPipeline, PipelineRegistry, RetryConfig, ServiceResource,
        ShutdownGuard, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

#[cfg(feature = "console")]
pub use appenders::ConsoleAppender;
pub use appenders::JsonAppender;
pub use auth::{Authenticator, Credential, CredentialProvider};
pub use self::core::{
    Appender, AttributeValue, Attributes, Diagnostic, Diagnostics, DiagnosticsHandler, DropReason,
    EmitterError, FixedLevel, Level, LevelPolicy, LogRecord, OverflowPolicy, PipelineMetrics,
    Result, UniformRandomLevel, MESSAGE_TEMPLATE_KEY,
};
pub use emitter::{EmitResponse, Emitter, EmitterBuilder, TransportFactory};
pub use export::{
    ExportConfig, ExportPipeline, ExportPipelineHandle, LogTransport, PipelineRegistry,
    ServiceResource, ShutdownGuard, DEFAULT_SHUTDOWN_TIMEOUT,
};
