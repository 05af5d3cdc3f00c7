//! Core record types, formatting, and pipeline support types

pub mod appender;
pub mod attributes;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod level_resolver;
pub mod log_level;
pub mod log_record;
pub mod metrics;
pub mod overflow_policy;

pub use appender::Appender;
pub use attributes::{AttributeValue, Attributes};
pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsHandler, DropReason};
pub use error::{EmitterError, Result};
pub use formatter::{format_message, placeholders};
pub use level_resolver::{resolve_level, FixedLevel, LevelPolicy, UniformRandomLevel};
pub use log_level::Level;
pub use log_record::{LogRecord, MESSAGE_TEMPLATE_KEY};
pub use metrics::PipelineMetrics;
pub use overflow_policy::OverflowPolicy;
