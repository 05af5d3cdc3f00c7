//! Error types for the emission and export pipeline

use std::time::Duration;

pub type Result<T> = std::result::Result<T, EmitterError>;

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    /// Template references a missing key or is malformed
    #[error("Format error in template '{template}': {message}")]
    Format { template: String, message: String },

    /// Credential exchange failed
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        status: Option<u16>,
    },

    /// Export pipeline could not be built from its configuration
    #[error("Export pipeline construction failed for {component}: {message}")]
    PipelineConstruction { component: String, message: String },

    /// Network or transport failure while delivering a batch
    #[error("Export delivery failed: {message}")]
    ExportDelivery { message: String, retryable: bool },

    /// Worker did not acknowledge a flush in time
    #[error("Export flush did not complete within {0:?}")]
    FlushTimeout(Duration),

    /// Pipeline has been shut down
    #[error("Export pipeline already shut down")]
    PipelineShutDown,

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EmitterError {
    /// Create a format error for `template`
    pub fn format(template: impl Into<String>, message: impl Into<String>) -> Self {
        EmitterError::Format {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error, optionally carrying the HTTP status
    pub fn auth(message: impl Into<String>, status: Option<u16>) -> Self {
        EmitterError::Auth {
            message: message.into(),
            status,
        }
    }

    /// Create a pipeline construction error
    pub fn construction(component: impl Into<String>, message: impl Into<String>) -> Self {
        EmitterError::PipelineConstruction {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a delivery error
    pub fn delivery(message: impl Into<String>, retryable: bool) -> Self {
        EmitterError::ExportDelivery {
            message: message.into(),
            retryable,
        }
    }

    /// Whether a failed delivery is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmitterError::ExportDelivery { retryable: true, .. })
    }

    /// Whether `Emitter::emit` may return this error to its caller.
    ///
    /// Delivery-layer failures only surface through diagnostics.
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            EmitterError::Format { .. }
                | EmitterError::Auth { .. }
                | EmitterError::PipelineConstruction { .. }
        )
    }
}
