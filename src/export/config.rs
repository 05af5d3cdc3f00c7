//! Export pipeline configuration
//!
//! Plain data with defaults for a local OTLP/HTTP collector. The pipeline
//! consumes resolved values only; loading them from files or the environment
//! is up to the caller.

use crate::core::{EmitterError, OverflowPolicy, Result};
use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::time::Duration;

/// Default OTLP/HTTP logs endpoint of a local collector
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4318/v1/logs";

/// Default time allowed for the final flush at shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serde helper storing a `Duration` as whole milliseconds
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Identity of the emitting service, sent as OTLP resource attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceResource {
    /// `service.name`
    pub name: String,
    /// `service.namespace`, omitted when unset
    pub namespace: Option<String>,
    /// `service.instance.id`
    pub instance_id: String,
}

impl ServiceResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }
}

impl Default for ServiceResource {
    fn default() -> Self {
        let instance_id = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "local".to_string());

        Self {
            name: env!("CARGO_PKG_NAME").replace('_', "-"),
            namespace: None,
            instance_id,
        }
    }
}

/// Batching and queueing behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records per export request; reaching it triggers a flush
    pub max_batch_size: usize,

    /// Longest time a record waits in a partial batch
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,

    /// Capacity of the in-memory queue in front of the worker
    pub max_queue_size: usize,

    /// What to do when the queue is full
    pub overflow_policy: OverflowPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 512,
            max_delay: Duration::from_secs(5),
            max_queue_size: 2048,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}

/// Retry of transient delivery failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per batch, including the first
    pub max_attempts: u32,

    #[serde(with = "duration_millis")]
    pub initial_backoff: Duration,

    #[serde(with = "duration_millis")]
    pub max_backoff: Duration,
}

impl RetryConfig {
    /// No retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before attempt number `attempt + 1` (exponential, capped)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Request body compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// Configuration of the export pipeline
///
/// # Example
///
/// ```
/// use otlp_log_emitter::export::{ExportConfig, ServiceResource};
/// use std::time::Duration;
///
/// let config = ExportConfig::default()
///     .with_endpoint("http://127.0.0.1:4318/v1/logs")
///     .with_resource(
///         ServiceResource::new("checkout")
///             .with_namespace("shop")
///             .with_instance_id("checkout-1"),
///     )
///     .with_max_batch_size(100)
///     .with_max_delay(Duration::from_secs(1));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Full URL of the OTLP/HTTP logs endpoint
    pub endpoint: String,

    pub resource: ServiceResource,

    /// Instrumentation scope name; defaults to the service name
    pub scope_name: Option<String>,

    pub batch: BatchConfig,

    pub retry: RetryConfig,

    pub compression: Compression,

    /// Per-request timeout of the HTTP transport
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,

    /// Time allowed for the final flush
    #[serde(with = "duration_millis")]
    pub shutdown_timeout: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            resource: ServiceResource::default(),
            scope_name: None,
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            compression: Compression::None,
            request_timeout: Duration::from_secs(10),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ExportConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: ServiceResource) -> Self {
        self.resource = resource;
        self
    }

    #[must_use]
    pub fn with_scope_name(mut self, scope_name: impl Into<String>) -> Self {
        self.scope_name = Some(scope_name.into());
        self
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.batch.max_batch_size = size;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.batch.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.batch.max_queue_size = size;
        self
    }

    #[must_use]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.batch.overflow_policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Scope name reported with every batch
    pub fn effective_scope_name(&self) -> &str {
        self.scope_name.as_deref().unwrap_or(&self.resource.name)
    }

    /// Check the configuration, resolving the collector host.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::PipelineConstruction`] naming the offending
    /// setting.
    pub fn validate(&self) -> Result<()> {
        self.validate_settings()?;
        self.resolve_endpoint().map(|_| ())
    }

    /// Every check of [`validate`](Self::validate) except host resolution,
    /// which the transport performs once when it is built.
    pub(crate) fn validate_settings(&self) -> Result<()> {
        if self.batch.max_batch_size == 0 {
            return Err(EmitterError::construction(
                "batch",
                "max_batch_size must be greater than zero",
            ));
        }
        if self.batch.max_delay.is_zero() {
            return Err(EmitterError::construction(
                "batch",
                "max_delay must be greater than zero",
            ));
        }
        if self.batch.max_queue_size < self.batch.max_batch_size {
            return Err(EmitterError::construction(
                "batch",
                format!(
                    "max_queue_size ({}) must be at least max_batch_size ({})",
                    self.batch.max_queue_size, self.batch.max_batch_size
                ),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EmitterError::construction(
                "retry",
                "max_attempts must be at least 1",
            ));
        }
        if self.resource.name.trim().is_empty() {
            return Err(EmitterError::construction(
                "resource",
                "service name must not be empty",
            ));
        }
        self.parse_endpoint().map(|_| ())
    }

    fn parse_endpoint(&self) -> Result<reqwest::Url> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            EmitterError::construction("endpoint", format!("invalid URL '{}': {}", self.endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(EmitterError::construction(
                "endpoint",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if url.host_str().is_none() {
            return Err(EmitterError::construction("endpoint", "URL has no host"));
        }

        Ok(url)
    }

    /// Parse the endpoint and make sure its host resolves
    pub(crate) fn resolve_endpoint(&self) -> Result<reqwest::Url> {
        let url = self.parse_endpoint()?;
        let host = url
            .host_str()
            .ok_or_else(|| EmitterError::construction("endpoint", "URL has no host"))?;
        let port = url.port_or_known_default().unwrap_or(4318);
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let mut addrs = (host, port).to_socket_addrs().map_err(|e| {
            EmitterError::construction("endpoint", format!("cannot resolve host '{}': {}", host, e))
        })?;
        if addrs.next().is_none() {
            return Err(EmitterError::construction(
                "endpoint",
                format!("host '{}' resolved to no addresses", host),
            ));
        }

        Ok(url)
    }
}
