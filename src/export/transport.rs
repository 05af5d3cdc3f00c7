//! Transports delivering record batches to a collector

use super::config::{Compression, ExportConfig};
use super::otlp::{OtlpEncoder, PROTOBUF_CONTENT_TYPE};
use crate::core::{EmitterError, LogRecord, Result};
use flate2::write::GzEncoder;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use std::io::Write;

/// One export call: a batch plus the authorization header in force
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub records: &'a [LogRecord],
    /// Full `Authorization` header value, e.g. `Bearer <token>`
    pub authorization: Option<&'a str>,
}

/// Delivers batches to a remote collector.
///
/// A transport is owned by exactly one pipeline worker, so `export` is never
/// called concurrently.
pub trait LogTransport: Send {
    /// Deliver one batch.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::ExportDelivery`]; `retryable` marks transient
    /// failures.
    fn export(&mut self, request: ExportRequest<'_>) -> Result<()>;

    fn name(&self) -> &str;
}

/// OTLP/HTTP transport with protobuf bodies
pub struct OtlpHttpTransport {
    client: reqwest::blocking::Client,
    url: reqwest::Url,
    encoder: OtlpEncoder,
    compression: Compression,
}

impl OtlpHttpTransport {
    /// Build the transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::PipelineConstruction`] when the endpoint is
    /// invalid or its host does not resolve.
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let url = config.resolve_endpoint()?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                EmitterError::construction("http_client", format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url,
            encoder: OtlpEncoder::new(&config.resource, config.effective_scope_name()),
            compression: config.compression,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    fn body(&self, records: &[LogRecord]) -> Result<Vec<u8>> {
        let payload = self.encoder.encode(records);
        match self.compression {
            Compression::None => Ok(payload),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
                encoder
                    .write_all(&payload)
                    .and_then(|()| encoder.finish())
                    .map_err(|e| EmitterError::delivery(format!("gzip encoding failed: {}", e), false))
            }
        }
    }
}

/// 429 and gateway errors are worth retrying, everything else is final
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

impl LogTransport for OtlpHttpTransport {
    fn export(&mut self, request: ExportRequest<'_>) -> Result<()> {
        let body = self.body(request.records)?;

        let mut builder = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, PROTOBUF_CONTENT_TYPE);
        if self.compression == Compression::Gzip {
            builder = builder.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(authorization) = request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let response = builder
            .body(body)
            .send()
            .map_err(|e| EmitterError::delivery(format!("request to {} failed: {}", self.url, e), true))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().unwrap_or_default();
        let detail: String = detail.chars().take(200).collect();
        Err(EmitterError::delivery(
            format!("collector responded with HTTP {}: {}", status.as_u16(), detail),
            is_retryable_status(status),
        ))
    }

    fn name(&self) -> &str {
        "otlp_http"
    }
}
