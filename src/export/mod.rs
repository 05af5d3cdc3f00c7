//! Export side: configuration, OTLP encoding, transport, and the batched
//! pipeline with its process-wide registry

pub mod config;
pub mod otlp;
pub mod pipeline;
pub mod registry;
pub mod transport;

pub use config::{
    BatchConfig, Compression, ExportConfig, RetryConfig, ServiceResource, DEFAULT_ENDPOINT,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use otlp::{OtlpEncoder, PROTOBUF_CONTENT_TYPE};
pub use pipeline::ExportPipeline;
pub use registry::{ExportPipelineHandle, PipelineRegistry, ShutdownGuard};
pub use transport::{ExportRequest, LogTransport, OtlpHttpTransport};
