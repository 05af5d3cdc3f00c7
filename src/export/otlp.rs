//! OTLP (OpenTelemetry Protocol) encoding of record batches
//!
//! Every batch becomes one `ExportLogsServiceRequest` with a single
//! `ResourceLogs` (the service identity) and a single `ScopeLogs`.

use super::config::ServiceResource;
use crate::core::{AttributeValue, Attributes, LogRecord};

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord as OtlpLogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::resource::v1::Resource;
use prost::Message;

/// Content type of protobuf-encoded OTLP/HTTP bodies
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

const SDK_NAME: &str = env!("CARGO_PKG_NAME");
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Converts record batches to OTLP protobuf requests.
#[derive(Debug, Clone)]
pub struct OtlpEncoder {
    resource: Resource,
    scope: InstrumentationScope,
}

impl OtlpEncoder {
    pub fn new(resource: &ServiceResource, scope_name: &str) -> Self {
        let mut attributes = vec![string_kv("service.name", &resource.name)];
        if let Some(ref namespace) = resource.namespace {
            attributes.push(string_kv("service.namespace", namespace));
        }
        attributes.push(string_kv("service.instance.id", &resource.instance_id));
        attributes.push(string_kv("telemetry.sdk.name", SDK_NAME));
        attributes.push(string_kv("telemetry.sdk.language", "rust"));
        attributes.push(string_kv("telemetry.sdk.version", SDK_VERSION));

        Self {
            resource: Resource {
                attributes,
                dropped_attributes_count: 0,
                entity_refs: vec![],
            },
            scope: InstrumentationScope {
                name: scope_name.to_string(),
                version: SDK_VERSION.to_string(),
                attributes: vec![],
                dropped_attributes_count: 0,
            },
        }
    }

    /// Build the export request for `records`
    pub fn request(&self, records: &[LogRecord]) -> ExportLogsServiceRequest {
        let log_records = records.iter().map(log_record).collect();

        ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                resource: Some(self.resource.clone()),
                scope_logs: vec![ScopeLogs {
                    scope: Some(self.scope.clone()),
                    log_records,
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            }],
        }
    }

    /// Protobuf-encode the export request for `records`
    pub fn encode(&self, records: &[LogRecord]) -> Vec<u8> {
        self.request(records).encode_to_vec()
    }
}

fn log_record(record: &LogRecord) -> OtlpLogRecord {
    let time_unix_nano = record.timestamp().timestamp_nanos_opt().unwrap_or(0) as u64;
    let observed_time_unix_nano = chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n as u64)
        .unwrap_or(time_unix_nano);

    OtlpLogRecord {
        time_unix_nano,
        observed_time_unix_nano,
        severity_number: record.level().severity_number(),
        severity_text: record.level().to_str().to_string(),
        body: Some(AnyValue {
            value: Some(any_value::Value::StringValue(record.message().to_string())),
        }),
        attributes: attributes(record.attributes()),
        dropped_attributes_count: 0,
        flags: 0,
        trace_id: vec![],
        span_id: vec![],
        event_name: String::new(),
    }
}

fn attributes(attrs: &Attributes) -> Vec<KeyValue> {
    attrs
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: Some(any_value(value)),
        })
        .collect()
}

fn any_value(value: &AttributeValue) -> AnyValue {
    let value = match value {
        AttributeValue::String(s) => any_value::Value::StringValue(s.clone()),
        AttributeValue::Int(i) => any_value::Value::IntValue(*i),
        AttributeValue::Float(f) => any_value::Value::DoubleValue(*f),
        AttributeValue::Bool(b) => any_value::Value::BoolValue(*b),
    };
    AnyValue { value: Some(value) }
}

fn string_kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
    }
}
