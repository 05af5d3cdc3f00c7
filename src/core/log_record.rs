//! Log record structure

use super::attributes::Attributes;
use super::log_level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute key carrying the unformatted message template
pub const MESSAGE_TEMPLATE_KEY: &str = "message_template";

/// A finished log record.
///
/// Built once at emission time and never mutated afterwards; the local
/// sinks borrow it and the export queue receives its own clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    message: String,
    level: Level,
    timestamp: DateTime<Utc>,
    attributes: Attributes,
}

impl LogRecord {
    /// Assemble a record, storing `template` under [`MESSAGE_TEMPLATE_KEY`]
    pub fn build(
        message: impl Into<String>,
        level: Level,
        template: &str,
        mut attributes: Attributes,
        now: DateTime<Utc>,
    ) -> Self {
        attributes.insert(MESSAGE_TEMPLATE_KEY, template);
        Self {
            message: message.into(),
            level,
            timestamp: now,
            attributes,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The template this record was rendered from
    pub fn template(&self) -> Option<&str> {
        match self.attributes.get(MESSAGE_TEMPLATE_KEY) {
            Some(super::attributes::AttributeValue::String(s)) => Some(s),
            _ => None,
        }
    }
}
