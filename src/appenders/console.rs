//! Console appender implementation

use crate::core::{Appender, Level, LogRecord, Result, MESSAGE_TEMPLATE_KEY};
use colored::Colorize;

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Output stream a record is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// DEBUG and INFO go to stdout, everything more severe to stderr
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Debug | Level::Info => Stream::Stdout,
            Level::Warning | Level::Error | Level::Critical => Stream::Stderr,
        }
    }
}

pub struct ConsoleAppender {
    use_colors: bool,
    timestamp_format: String,
    show_attributes: bool,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            show_attributes: true,
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    /// Set a strftime-compatible timestamp format
    ///
    /// # Examples
    ///
    /// ```
    /// use otlp_log_emitter::appenders::ConsoleAppender;
    ///
    /// let appender = ConsoleAppender::new()
    ///     .with_timestamp_format("%d/%b/%Y:%H:%M:%S %z");
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format_str: &str) -> Self {
        self.timestamp_format = format_str.to_string();
        self
    }

    /// Print only the message, leaving out the attribute fields
    #[must_use]
    pub fn without_attributes(mut self) -> Self {
        self.show_attributes = false;
        self
    }

    pub(crate) fn format_line(&self, record: &LogRecord) -> String {
        let level_str = if self.use_colors {
            format!("{:8}", record.level().to_str())
                .color(record.level().color_code())
                .to_string()
        } else {
            format!("{:8}", record.level().to_str())
        };

        let base = format!(
            "[{}] [{}] {}",
            record.timestamp().format(&self.timestamp_format),
            level_str,
            escape_newlines(record.message())
        );

        if !self.show_attributes {
            return base;
        }
        // The template is already visible in the rendered message
        let fields: Vec<String> = record
            .attributes()
            .iter()
            .filter(|(key, _)| key.as_str() != MESSAGE_TEMPLATE_KEY)
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if fields.is_empty() {
            base
        } else {
            format!("{} {}", base, escape_newlines(&fields.join(" ")))
        }
    }
}

/// Keep one record on one line so a message cannot forge extra entries
fn escape_newlines(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let output = self.format_line(record);

        match Stream::for_level(record.level()) {
            Stream::Stdout => println!("{}", output),
            Stream::Stderr => eprintln!("{}", output),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Attributes;
    use chrono::{TimeZone, Utc};

    fn record(message: &str, level: Level) -> LogRecord {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        LogRecord::build(message, level, message, Attributes::new().with("user", "ada"), ts)
    }

    #[test]
    fn test_stream_routing() {
        assert_eq!(Stream::for_level(Level::Debug), Stream::Stdout);
        assert_eq!(Stream::for_level(Level::Info), Stream::Stdout);
        assert_eq!(Stream::for_level(Level::Warning), Stream::Stderr);
        assert_eq!(Stream::for_level(Level::Error), Stream::Stderr);
        assert_eq!(Stream::for_level(Level::Critical), Stream::Stderr);
    }

    #[test]
    fn test_plain_line_format() {
        let appender = ConsoleAppender::with_colors(false);
        let line = appender.format_line(&record("hello", Level::Info));

        assert!(line.starts_with("[2024-03-01T08:30:00.000Z] [INFO    ] hello"));
        assert!(line.ends_with("hello user=ada"));
    }

    #[test]
    fn test_newlines_are_escaped() {
        let appender = ConsoleAppender::with_colors(false).without_attributes();
        let line = appender.format_line(&record("line1\nFAKE ENTRY", Level::Warning));

        assert!(!line.contains('\n'));
        assert!(line.ends_with("line1\\nFAKE ENTRY"));
    }

    #[test]
    fn test_custom_timestamp() {
        let appender = ConsoleAppender::with_colors(false).with_timestamp_format("%H:%M");
        assert!(appender
            .format_line(&record("m", Level::Debug))
            .starts_with("[08:30]"));
    }
}
