//! Appender trait for log output destinations

use super::decode::KeyValue;
use super::error::Result;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};

/// Character encoding an appender emits. UTF-8 is the default everywhere;
/// ASCII asks the appender to escape or strip non-ASCII output for legacy
/// sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
}

/// The fully formatted record handed to an appender by the worker.
///
/// Borrows the worker's scratch buffers; appenders must copy whatever they
/// keep past the call.
#[derive(Debug, Clone, Copy)]
pub struct LoggedMessage<'a> {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub logger_name: &'a str,
    /// Prefix-pattern output followed by the decoded message body.
    pub text: &'a str,
    /// Structured-data pairs extracted from the record, stream order.
    pub key_values: &'a [KeyValue],
}

/// A sink for formatted records. Appenders are stateful and single-writer:
/// only the worker thread calls into them after initialization.
pub trait Appender: Send {
    fn name(&self) -> &str;

    fn write(&mut self, message: &LoggedMessage<'_>) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_encoding(&mut self, _encoding: Encoding) {}
}
