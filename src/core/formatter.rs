//! Record formatting
//!
//! [`DefaultFormatter`] turns a record into its final text: prefix pattern,
//! decoded message body, truncation suffix. Formatting failures never
//! propagate; the output becomes a diagnostic line built from a secondary
//! path (unformatted dump) that cannot itself fail.

use super::buffer::{LogMessage, MessageKind};
use super::config::Settings;
use super::decode::{self, DecodeOptions, KeyValue};
use super::pattern::PatternLayout;
use std::fmt::Write;

/// Renders records into a caller-supplied buffer.
pub trait Formatter: Send {
    /// Expand `message` into `out`. Implementations must always produce
    /// usable text, degrading instead of failing.
    fn format_into(&self, message: &LogMessage, out: &mut String);
}

pub struct DefaultFormatter {
    pattern: PatternLayout,
    null_display: String,
    truncated_suffix: String,
    /// Logical output capacity in bytes; longer output is cut and suffixed.
    max_output: usize,
}

impl DefaultFormatter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            pattern: PatternLayout::parse(&settings.prefix_pattern),
            null_display: settings.null_display_string.clone(),
            truncated_suffix: settings.truncated_message_suffix.clone(),
            max_output: settings.output_buffer_size,
        }
    }

    /// Format prefix and body into `out`. Returns `false` when the normal
    /// path failed and the diagnostic fallback text was produced instead.
    pub fn format(&self, message: &LogMessage, out: &mut String) -> bool {
        self.pattern.write_prefix(out, message);

        if message.kind() == MessageKind::Constant {
            out.push_str(message.constant_text());
            self.enforce_limit(out);
            return true;
        }

        let opts = DecodeOptions {
            null_display: &self.null_display,
        };
        let body_start = out.len();
        match decode::decode_formatted(message, &opts, out) {
            Ok(()) => {
                if message.is_truncated() {
                    out.push_str(&self.truncated_suffix);
                }
                self.enforce_limit(out);
                true
            }
            Err(reason) => {
                out.truncate(body_start);
                let _ = write!(
                    out,
                    "An error occurred during formatting: {} - Unformatted message: ",
                    reason
                );
                decode::decode_unformatted(message, &opts, out);
                self.enforce_limit(out);
                false
            }
        }
    }

    /// Extract the record's structured-data pairs. Malformed streams yield
    /// whatever pairs were decodable before the damage.
    pub fn extract_key_values(&self, message: &LogMessage, out: &mut Vec<KeyValue>) {
        if message.kind() != MessageKind::Pooled {
            return;
        }
        let opts = DecodeOptions {
            null_display: &self.null_display,
        };
        let _ = decode::decode_key_values(message, &opts, out);
    }

    /// Cut output back to the configured capacity, overwriting the tail with
    /// the truncation suffix.
    fn enforce_limit(&self, out: &mut String) {
        if out.len() <= self.max_output {
            return;
        }
        let mut cut = self.max_output.saturating_sub(self.truncated_suffix.len());
        while cut > 0 && !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str(&self.truncated_suffix);
    }
}

impl Formatter for DefaultFormatter {
    fn format_into(&self, message: &LogMessage, out: &mut String) {
        self.format(message, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use chrono::DateTime;
    use std::sync::Arc;

    fn formatter(max_output: usize) -> DefaultFormatter {
        DefaultFormatter::new(&Settings {
            prefix_pattern: "%level %logger - ".to_string(),
            output_buffer_size: max_output,
            ..Settings::default()
        })
    }

    fn record() -> LogMessage {
        let mut message = LogMessage::new_pooled(128, 8);
        message.stamp(LogLevel::Info, Arc::from("App"));
        message.set_timestamp(DateTime::from_timestamp_micros(0).unwrap());
        message
    }

    #[test]
    fn test_prefix_and_body() {
        let mut message = record();
        message.append_str("ready on port ", None);
        message.append_u16(8080, None);

        let mut out = String::new();
        assert!(formatter(4096).format(&message, &mut out));
        assert_eq!(out, "INFO App - ready on port 8080");
    }

    #[test]
    fn test_truncated_record_gets_suffix() {
        let mut message = LogMessage::new_pooled(8, 8);
        message.stamp(LogLevel::Info, Arc::from("App"));
        message.append_str("abc", None); // 1 + 4 + 3 = 8 bytes, fills exactly
        message.append_bool(true, None); // overflows
        assert!(message.is_truncated());

        let mut out = String::new();
        assert!(formatter(4096).format(&message, &mut out));
        assert!(out.ends_with(" [TRUNCATED]"));
        assert!(out.contains("abc"));
    }

    #[test]
    fn test_output_over_capacity_ends_with_suffix() {
        let mut message = record();
        message.append_str("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", None);

        let max = 32;
        let mut out = String::new();
        formatter(max).format(&message, &mut out);
        assert_eq!(out.len(), max);
        assert!(out.ends_with(" [TRUNCATED]"));
    }

    #[test]
    fn test_malformed_stream_uses_fallback_text() {
        let mut message = record();
        message.append_u64(7, None);
        let mut chopped = LogMessage::new_pooled(5, 8);
        chopped.stamp(LogLevel::Info, Arc::from("App"));
        chopped
            .reserve(5)
            .unwrap()
            .copy_from_slice(&message.data()[..5]);

        let mut out = String::new();
        assert!(!formatter(4096).format(&chopped, &mut out));
        assert!(out.contains("An error occurred during formatting:"));
        assert!(out.contains("Unformatted message:"));
    }

    #[test]
    fn test_constant_message() {
        let mut message = LogMessage::constant(64);
        message.set_level(LogLevel::Warn);
        message.set_timestamp(DateTime::from_timestamp_micros(0).unwrap());
        message.set_logger_name(Arc::from("hotlog"));
        message.constant_text_mut().push_str("pool exhausted");

        let mut out = String::new();
        assert!(formatter(4096).format(&message, &mut out));
        assert_eq!(out, "WARN hotlog - pool exhausted");
    }
}
