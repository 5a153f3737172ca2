//! Configuration for the logging core
//!
//! [`Settings`] and [`LoggerDefinition`] are plain serde-friendly data so a
//! host can load them from JSON; appender instances are code and are attached
//! through [`LogConfig`] builder calls. Validation happens once, inside
//! `initialize` / `reconfigure`, and surfaces configuration mistakes
//! synchronously.

use super::appender::{Appender, Encoding};
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Policy applied by a producer when the message pool has no free buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PoolExhaustionStrategy {
    /// Drop the record and have the worker emit a pool-exhaustion notice.
    #[default]
    #[serde(alias = "DropLogMessageAndNotifyAppenders")]
    DropAndNotify,
    /// Drop the record silently.
    #[serde(alias = "DropLogMessage")]
    Drop,
    /// Block (bounded spin, then park) until a buffer frees up.
    WaitUntilAvailable,
}

impl PoolExhaustionStrategy {
    pub(crate) fn from_u8(value: u8) -> PoolExhaustionStrategy {
        match value {
            1 => PoolExhaustionStrategy::Drop,
            2 => PoolExhaustionStrategy::WaitUntilAvailable,
            _ => PoolExhaustionStrategy::DropAndNotify,
        }
    }
}

/// Global tunables. Every field has a production-ready default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Buffers in the message pool.
    pub pool_size: u32,
    /// Argument payload bytes per buffer.
    pub buffer_size: u32,
    /// Reference-table slots per buffer.
    pub string_capacity: u32,
    /// Text used when rendering an explicit null argument.
    pub null_display_string: String,
    /// Appended when a record or its output was cut short.
    pub truncated_message_suffix: String,
    /// How long a failing appender stays quarantined.
    pub appender_quarantine_delay: Duration,
    /// Register unknown enum types on first use (allocates once per type).
    pub auto_register_enums: bool,
    /// Prefix pattern expanded ahead of every message body.
    pub prefix_pattern: String,
    /// Encoding pushed to every appender at initialization.
    pub encoding: Encoding,
    /// Capacity of the worker's formatting scratch; output is truncated to it.
    pub output_buffer_size: usize,
    /// Flush appenders after this many records.
    pub flush_record_interval: usize,
    /// Flush appenders after roughly this much idleness.
    pub idle_flush_interval: Duration,
    /// Upper bound on waiting for the worker to drain during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pool_size: 1024,
            buffer_size: 128,
            string_capacity: 32,
            null_display_string: "null".to_string(),
            truncated_message_suffix: " [TRUNCATED]".to_string(),
            appender_quarantine_delay: Duration::from_secs(15),
            auto_register_enums: false,
            prefix_pattern: "%date %time %level %logger - ".to_string(),
            encoding: Encoding::default(),
            output_buffer_size: 4096,
            flush_record_interval: 64,
            idle_flush_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Configuration of one logger subtree, keyed by its dotted name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerDefinition {
    /// Dotted name; the empty string is the root.
    pub name: String,
    /// Effective level; inherited from the parent when absent.
    pub level: Option<LogLevel>,
    /// Names of appenders receiving this subtree's records.
    pub appenders: Vec<String>,
    /// Union the parent's appender set into this one.
    #[serde(default = "default_true")]
    pub include_parent_appenders: bool,
    /// Exhaustion strategy; inherited from the parent when absent.
    pub pool_exhaustion_strategy: Option<PoolExhaustionStrategy>,
}

fn default_true() -> bool {
    true
}

impl LoggerDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            appenders: Vec::new(),
            include_parent_appenders: true,
            pool_exhaustion_strategy: None,
        }
    }

    /// The root definition: empty name, no parent to inherit from.
    pub fn root() -> Self {
        Self {
            name: String::new(),
            level: Some(LogLevel::Info),
            appenders: Vec::new(),
            include_parent_appenders: false,
            pool_exhaustion_strategy: Some(PoolExhaustionStrategy::default()),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_appender(mut self, name: impl Into<String>) -> Self {
        self.appenders.push(name.into());
        self
    }

    #[must_use]
    pub fn with_include_parent_appenders(mut self, include: bool) -> Self {
        self.include_parent_appenders = include;
        self
    }

    #[must_use]
    pub fn with_exhaustion_strategy(mut self, strategy: PoolExhaustionStrategy) -> Self {
        self.pool_exhaustion_strategy = Some(strategy);
        self
    }
}

/// A named appender instance plus its optional level floor.
pub struct AppenderDefinition {
    pub name: String,
    /// Records below this level never reach the appender.
    pub level: LogLevel,
    pub appender: Box<dyn Appender>,
}

impl AppenderDefinition {
    pub fn new(name: impl Into<String>, appender: impl Appender + 'static) -> Self {
        Self {
            name: name.into(),
            level: LogLevel::Trace,
            appender: Box::new(appender),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl std::fmt::Debug for AppenderDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppenderDefinition")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Everything `initialize` needs: tunables, the logger hierarchy, and the
/// appender instances.
#[derive(Debug, Default)]
pub struct LogConfig {
    pub settings: Settings,
    pub root: RootDefinition,
    pub loggers: Vec<LoggerDefinition>,
    pub appenders: Vec<AppenderDefinition>,
}

/// Newtype wrapper keeping the root definition well-formed by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootDefinition(LoggerDefinition);

impl Default for RootDefinition {
    fn default() -> Self {
        Self(LoggerDefinition::root())
    }
}

impl RootDefinition {
    pub(crate) fn definition(&self) -> &LoggerDefinition {
        &self.0
    }

    pub fn level(&self) -> LogLevel {
        self.0.level.unwrap_or(LogLevel::Info)
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_root_level(mut self, level: LogLevel) -> Self {
        self.root.0.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_root_appender(mut self, name: impl Into<String>) -> Self {
        self.root.0.appenders.push(name.into());
        self
    }

    #[must_use]
    pub fn with_root_exhaustion_strategy(mut self, strategy: PoolExhaustionStrategy) -> Self {
        self.root.0.pool_exhaustion_strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, definition: LoggerDefinition) -> Self {
        self.loggers.push(definition);
        self
    }

    #[must_use]
    pub fn with_appender(mut self, definition: AppenderDefinition) -> Self {
        self.appenders.push(definition);
        self
    }

    /// Check internal consistency. Called by `initialize`/`reconfigure`; all
    /// failures here surface synchronously, before any thread is started.
    pub fn validate(&self) -> Result<()> {
        if self.settings.pool_size == 0 {
            return Err(LoggerError::config("pool_size", "must be at least 1"));
        }
        if self.settings.buffer_size == 0 {
            return Err(LoggerError::config("buffer_size", "must be at least 1"));
        }
        if self.settings.string_capacity == 0 || self.settings.string_capacity > 256 {
            return Err(LoggerError::config(
                "string_capacity",
                "must be between 1 and 256 (one-byte indices)",
            ));
        }
        if self.settings.output_buffer_size <= self.settings.truncated_message_suffix.len() {
            return Err(LoggerError::config(
                "output_buffer_size",
                "must exceed the truncated-message suffix length",
            ));
        }

        let mut appender_names = HashSet::new();
        for definition in &self.appenders {
            if definition.name.is_empty() {
                return Err(LoggerError::config("appender", "name must not be empty"));
            }
            if !appender_names.insert(definition.name.as_str()) {
                return Err(LoggerError::config(
                    "appender",
                    format!("duplicate appender name '{}'", definition.name),
                ));
            }
        }

        for reference in &self.root.0.appenders {
            if !appender_names.contains(reference.as_str()) {
                return Err(LoggerError::unknown_appender("<root>", reference));
            }
        }
        let mut logger_names = HashSet::new();
        for definition in &self.loggers {
            if definition.name.is_empty() {
                return Err(LoggerError::config(
                    "logger",
                    "only the root may have an empty name",
                ));
            }
            if !logger_names.insert(definition.name.as_str()) {
                return Err(LoggerError::config(
                    "logger",
                    format!("duplicate logger name '{}'", definition.name),
                ));
            }
            for reference in &definition.appenders {
                if !appender_names.contains(reference.as_str()) {
                    return Err(LoggerError::unknown_appender(&definition.name, reference));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appender::LoggedMessage;

    struct NullAppender;

    impl Appender for NullAppender {
        fn name(&self) -> &str {
            "null"
        }

        fn write(&mut self, _message: &LoggedMessage<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pool_size, 1024);
        assert_eq!(settings.buffer_size, 128);
        assert_eq!(settings.string_capacity, 32);
        assert_eq!(settings.null_display_string, "null");
        assert_eq!(settings.truncated_message_suffix, " [TRUNCATED]");
        assert_eq!(settings.appender_quarantine_delay, Duration::from_secs(15));
        assert!(!settings.auto_register_enums);
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let settings = Settings {
            pool_size: 16,
            auto_register_enums: true,
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pool_size, 16);
        assert!(back.auto_register_enums);
        assert_eq!(back.buffer_size, 128);
    }

    #[test]
    fn test_logger_definition_serde_aliases() {
        let json = r#"{
            "name": "App.Db",
            "level": "Warn",
            "appenders": ["file"],
            "pool_exhaustion_strategy": "DropLogMessageAndNotifyAppenders"
        }"#;
        let definition: LoggerDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.name, "App.Db");
        assert_eq!(definition.level, Some(LogLevel::Warn));
        assert!(definition.include_parent_appenders);
        assert_eq!(
            definition.pool_exhaustion_strategy,
            Some(PoolExhaustionStrategy::DropAndNotify)
        );
    }

    #[test]
    fn test_validate_accepts_consistent_config() {
        let config = LogConfig::new()
            .with_appender(AppenderDefinition::new("null", NullAppender))
            .with_root_appender("null")
            .with_logger(LoggerDefinition::new("App").with_appender("null"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_appender() {
        let config = LogConfig::new()
            .with_logger(LoggerDefinition::new("App").with_appender("missing"));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LoggerError::UnknownAppender { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let config = LogConfig::new().with_settings(Settings {
            pool_size: 0,
            ..Settings::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_loggers() {
        let config = LogConfig::new()
            .with_logger(LoggerDefinition::new("App"))
            .with_logger(LoggerDefinition::new("App"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_from_u8_roundtrip() {
        for strategy in [
            PoolExhaustionStrategy::DropAndNotify,
            PoolExhaustionStrategy::Drop,
            PoolExhaustionStrategy::WaitUntilAvailable,
        ] {
            assert_eq!(PoolExhaustionStrategy::from_u8(strategy as u8), strategy);
        }
    }
}
