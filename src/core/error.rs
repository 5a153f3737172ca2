//! Error types for the logging core

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error from an appender's sink
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Logger definition references an appender name that was never registered
    #[error("Logger '{logger}' references unknown appender '{appender}'")]
    UnknownAppender { logger: String, appender: String },

    /// Message pool has no free buffer
    #[error("Log message pool exhausted: {pool_size} buffers all in flight")]
    PoolExhausted { pool_size: usize },

    /// Argument payload or string table capacity exceeded; the record is truncated
    #[error("Encoding overflow: {0}")]
    EncodingOverflow(String),

    /// Argument stream could not be decoded
    #[error("Malformed argument stream at byte {offset}: {message}")]
    MalformedStream { offset: usize, message: String },

    /// Appender failed to write, flush or close
    #[error("Appender '{name}' failed: {message}")]
    AppenderError { name: String, message: String },

    /// The manager has been shut down
    #[error("Logging system already stopped")]
    Stopped,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-appender configuration error
    pub fn unknown_appender(logger: impl Into<String>, appender: impl Into<String>) -> Self {
        LoggerError::UnknownAppender {
            logger: logger.into(),
            appender: appender.into(),
        }
    }

    /// Create a malformed-stream error
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        LoggerError::MalformedStream {
            offset,
            message: message.into(),
        }
    }

    /// Create an appender error
    pub fn appender(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::AppenderError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("pool", "size must be non-zero");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::unknown_appender("App.Db", "udp");
        assert!(matches!(err, LoggerError::UnknownAppender { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::PoolExhausted { pool_size: 1024 };
        assert_eq!(
            err.to_string(),
            "Log message pool exhausted: 1024 buffers all in flight"
        );

        let err = LoggerError::unknown_appender("App.Db", "udp");
        assert_eq!(
            err.to_string(),
            "Logger 'App.Db' references unknown appender 'udp'"
        );

        let err = LoggerError::malformed(17, "unknown tag 0x5f");
        assert_eq!(
            err.to_string(),
            "Malformed argument stream at byte 17: unknown tag 0x5f"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::from(io_err);

        assert!(matches!(err, LoggerError::IoError(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
