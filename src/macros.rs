//! Logging macros
//!
//! Thin sugar over [`LoggerHandle::record`](crate::LoggerHandle::record):
//! each argument is appended through its typed encoder, so nothing here
//! formats or allocates on the calling thread.
//!
//! # Examples
//!
//! ```no_run
//! use hotlog::prelude::*;
//! use hotlog::{info, warn};
//!
//! let manager = LogManager::initialize(LogConfig::new()).unwrap();
//! let logger = manager.get_logger("App.Net");
//!
//! info!(logger, "listening on port ", 8080u16);
//! warn!(logger, "retry ", 3u32, " of ", 5u32);
//! ```

/// Log typed arguments at an explicit level.
///
/// Arguments are only evaluated when the record is actually started, so a
/// disabled level costs one atomic load.
#[macro_export]
macro_rules! log_record {
    ($logger:expr, $level:expr, $($arg:expr),+ $(,)?) => {{
        let mut record = $logger.record($level);
        if record.is_enabled() {
            $( record.append(&$arg); )+
            record.submit();
        }
    }};
}

/// Log typed arguments at trace level.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log_record!($logger, $crate::LogLevel::Trace, $($arg),+)
    };
}

/// Log typed arguments at debug level.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log_record!($logger, $crate::LogLevel::Debug, $($arg),+)
    };
}

/// Log typed arguments at info level.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log_record!($logger, $crate::LogLevel::Info, $($arg),+)
    };
}

/// Log typed arguments at warn level.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log_record!($logger, $crate::LogLevel::Warn, $($arg),+)
    };
}

/// Log typed arguments at error level.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log_record!($logger, $crate::LogLevel::Error, $($arg),+)
    };
}

/// Log typed arguments at fatal level.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::log_record!($logger, $crate::LogLevel::Fatal, $($arg),+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogConfig, LogLevel, LogManager};

    #[test]
    fn test_macros_compile_against_handle() {
        let manager = LogManager::initialize(LogConfig::new()).unwrap();
        let logger = manager.get_logger("macro.test");

        log_record!(logger, LogLevel::Info, "value: ", 42i32);
        trace!(logger, "below the default level, evaluated lazily");
        debug!(logger, "count ", 5u8);
        info!(logger, "items ", 100u32, " ready");
        warn!(logger, "retry ", 1u8, " of ", 3u8);
        error!(logger, "code ", 500u16);
        fatal!(logger, "giving up after ", 3u8, " attempts");

        manager.shutdown();
    }
}
