//! # hotlog
//!
//! A high-throughput, allocation-free structured logging library for
//! latency-sensitive processes.
//!
//! ## Features
//!
//! - **Zero-allocation producers**: after initialization, recording a log
//!   message performs no heap allocation on the calling thread
//! - **Single background worker**: all formatting and appender I/O happens
//!   off the hot path, on one dedicated thread
//! - **Bounded memory**: a fixed pool of reusable message buffers; pool
//!   exhaustion is governed by a per-logger policy (drop, drop-and-notify,
//!   or wait)
//! - **Hierarchical configuration**: dotted logger names resolve through a
//!   trie to an effective level, appender set and exhaustion strategy
//! - **Fault isolation**: a failing appender is quarantined for a configured
//!   delay instead of stalling the worker or the other appenders
//!
//! ## Example
//!
//! ```no_run
//! use hotlog::prelude::*;
//! use hotlog::appenders::ConsoleAppender;
//!
//! let config = LogConfig::new()
//!     .with_appender(AppenderDefinition::new("console", ConsoleAppender::new()))
//!     .with_root_appender("console")
//!     .with_root_level(LogLevel::Debug);
//!
//! let manager = LogManager::initialize(config).unwrap();
//! let logger = manager.get_logger("App.Net");
//!
//! if let Some(mut record) = logger.begin_record(LogLevel::Info) {
//!     record
//!         .append(&"connection from ")
//!         .append(&"10.0.0.7")
//!         .append_key_value("port", &8080u16);
//!     record.submit();
//! }
//!
//! manager.shutdown();
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{ConsoleAppender, FileAppender};
    pub use crate::core::{
        Appender, AppenderDefinition, Encoding, Formatter, KeyValue, Loggable, LogConfig,
        LoggedMessage, LoggerDefinition, LoggerError, LoggerHandle, LoggerMetrics, LogLevel,
        LogManager, PoolExhaustionStrategy, RecordBuilder, Result, Settings,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

pub use crate::appenders::{ConsoleAppender, FileAppender};
pub use crate::core::{
    register_enum, register_unmanaged, Appender, AppenderDefinition, Encoding, Formatter,
    KeyValue, Loggable, LogConfig, LoggedMessage, LoggerDefinition, LoggerError, LoggerHandle,
    LoggerMetrics, LogLevel, LogManager, PoolExhaustionStrategy, RecordBuilder, Result, Settings,
    DEFAULT_SHUTDOWN_TIMEOUT,
};

use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

fn global_manager() -> &'static RwLock<Option<Arc<LogManager>>> {
    static GLOBAL: OnceLock<RwLock<Option<Arc<LogManager>>>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(None))
}

/// Initialize the process-wide logging system.
///
/// Fails when called twice without an intervening [`shutdown`], and on any
/// configuration error.
pub fn initialize(config: LogConfig) -> Result<()> {
    let mut slot = global_manager().write();
    if slot.is_some() {
        return Err(LoggerError::config(
            "initialize",
            "logging system already initialized",
        ));
    }
    *slot = Some(LogManager::initialize(config)?);
    Ok(())
}

/// Handle for a dotted logger name from the process-wide system.
pub fn get_logger(name: &str) -> Result<LoggerHandle> {
    global_manager()
        .read()
        .as_ref()
        .map(|manager| manager.get_logger(name))
        .ok_or(LoggerError::Stopped)
}

/// Swap the process-wide logger hierarchy and appender set.
pub fn reconfigure(config: LogConfig) -> Result<()> {
    global_manager()
        .read()
        .as_ref()
        .ok_or(LoggerError::Stopped)?
        .reconfigure(config)
}

/// Shut down the process-wide logging system: drain, flush, close.
/// Idempotent; returns `true` when the worker stopped cleanly (or was never
/// started).
pub fn shutdown() -> bool {
    let manager = global_manager().write().take();
    match manager {
        Some(manager) => manager.shutdown(),
        None => true,
    }
}
