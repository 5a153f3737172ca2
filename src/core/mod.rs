//! Core logging types and machinery

pub mod appender;
pub mod buffer;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod formatter;
pub mod guard;
pub mod log_level;
pub mod logger;
pub mod manager;
pub mod metrics;
pub mod pattern;
pub mod pool;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod thread_info;
pub mod worker;

pub use appender::{Appender, Encoding, LoggedMessage};
pub use buffer::{LogMessage, MessageKind};
pub use config::{
    AppenderDefinition, LogConfig, LoggerDefinition, PoolExhaustionStrategy, Settings,
};
pub use decode::{DecodeOptions, KeyValue};
pub use encode::ArgTag;
pub use error::{LoggerError, Result};
pub use formatter::{DefaultFormatter, Formatter};
pub use guard::{GuardedAppender, WriteOutcome};
pub use log_level::LogLevel;
pub use logger::LoggerHandle;
pub use manager::{LogManager, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use pattern::PatternLayout;
pub use pool::MessagePool;
pub use record::{Loggable, RecordBuilder};
pub use registry::{register_enum, register_unmanaged, LoggableEnum, UnmanagedValue};
pub use resolver::{LevelResolver, ResolverNode};
pub use worker::WorkerState;
