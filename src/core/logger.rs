//! Logger handles
//!
//! A [`LoggerHandle`] is the cheap, clonable descriptor an application holds
//! per dotted logger name. The hot-path level check is a single atomic load
//! and compare against the level cached at the last resolver refresh; the
//! pool-exhaustion strategy is cached the same way. Handles keep only a weak
//! link to the manager, so a shut-down system turns every call into a no-op
//! instead of keeping it alive.

use super::config::PoolExhaustionStrategy;
use super::log_level::LogLevel;
use super::manager::Shared;
use super::record::RecordBuilder;
use super::resolver::LevelResolver;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

pub struct LoggerState {
    name: Arc<str>,
    cached_level: AtomicU8,
    cached_strategy: AtomicU8,
    shared: Weak<Shared>,
}

impl LoggerState {
    pub(crate) fn new(
        name: Arc<str>,
        shared: Weak<Shared>,
        level: LogLevel,
        strategy: PoolExhaustionStrategy,
    ) -> Self {
        Self {
            name,
            cached_level: AtomicU8::new(level as u8),
            cached_strategy: AtomicU8::new(strategy as u8),
            shared,
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.cached_level.load(Ordering::Relaxed))
    }

    pub(crate) fn strategy(&self) -> PoolExhaustionStrategy {
        PoolExhaustionStrategy::from_u8(self.cached_strategy.load(Ordering::Relaxed))
    }

    /// Re-resolve and cache this logger's effective configuration. Called by
    /// the resolver after every reconfiguration.
    pub(crate) fn refresh(&self, resolver: &LevelResolver) {
        let node = resolver.resolve(&self.name);
        self.cached_level.store(node.level() as u8, Ordering::Relaxed);
        self.cached_strategy
            .store(node.strategy() as u8, Ordering::Relaxed);
    }
}

/// Handle to one named logger. Clones share the cached state.
#[derive(Clone)]
pub struct LoggerHandle {
    state: Arc<LoggerState>,
}

impl LoggerHandle {
    pub(crate) fn from_state(state: Arc<LoggerState>) -> Self {
        Self { state }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Effective level as of the last resolver refresh.
    pub fn level(&self) -> LogLevel {
        self.state.level()
    }

    /// Single compare against the cached level; no locks, no lookup.
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.passes(self.state.level())
    }

    /// Start a record at `level`. Returns `None` when the level is disabled,
    /// the system is shutting down, or the pool is exhausted under a drop
    /// strategy. Under `WaitUntilAvailable` this blocks until a buffer frees
    /// up or shutdown begins.
    pub fn begin_record(&self, level: LogLevel) -> Option<RecordBuilder> {
        if !self.is_enabled(level) {
            return None;
        }
        let shared = self.state.shared.upgrade()?;
        if !shared.accepts_records() {
            return None;
        }

        let message = match self.state.strategy() {
            PoolExhaustionStrategy::Drop => match shared.pool.acquire() {
                Some(message) => message,
                None => {
                    shared.metrics.record_pool_exhausted();
                    shared.metrics.record_dropped();
                    return None;
                }
            },
            PoolExhaustionStrategy::DropAndNotify => match shared.pool.acquire() {
                Some(message) => message,
                None => {
                    shared.metrics.record_pool_exhausted();
                    shared.metrics.record_dropped();
                    shared.note_dropped_for_notice();
                    return None;
                }
            },
            PoolExhaustionStrategy::WaitUntilAvailable => shared.acquire_waiting()?,
        };

        let mut message = message;
        message.stamp(level, Arc::clone(&self.state.name));
        Some(RecordBuilder::new(message, shared))
    }

    /// Like [`begin_record`](Self::begin_record) but always returns a
    /// builder; when the record cannot be started the builder is a no-op.
    /// This is what the logging macros use.
    pub fn record(&self, level: LogLevel) -> RecordBuilder {
        self.begin_record(level).unwrap_or_else(RecordBuilder::disabled)
    }
}

impl std::fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("name", &self.name())
            .field("level", &self.level())
            .finish()
    }
}
