//! The log manager: initialization, logger handles, shutdown
//!
//! [`LogManager::initialize`] validates the configuration, builds the pool,
//! the record queue and the resolver, and starts the worker thread. From then
//! on producers only touch the pieces collected in [`Shared`]; the manager
//! itself exists to hand out logger handles and to drive shutdown.

use super::buffer::LogMessage;
use super::config::LogConfig;
use super::error::Result;
use super::logger::{LoggerHandle, LoggerState};
use super::metrics::LoggerMetrics;
use super::pool::MessagePool;
use super::record::RecordBuilder;
use super::registry;
use super::resolver::LevelResolver;
use super::worker::{Worker, WorkerState};
use crossbeam_channel::{bounded, Sender, TrySendError};
use crossbeam_utils::Backoff;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default used by `Drop` when the manager goes away without an explicit
/// `shutdown` call.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything producers and the worker share. Logger handles hold this
/// weakly; once the manager is gone their calls become no-ops.
pub(crate) struct Shared {
    pub(crate) pool: MessagePool,
    pub(crate) sender: Sender<LogMessage>,
    pub(crate) resolver: LevelResolver,
    pub(crate) metrics: LoggerMetrics,
    worker_state: AtomicU8,
    dropped_for_notice: AtomicU64,
}

impl Shared {
    pub(crate) fn worker_state(&self) -> WorkerState {
        WorkerState::from_u8(self.worker_state.load(Ordering::Acquire))
    }

    pub(crate) fn set_worker_state(&self, state: WorkerState) {
        self.worker_state.store(state as u8, Ordering::Release);
    }

    /// Producers may start records while the worker is starting or running.
    pub(crate) fn accepts_records(&self) -> bool {
        self.worker_state() <= WorkerState::Running
    }

    /// Count a drop that the worker should announce to the appenders.
    pub(crate) fn note_dropped_for_notice(&self) {
        self.dropped_for_notice.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn take_dropped_for_notice(&self) -> u64 {
        self.dropped_for_notice.swap(0, Ordering::Relaxed)
    }

    /// `WaitUntilAvailable`: bounded spin, then park in short slices so a
    /// shutdown arriving mid-wait turns the wait into a drop instead of a
    /// deadlock.
    pub(crate) fn acquire_waiting(&self) -> Option<LogMessage> {
        if let Some(message) = self.pool.acquire() {
            return Some(message);
        }
        self.metrics.record_pool_exhausted();
        self.metrics.record_wait();

        let backoff = Backoff::new();
        while !backoff.is_completed() {
            backoff.snooze();
            if let Some(message) = self.pool.acquire() {
                return Some(message);
            }
        }
        loop {
            if !self.accepts_records() {
                self.metrics.record_dropped();
                return None;
            }
            if let Some(message) = self.pool.acquire_timeout(Duration::from_millis(10)) {
                return Some(message);
            }
        }
    }

    /// Hand a finished record to the worker.
    pub(crate) fn submit(&self, message: LogMessage) {
        if message.is_truncated() {
            self.metrics.record_truncated();
        }
        if !self.accepts_records() {
            self.metrics.record_dropped();
            self.pool.release(message);
            return;
        }
        match self.sender.try_send(message) {
            Ok(()) => {
                self.metrics.record_submitted();
            }
            // Queue capacity equals the pool size, so `Full` cannot happen
            // while ownership is linear; `Disconnected` means shutdown raced
            // us. Either way the buffer must go home.
            Err(TrySendError::Full(message)) | Err(TrySendError::Disconnected(message)) => {
                self.metrics.record_dropped();
                self.pool.release(message);
            }
        }
    }
}

pub struct LogManager {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl LogManager {
    /// Build the logging system and start its worker thread.
    ///
    /// Configuration mistakes (unknown appender references, zero-sized pool)
    /// surface here, synchronously, before anything is spawned.
    pub fn initialize(config: LogConfig) -> Result<Arc<LogManager>> {
        config.validate()?;
        let settings = config.settings.clone();
        registry::set_auto_register_enums(settings.auto_register_enums);

        let resolver = LevelResolver::new(config)?;
        let pool = MessagePool::new(
            settings.pool_size as usize,
            settings.buffer_size as usize,
            settings.string_capacity as usize,
        );
        // Queue capacity >= pool size: an enqueue from a thread holding a
        // buffer can never fail.
        let (sender, receiver) = bounded(settings.pool_size as usize);

        let shared = Arc::new(Shared {
            pool,
            sender,
            resolver,
            metrics: LoggerMetrics::new(),
            worker_state: AtomicU8::new(WorkerState::Starting as u8),
            dropped_for_notice: AtomicU64::new(0),
        });

        let worker = Worker::new(Arc::clone(&shared), receiver, &settings);
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("hotlog-worker".to_string())
            .spawn(move || {
                if catch_unwind(AssertUnwindSafe(|| worker.run())).is_err() {
                    // An uncaught worker error is an unrecoverable bug; all
                    // we can do is say so loudly and stop accepting records.
                    eprintln!(
                        "[hotlog] FATAL: worker thread terminated unexpectedly; \
                         logging is no longer operational"
                    );
                    worker_shared.set_worker_state(WorkerState::Stopped);
                }
            })?;

        Ok(Arc::new(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            shutdown_timeout: settings.shutdown_timeout,
        }))
    }

    /// Handle for a dotted logger name. The name is interned; the handle
    /// caches its effective level and refreshes it on resolver updates.
    pub fn get_logger(self: &Arc<Self>, name: &str) -> LoggerHandle {
        let name = registry::intern(name);
        let node = self.shared.resolver.resolve(&name);
        let state = Arc::new(LoggerState::new(
            name,
            Arc::downgrade(&self.shared),
            node.level(),
            node.strategy(),
        ));
        self.shared.resolver.subscribe(Arc::downgrade(&state));
        LoggerHandle::from_state(state)
    }

    /// Swap in a new logger hierarchy and appender set. Pool and queue sizing
    /// are fixed at initialization and ignored here; appenders kept across
    /// the swap retain their quarantine state.
    pub fn reconfigure(&self, config: LogConfig) -> Result<()> {
        registry::set_auto_register_enums(config.settings.auto_register_enums);
        self.shared.resolver.rebuild(config)
    }

    /// Begin a record through an explicit manager reference. Normally
    /// records start from a [`LoggerHandle`]; this exists for callers that
    /// own neither a handle nor a name worth caching.
    pub fn begin_record(
        self: &Arc<Self>,
        name: &str,
        level: super::log_level::LogLevel,
    ) -> Option<RecordBuilder> {
        self.get_logger(name).begin_record(level)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.shared.metrics
    }

    pub fn pool_size(&self) -> usize {
        self.shared.pool.size()
    }

    pub fn pool_free(&self) -> usize {
        self.shared.pool.count_free()
    }

    /// Drain and stop the worker, then flush and close every appender.
    ///
    /// Idempotent. Returns `true` once the worker has fully stopped within
    /// the configured timeout; producers logging during or after the call
    /// see their records dropped, never a deadlock.
    pub fn shutdown(&self) -> bool {
        if self.shared.worker_state() < WorkerState::Draining {
            self.shared.set_worker_state(WorkerState::Draining);
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let start = std::time::Instant::now();
            loop {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        eprintln!("[hotlog] worker thread panicked during shutdown");
                        return false;
                    }
                    break;
                }
                if start.elapsed() >= self.shutdown_timeout {
                    eprintln!(
                        "[hotlog] worker did not drain within {:?}; some records may be lost",
                        self.shutdown_timeout
                    );
                    return false;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
        self.shared.worker_state() == WorkerState::Stopped
    }
}

impl Drop for LogManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("state", &self.shared.worker_state())
            .field("pool_size", &self.pool_size())
            .field("pool_free", &self.pool_free())
            .finish()
    }
}
