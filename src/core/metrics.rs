//! Logger metrics for observability
//!
//! Counters for monitoring the health of the logging pipeline: records
//! submitted and dropped, pool-exhaustion and wait events, truncations, and
//! failures in formatting or appending.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records successfully enqueued for the worker
    submitted: AtomicU64,

    /// Records dropped because the pool was exhausted
    dropped: AtomicU64,

    /// Number of times a producer found the pool empty
    pool_exhausted_events: AtomicU64,

    /// Number of times a producer blocked waiting for a free buffer
    wait_events: AtomicU64,

    /// Records whose argument stream overflowed and was truncated
    truncated: AtomicU64,

    /// Records that fell back to the formatter-failure text
    formatter_failures: AtomicU64,

    /// Individual appender write failures (each starts a quarantine)
    appender_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            pool_exhausted_events: AtomicU64::new(0),
            wait_events: AtomicU64::new(0),
            truncated: AtomicU64::new(0),
            formatter_failures: AtomicU64::new(0),
            appender_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pool_exhausted_events(&self) -> u64 {
        self.pool_exhausted_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn wait_events(&self) -> u64 {
        self.wait_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn truncated(&self) -> u64 {
        self.truncated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn formatter_failures(&self) -> u64 {
        self.formatter_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn appender_failures(&self) -> u64 {
        self.appender_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pool_exhausted(&self) -> u64 {
        self.pool_exhausted_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_wait(&self) -> u64 {
        self.wait_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_truncated(&self) -> u64 {
        self.truncated.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_formatter_failure(&self) -> u64 {
        self.formatter_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_appender_failure(&self) -> u64 {
        self.appender_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of attempted records that were dropped, 0.0 - 100.0.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped() as f64;
        let total = self.submitted() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.pool_exhausted_events.store(0, Ordering::Relaxed);
        self.wait_events.store(0, Ordering::Relaxed);
        self.truncated.store(0, Ordering::Relaxed);
        self.formatter_failures.store(0, Ordering::Relaxed);
        self.appender_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Snapshot of the current values.
    fn clone(&self) -> Self {
        Self {
            submitted: AtomicU64::new(self.submitted()),
            dropped: AtomicU64::new(self.dropped()),
            pool_exhausted_events: AtomicU64::new(self.pool_exhausted_events()),
            wait_events: AtomicU64::new(self.wait_events()),
            truncated: AtomicU64::new(self.truncated()),
            formatter_failures: AtomicU64::new(self.formatter_failures()),
            appender_failures: AtomicU64::new(self.appender_failures()),
        }
    }
}
