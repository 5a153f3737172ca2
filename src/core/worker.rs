//! The single-consumer worker
//!
//! One dedicated thread drains the record queue, resolves each record's
//! appender set, formats once into a scratch buffer, and hands the same view
//! to every appender before releasing the buffer back to the pool. It also
//! owns the pre-allocated constant-message buffer used to report pool
//! exhaustion, so that notice never allocates either.

use super::appender::LoggedMessage;
use super::buffer::LogMessage;
use super::config::Settings;
use super::decode::KeyValue;
use super::formatter::DefaultFormatter;
use super::guard::WriteOutcome;
use super::log_level::LogLevel;
use super::manager::Shared;
use super::registry;
use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerState {
    Starting = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl WorkerState {
    pub(crate) fn from_u8(value: u8) -> WorkerState {
        match value {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// Bounded sleep between dequeue attempts on an empty queue.
const DEQUEUE_BACKOFF: Duration = Duration::from_millis(15);

pub(crate) struct Worker {
    shared: Arc<Shared>,
    receiver: Receiver<LogMessage>,
    formatter: DefaultFormatter,
    scratch: String,
    key_values: Vec<KeyValue>,
    notice: Option<LogMessage>,
    notice_logger: Arc<str>,
    flush_record_interval: usize,
    idle_flush_interval: Duration,
    records_since_flush: usize,
    last_flush: Instant,
}

impl Worker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        receiver: Receiver<LogMessage>,
        settings: &Settings,
    ) -> Self {
        Self {
            shared,
            receiver,
            formatter: DefaultFormatter::new(settings),
            scratch: String::with_capacity(settings.output_buffer_size + 64),
            key_values: Vec::new(),
            notice: Some(LogMessage::constant(128)),
            notice_logger: registry::intern("hotlog"),
            flush_record_interval: settings.flush_record_interval.max(1),
            idle_flush_interval: settings.idle_flush_interval,
            records_since_flush: 0,
            last_flush: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) {
        self.shared.set_worker_state(WorkerState::Running);

        loop {
            if self.shared.worker_state() >= WorkerState::Draining {
                break;
            }
            match self.receiver.recv_timeout(DEQUEUE_BACKOFF) {
                Ok(message) => {
                    self.emit_pending_drop_notice();
                    self.handle(message);
                    self.records_since_flush += 1;
                    if self.records_since_flush >= self.flush_record_interval {
                        self.flush_all();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.emit_pending_drop_notice();
                    if self.last_flush.elapsed() >= self.idle_flush_interval {
                        self.flush_all();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Draining: deliver everything still queued, then close down.
        while let Ok(message) = self.receiver.try_recv() {
            self.handle(message);
        }
        self.emit_pending_drop_notice();
        self.flush_all();
        self.close_all();
        self.shared.set_worker_state(WorkerState::Stopped);
    }

    fn handle(&mut self, message: LogMessage) {
        let message = self.dispatch(message);
        self.shared.pool.release(message);
    }

    /// Format the record and hand it to every resolved appender. Returns the
    /// message so the caller decides where it goes next.
    fn dispatch(&mut self, message: LogMessage) -> LogMessage {
        let node = self.shared.resolver.resolve(message.logger_name());
        if node.appenders().is_empty() {
            return message;
        }

        self.scratch.clear();
        self.key_values.clear();
        if !self.formatter.format(&message, &mut self.scratch) {
            self.shared.metrics.record_formatter_failure();
        }
        self.formatter
            .extract_key_values(&message, &mut self.key_values);

        let view = LoggedMessage {
            level: message.level(),
            timestamp: message.timestamp(),
            logger_name: message.logger_name(),
            text: &self.scratch,
            key_values: &self.key_values,
        };
        for appender in node.appenders() {
            if !message.level().passes(appender.level()) {
                continue;
            }
            if appender.write(&view) == WriteOutcome::Failed {
                self.shared.metrics.record_appender_failure();
            }
        }
        message
    }

    /// Emit the pool-exhaustion notice if producers dropped records since
    /// the last one. Uses the worker-owned constant buffer; no allocation.
    fn emit_pending_drop_notice(&mut self) {
        let dropped = self.shared.take_dropped_for_notice();
        if dropped == 0 {
            return;
        }
        let mut notice = self.notice.take().expect("notice buffer is always returned");
        notice.reset();
        notice.set_level(LogLevel::Warn);
        notice.set_timestamp(Utc::now());
        notice.set_logger_name(Arc::clone(&self.notice_logger));
        let _ = write!(
            notice.constant_text_mut(),
            "Log message pool exhausted; {} record(s) dropped.",
            dropped
        );
        let notice = self.dispatch(notice);
        self.notice = Some(notice);
    }

    fn flush_all(&mut self) {
        for appender in self.shared.resolver.all_appenders() {
            appender.flush();
        }
        self.records_since_flush = 0;
        self.last_flush = Instant::now();
    }

    fn close_all(&mut self) {
        for appender in self.shared.resolver.all_appenders() {
            appender.close();
        }
    }
}
