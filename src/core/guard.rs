//! Quarantine wrapper around user appenders
//!
//! Every configured appender is wrapped exactly once; loggers that share an
//! appender share its quarantine state. A failure (error return or panic)
//! silences the appender for the configured delay so one misbehaving sink
//! cannot stall the worker or starve the other sinks. The first successful
//! call after the delay clears the quarantine.

use super::appender::{Appender, Encoding, LoggedMessage};
use super::config::AppenderDefinition;
use super::log_level::LogLevel;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Silently skipped because the appender is quarantined.
    Skipped,
    /// The call failed; a new quarantine window just started.
    Failed,
}

struct GuardState {
    appender: Box<dyn Appender>,
    next_activation: Option<Instant>,
}

pub struct GuardedAppender {
    name: String,
    level: LogLevel,
    quarantine_delay: Duration,
    state: Mutex<GuardState>,
}

impl GuardedAppender {
    pub fn new(definition: AppenderDefinition, quarantine_delay: Duration) -> Self {
        Self {
            name: definition.name,
            level: definition.level,
            quarantine_delay,
            state: Mutex::new(GuardState {
                appender: definition.appender,
                next_activation: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level floor; records below it are not offered to this appender.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn is_quarantined(&self) -> bool {
        match self.state.lock().next_activation {
            Some(next) => Instant::now() < next,
            None => false,
        }
    }

    pub fn write(&self, message: &LoggedMessage<'_>) -> WriteOutcome {
        self.forward("write", |appender| appender.write(message))
    }

    pub fn flush(&self) -> WriteOutcome {
        self.forward("flush", |appender| appender.flush())
    }

    pub fn close(&self) -> WriteOutcome {
        self.forward("close", |appender| appender.close())
    }

    pub fn set_encoding(&self, encoding: Encoding) {
        self.forward("set_encoding", |appender| {
            appender.set_encoding(encoding);
            Ok(())
        });
    }

    fn forward(
        &self,
        operation: &str,
        call: impl FnOnce(&mut Box<dyn Appender>) -> super::error::Result<()>,
    ) -> WriteOutcome {
        let mut state = self.state.lock();
        let now = Instant::now();
        if let Some(next) = state.next_activation {
            if now < next {
                return WriteOutcome::Skipped;
            }
        }
        let result = catch_unwind(AssertUnwindSafe(|| call(&mut state.appender)));
        match result {
            Ok(Ok(())) => {
                state.next_activation = None;
                WriteOutcome::Written
            }
            Ok(Err(e)) => {
                eprintln!(
                    "[hotlog] appender '{}' failed during {}: {}",
                    self.name, operation, e
                );
                state.next_activation = Some(now + self.quarantine_delay);
                WriteOutcome::Failed
            }
            Err(_) => {
                eprintln!(
                    "[hotlog] appender '{}' panicked during {}",
                    self.name, operation
                );
                state.next_activation = Some(now + self.quarantine_delay);
                WriteOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for GuardedAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedAppender")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("quarantined", &self.is_quarantined())
            .finish()
    }
}
