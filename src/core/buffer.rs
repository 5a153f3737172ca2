//! Pooled log message buffers
//!
//! A [`LogMessage`] is the unit that travels from a producer thread to the
//! worker: a fixed-capacity byte region holding the encoded argument stream,
//! a bounded table of shared string references, and the record metadata
//! (level, timestamp, logger, thread). All storage is sized once at
//! construction; nothing here grows after the pool is built.
//!
//! Ownership is linear: pool free-list -> producer -> queue -> worker ->
//! pool free-list. Whoever holds the value may mutate it; the worker is the
//! only releaser.

use super::log_level::LogLevel;
use super::thread_info;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Distinguishes pooled buffers from the two special variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Lives in the pool and cycles through producers and the worker.
    Pooled,
    /// Zero-capacity placeholder; every append is a no-op and submit drops it.
    Empty,
    /// Carries only a pre-formatted text, used for internal notices.
    Constant,
}

#[derive(Debug)]
pub struct LogMessage {
    kind: MessageKind,
    bytes: Box<[u8]>,
    len: usize,
    strings: Vec<Arc<str>>,
    string_capacity: usize,
    truncated: bool,
    sentinel_written: bool,
    level: LogLevel,
    timestamp: DateTime<Utc>,
    logger_name: Option<Arc<str>>,
    thread_id: u64,
    thread_name: Option<Arc<str>>,
    constant_text: String,
}

impl LogMessage {
    /// A pooled buffer with the configured payload and string-table capacity.
    pub fn new_pooled(buffer_size: usize, string_capacity: usize) -> Self {
        Self {
            kind: MessageKind::Pooled,
            bytes: vec![0u8; buffer_size].into_boxed_slice(),
            len: 0,
            strings: Vec::with_capacity(string_capacity),
            string_capacity,
            truncated: false,
            sentinel_written: false,
            level: LogLevel::Off,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            logger_name: None,
            thread_id: 0,
            thread_name: None,
            constant_text: String::new(),
        }
    }

    /// The empty sentinel: zero capacity, never enters the pool.
    pub fn empty() -> Self {
        Self {
            kind: MessageKind::Empty,
            bytes: Box::from([]),
            len: 0,
            strings: Vec::new(),
            string_capacity: 0,
            truncated: false,
            sentinel_written: false,
            level: LogLevel::Off,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            logger_name: None,
            thread_id: 0,
            thread_name: None,
            constant_text: String::new(),
        }
    }

    /// A constant-message buffer whose text is rewritten in place by its
    /// single owner. `text_capacity` bounds the text; the worker keeps the
    /// writes within it so the buffer never reallocates.
    pub fn constant(text_capacity: usize) -> Self {
        Self {
            kind: MessageKind::Constant,
            bytes: Box::from([]),
            len: 0,
            strings: Vec::new(),
            string_capacity: 0,
            truncated: false,
            sentinel_written: false,
            level: LogLevel::Warn,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            logger_name: None,
            thread_id: 0,
            thread_name: None,
            constant_text: String::with_capacity(text_capacity),
        }
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[inline]
    pub fn is_pooled(&self) -> bool {
        self.kind == MessageKind::Pooled
    }

    /// Clear all record state so the buffer can be handed out again.
    /// Capacities are retained; nothing is freed or reallocated besides the
    /// dropped string references.
    pub fn reset(&mut self) {
        self.len = 0;
        self.strings.clear();
        self.truncated = false;
        self.sentinel_written = false;
        self.level = LogLevel::Off;
        self.logger_name = None;
        self.thread_id = 0;
        self.thread_name = None;
        self.constant_text.clear();
    }

    /// Stamp the record metadata: level, wall-clock timestamp, owning logger
    /// and calling thread. Called by the producer right after acquire.
    pub fn stamp(&mut self, level: LogLevel, logger_name: Arc<str>) {
        let thread = thread_info::current();
        self.level = level;
        self.timestamp = Utc::now();
        self.logger_name = Some(logger_name);
        self.thread_id = thread.id;
        self.thread_name = thread.name;
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub(crate) fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    pub(crate) fn set_logger_name(&mut self, name: Arc<str>) {
        self.logger_name = Some(name);
    }

    pub fn logger_name(&self) -> &str {
        self.logger_name.as_deref().unwrap_or("")
    }

    #[inline]
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// The encoded argument stream written so far.
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Reserve `n` bytes of payload, marking the record truncated when they
    /// do not fit. The first failed reservation writes the truncation
    /// sentinel if at least one byte remains.
    pub(crate) fn reserve(&mut self, n: usize) -> Option<&mut [u8]> {
        if self.truncated {
            return None;
        }
        if self.len + n > self.bytes.len() {
            self.mark_truncated();
            return None;
        }
        let start = self.len;
        self.len += n;
        Some(&mut self.bytes[start..start + n])
    }

    pub(crate) fn mark_truncated(&mut self) {
        self.truncated = true;
        if !self.sentinel_written && self.len < self.bytes.len() {
            self.bytes[self.len] = super::encode::ArgTag::EndOfTruncatedMessage as u8;
            self.len += 1;
            self.sentinel_written = true;
        }
    }

    /// Store a string reference, returning its table index. A full table
    /// returns `None`; callers drop the argument rather than grow the table.
    pub(crate) fn push_string(&mut self, s: Arc<str>) -> Option<u8> {
        if self.strings.len() >= self.string_capacity {
            return None;
        }
        let index = self.strings.len() as u8;
        self.strings.push(s);
        Some(index)
    }

    pub(crate) fn get_string(&self, index: u8) -> Option<&str> {
        self.strings.get(index as usize).map(|s| s.as_ref())
    }

    pub(crate) fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Text of a constant-message buffer.
    pub fn constant_text(&self) -> &str {
        &self.constant_text
    }

    pub(crate) fn constant_text_mut(&mut self) -> &mut String {
        &mut self.constant_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pooled_construction() {
        let msg = LogMessage::new_pooled(128, 32);
        assert!(msg.is_pooled());
        assert_eq!(msg.capacity(), 128);
        assert_eq!(msg.data().len(), 0);
        assert!(!msg.is_truncated());
    }

    #[test]
    fn test_empty_sentinel() {
        let mut msg = LogMessage::empty();
        assert_eq!(msg.kind(), MessageKind::Empty);
        assert_eq!(msg.capacity(), 0);
        assert!(msg.reserve(1).is_none());
        assert!(msg.is_truncated());
    }

    #[test]
    fn test_stamp_records_thread() {
        let mut msg = LogMessage::new_pooled(64, 4);
        msg.stamp(LogLevel::Info, Arc::from("App.Net"));
        assert_eq!(msg.level(), LogLevel::Info);
        assert_eq!(msg.logger_name(), "App.Net");
        assert_ne!(msg.thread_id(), 0);
    }

    #[test]
    fn test_reserve_and_truncation_sentinel() {
        let mut msg = LogMessage::new_pooled(4, 4);
        assert!(msg.reserve(3).is_some());
        // 1 byte left; a 2-byte reservation fails and the sentinel takes it.
        assert!(msg.reserve(2).is_none());
        assert!(msg.is_truncated());
        assert_eq!(
            msg.data()[3],
            super::super::encode::ArgTag::EndOfTruncatedMessage as u8
        );
        // Further reservations stay rejected without another sentinel.
        assert!(msg.reserve(1).is_none());
        assert_eq!(msg.data().len(), 4);
    }

    #[test]
    fn test_string_table_bounded() {
        let mut msg = LogMessage::new_pooled(16, 2);
        assert_eq!(msg.push_string(Arc::from("a")), Some(0));
        assert_eq!(msg.push_string(Arc::from("b")), Some(1));
        assert_eq!(msg.push_string(Arc::from("c")), None);
        assert_eq!(msg.get_string(1), Some("b"));
        assert_eq!(msg.get_string(2), None);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut msg = LogMessage::new_pooled(16, 2);
        msg.stamp(LogLevel::Error, Arc::from("root"));
        msg.push_string(Arc::from("x"));
        msg.reserve(5);
        msg.reset();

        assert_eq!(msg.data().len(), 0);
        assert_eq!(msg.string_count(), 0);
        assert!(!msg.is_truncated());
        assert_eq!(msg.logger_name(), "");
        assert_eq!(msg.thread_id(), 0);
        // Capacity is retained.
        assert_eq!(msg.capacity(), 16);
    }
}
