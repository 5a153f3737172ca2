//! Record builder: the producer-side encoding surface
//!
//! A [`RecordBuilder`] owns a pooled buffer between acquire and submit.
//! Typed appends fan out to the primitive encoders at compile time through
//! the [`Loggable`] trait; none of them allocate. Dropping a builder without
//! submitting returns the buffer to the pool.

use super::buffer::LogMessage;
use super::manager::Shared;
use super::registry::{self, LoggableEnum, UnmanagedValue};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Largest unmanaged blob accepted inline.
const MAX_UNMANAGED_SIZE: usize = 256;

/// A value the producer can append to a record without allocating.
pub trait Loggable {
    fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>);
}

macro_rules! loggable_scalars {
    ($($ty:ty => $method:ident;)+) => {
        $(
            impl Loggable for $ty {
                #[inline]
                fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>) {
                    message.$method(*self, fmt);
                }
            }
        )+
    };
}

loggable_scalars! {
    bool => append_bool;
    u8 => append_u8;
    i8 => append_i8;
    char => append_char;
    i16 => append_i16;
    u16 => append_u16;
    i32 => append_i32;
    u32 => append_u32;
    i64 => append_i64;
    u64 => append_u64;
    f32 => append_f32;
    f64 => append_f64;
    i128 => append_i128;
    u128 => append_u128;
    isize => append_isize;
    usize => append_usize;
    DateTime<Utc> => append_datetime;
    Duration => append_duration;
    NaiveDate => append_date;
    NaiveTime => append_time;
    Uuid => append_uuid;
}

impl Loggable for str {
    #[inline]
    fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>) {
        message.append_str(self, fmt);
    }
}

impl Loggable for String {
    #[inline]
    fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>) {
        message.append_str(self, fmt);
    }
}

/// Interned strings go through the reference table: one byte on the wire.
impl Loggable for Arc<str> {
    #[inline]
    fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>) {
        message.append_interned(self, fmt);
    }
}

impl<T: Loggable> Loggable for Option<T> {
    #[inline]
    fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>) {
        match self {
            Some(value) => value.append_to(message, fmt),
            None => message.append_null(),
        }
    }
}

impl<T: Loggable + ?Sized> Loggable for &T {
    #[inline]
    fn append_to(&self, message: &mut LogMessage, fmt: Option<&Arc<str>>) {
        (**self).append_to(message, fmt);
    }
}

/// Builder for one in-flight record.
///
/// Obtained from [`LoggerHandle::begin_record`](super::logger::LoggerHandle::begin_record);
/// appends encode into the pooled buffer and [`submit`](Self::submit) hands
/// it to the worker. A disabled builder (level off, pool empty under a drop
/// strategy, system shut down) accepts every call and does nothing.
pub struct RecordBuilder {
    message: Option<LogMessage>,
    shared: Option<Arc<Shared>>,
}

impl RecordBuilder {
    pub(crate) fn new(message: LogMessage, shared: Arc<Shared>) -> Self {
        Self {
            message: Some(message),
            shared: Some(shared),
        }
    }

    /// The no-op builder.
    pub(crate) fn disabled() -> Self {
        Self {
            message: None,
            shared: None,
        }
    }

    /// Whether appends on this builder reach a real buffer.
    pub fn is_enabled(&self) -> bool {
        self.message.is_some()
    }

    pub fn append<T: Loggable + ?Sized>(&mut self, value: &T) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            value.append_to(message, None);
        }
        self
    }

    /// Append with a per-argument format specifier (`"x"`, `"08X"`, `".3"`,
    /// strftime for temporal types). The specifier is interned once.
    pub fn append_fmt<T: Loggable + ?Sized>(&mut self, value: &T, format_spec: &str) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            let spec = registry::intern(format_spec);
            value.append_to(message, Some(&spec));
        }
        self
    }

    /// Append a structured-data pair. The key is interned once and rides in
    /// the reference table; the value is encoded as usual.
    pub fn append_key_value<T: Loggable + ?Sized>(&mut self, key: &str, value: &T) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            let key = registry::intern(key);
            message.append_key(&key);
            value.append_to(message, None);
        }
        self
    }

    pub fn append_null(&mut self) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            message.append_null();
        }
        self
    }

    /// Append raw bytes to be rendered as UTF-8 text.
    pub fn append_utf8_span(&mut self, bytes: &[u8]) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            message.append_utf8_span(bytes, None);
        }
        self
    }

    /// Append UTF-16 code units.
    pub fn append_utf16_span(&mut self, units: &[u16]) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            message.append_utf16_span(units, None);
        }
        self
    }

    /// Append an enum value. Registered types decode to their variant names;
    /// unregistered ones fall back to the numeric value unless
    /// `auto_register_enums` is on, in which case the first use registers the
    /// type (one allocation, once).
    pub fn append_enum<T: LoggableEnum>(&mut self, value: &T) -> &mut Self {
        if let Some(message) = self.message.as_mut() {
            let handle = registry::enum_handle::<T>().or_else(|| {
                registry::auto_register_enums().then(registry::register_enum::<T>)
            });
            match handle {
                Some(handle) => message.append_enum_raw(handle, value.to_u64(), None),
                None => message.append_u64(value.to_u64(), None),
            }
        }
        self
    }

    /// Append a fixed-size blob value. Unregistered types decode as a hex
    /// dump.
    pub fn append_unmanaged<T: UnmanagedValue>(&mut self, value: &T) -> &mut Self {
        debug_assert!(T::SIZE <= MAX_UNMANAGED_SIZE, "unmanaged value too large");
        if let Some(message) = self.message.as_mut() {
            let mut buf = [0u8; MAX_UNMANAGED_SIZE];
            let size = T::SIZE.min(MAX_UNMANAGED_SIZE);
            value.encode(&mut buf[..size]);
            let handle = registry::unmanaged_handle::<T>().unwrap_or(u32::MAX);
            message.append_unmanaged_raw(handle, &buf[..size], None);
        }
        self
    }

    /// Whether the encoded stream overflowed the buffer.
    pub fn is_truncated(&self) -> bool {
        self.message.as_ref().is_some_and(LogMessage::is_truncated)
    }

    /// Enqueue the record for the worker. Later calls (and later appends)
    /// are no-ops; a disabled builder just evaporates.
    pub fn submit(&mut self) {
        if let (Some(message), Some(shared)) = (self.message.take(), self.shared.take()) {
            shared.submit(message);
        }
    }
}

impl Drop for RecordBuilder {
    fn drop(&mut self) {
        // Abandoned without submit: the buffer goes straight back to the pool.
        if let Some(message) = self.message.take() {
            if let Some(shared) = self.shared.take() {
                shared.pool.release(message);
            }
        }
    }
}
