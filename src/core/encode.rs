//! Binary argument encoding
//!
//! Arguments are appended to the buffer's byte region as a self-describing
//! stream: a one-byte header whose low seven bits name the type and whose
//! high bit flags an attached format specifier, followed by a little-endian
//! payload. Strings that are already interned are stored as a one-byte index
//! into the buffer's reference table; transient strings are copied inline.
//!
//! Overflow semantics: the first append that does not fit marks the record
//! truncated, writes the [`ArgTag::EndOfTruncatedMessage`] sentinel when at
//! least one byte remains, and turns every later append into a no-op. A full
//! reference table has the same effect.

use super::buffer::LogMessage;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// High bit of the argument header: the byte after the header is a
/// reference-table index holding this argument's format specifier.
pub const FORMAT_FLAG: u8 = 0x80;

/// Mask selecting the type code from an argument header.
pub const TAG_MASK: u8 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArgTag {
    Null = 0,
    Bool = 1,
    U8 = 2,
    I8 = 3,
    Char = 4,
    I16 = 5,
    U16 = 6,
    I32 = 7,
    U32 = 8,
    I64 = 9,
    U64 = 10,
    F32 = 11,
    F64 = 12,
    I128 = 13,
    U128 = 14,
    Isize = 15,
    Usize = 16,
    DateTime = 17,
    Duration = 18,
    Date = 19,
    Time = 20,
    Uuid = 21,
    Str = 22,
    Utf16Span = 23,
    Utf8Span = 24,
    Enum = 25,
    Unmanaged = 26,
    KeyString = 27,
    EndOfTruncatedMessage = 28,
}

impl ArgTag {
    pub fn from_code(code: u8) -> Option<ArgTag> {
        Some(match code {
            0 => ArgTag::Null,
            1 => ArgTag::Bool,
            2 => ArgTag::U8,
            3 => ArgTag::I8,
            4 => ArgTag::Char,
            5 => ArgTag::I16,
            6 => ArgTag::U16,
            7 => ArgTag::I32,
            8 => ArgTag::U32,
            9 => ArgTag::I64,
            10 => ArgTag::U64,
            11 => ArgTag::F32,
            12 => ArgTag::F64,
            13 => ArgTag::I128,
            14 => ArgTag::U128,
            15 => ArgTag::Isize,
            16 => ArgTag::Usize,
            17 => ArgTag::DateTime,
            18 => ArgTag::Duration,
            19 => ArgTag::Date,
            20 => ArgTag::Time,
            21 => ArgTag::Uuid,
            22 => ArgTag::Str,
            23 => ArgTag::Utf16Span,
            24 => ArgTag::Utf8Span,
            25 => ArgTag::Enum,
            26 => ArgTag::Unmanaged,
            27 => ArgTag::KeyString,
            28 => ArgTag::EndOfTruncatedMessage,
            _ => return None,
        })
    }
}

impl LogMessage {
    /// Write an argument header and reserve its payload. Returns the payload
    /// slice, or `None` when the record is (now) truncated.
    ///
    /// A format specifier that no longer fits in the reference table is
    /// silently dropped; losing a format is cosmetic, losing a value is not.
    fn push_header(
        &mut self,
        tag: ArgTag,
        fmt: Option<&Arc<str>>,
        payload_len: usize,
    ) -> Option<&mut [u8]> {
        let fmt_index = fmt.and_then(|f| self.push_string(Arc::clone(f)));
        let header_len = 1 + usize::from(fmt_index.is_some());
        let buf = self.reserve(header_len + payload_len)?;
        match fmt_index {
            Some(index) => {
                buf[0] = tag as u8 | FORMAT_FLAG;
                buf[1] = index;
            }
            None => buf[0] = tag as u8,
        }
        Some(&mut buf[header_len..])
    }

    pub fn append_null(&mut self) {
        self.push_header(ArgTag::Null, None, 0);
    }

    pub fn append_bool(&mut self, value: bool, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Bool, fmt, 1) {
            buf[0] = u8::from(value);
        }
    }

    pub fn append_char(&mut self, value: char, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Char, fmt, 4) {
            buf.copy_from_slice(&(value as u32).to_le_bytes());
        }
    }

    /// A string copied inline as UTF-8.
    pub fn append_str(&mut self, value: &str, fmt: Option<&Arc<str>>) {
        self.append_span(ArgTag::Utf8Span, value.as_bytes(), fmt);
    }

    /// A shared string stored by reference-table index. Cheaper than
    /// [`append_str`](Self::append_str) for keys, templates and other
    /// strings that were interned up front.
    pub fn append_interned(&mut self, value: &Arc<str>, fmt: Option<&Arc<str>>) {
        let Some(index) = self.push_string(Arc::clone(value)) else {
            self.mark_truncated();
            return;
        };
        if let Some(buf) = self.push_header(ArgTag::Str, fmt, 1) {
            buf[0] = index;
        }
    }

    /// Raw bytes rendered as UTF-8 text (invalid sequences decode lossily).
    pub fn append_utf8_span(&mut self, bytes: &[u8], fmt: Option<&Arc<str>>) {
        self.append_span(ArgTag::Utf8Span, bytes, fmt);
    }

    /// UTF-16 code units, stored verbatim and decoded by the worker.
    pub fn append_utf16_span(&mut self, units: &[u16], fmt: Option<&Arc<str>>) {
        let len = units.len() as i32;
        if let Some(buf) = self.push_header(ArgTag::Utf16Span, fmt, 4 + units.len() * 2) {
            buf[0..4].copy_from_slice(&len.to_le_bytes());
            for (i, unit) in units.iter().enumerate() {
                buf[4 + i * 2..6 + i * 2].copy_from_slice(&unit.to_le_bytes());
            }
        }
    }

    fn append_span(&mut self, tag: ArgTag, bytes: &[u8], fmt: Option<&Arc<str>>) {
        let len = bytes.len() as i32;
        if let Some(buf) = self.push_header(tag, fmt, 4 + bytes.len()) {
            buf[0..4].copy_from_slice(&len.to_le_bytes());
            buf[4..].copy_from_slice(bytes);
        }
    }

    pub fn append_datetime(&mut self, value: DateTime<Utc>, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::DateTime, fmt, 8) {
            buf.copy_from_slice(&value.timestamp_micros().to_le_bytes());
        }
    }

    pub fn append_duration(&mut self, value: Duration, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Duration, fmt, 12) {
            buf[0..8].copy_from_slice(&value.as_secs().to_le_bytes());
            buf[8..12].copy_from_slice(&value.subsec_nanos().to_le_bytes());
        }
    }

    pub fn append_date(&mut self, value: NaiveDate, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Date, fmt, 4) {
            buf.copy_from_slice(&value.num_days_from_ce().to_le_bytes());
        }
    }

    pub fn append_time(&mut self, value: NaiveTime, fmt: Option<&Arc<str>>) {
        let nanos =
            u64::from(value.num_seconds_from_midnight()) * 1_000_000_000 + u64::from(value.nanosecond());
        if let Some(buf) = self.push_header(ArgTag::Time, fmt, 8) {
            buf.copy_from_slice(&nanos.to_le_bytes());
        }
    }

    pub fn append_uuid(&mut self, value: Uuid, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Uuid, fmt, 16) {
            buf.copy_from_slice(value.as_bytes());
        }
    }

    /// An enum value as registry handle + numeric value.
    pub fn append_enum_raw(&mut self, handle: u32, value: u64, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Enum, fmt, 12) {
            buf[0..4].copy_from_slice(&handle.to_le_bytes());
            buf[4..12].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// An unmanaged blob as registry handle + sized value bytes.
    pub fn append_unmanaged_raw(&mut self, handle: u32, bytes: &[u8], fmt: Option<&Arc<str>>) {
        let size = bytes.len() as u16;
        if let Some(buf) = self.push_header(ArgTag::Unmanaged, fmt, 6 + bytes.len()) {
            buf[0..4].copy_from_slice(&handle.to_le_bytes());
            buf[4..6].copy_from_slice(&size.to_le_bytes());
            buf[6..].copy_from_slice(bytes);
        }
    }

    /// A structured-data key. The next appended argument is its value.
    pub fn append_key(&mut self, key: &Arc<str>) {
        let Some(index) = self.push_string(Arc::clone(key)) else {
            self.mark_truncated();
            return;
        };
        if let Some(buf) = self.push_header(ArgTag::KeyString, None, 1) {
            buf[0] = index;
        }
    }
}

macro_rules! scalar_appends {
    ($($method:ident => ($ty:ty, $tag:expr, $width:expr);)+) => {
        impl LogMessage {
            $(
                pub fn $method(&mut self, value: $ty, fmt: Option<&Arc<str>>) {
                    if let Some(buf) = self.push_header($tag, fmt, $width) {
                        buf.copy_from_slice(&value.to_le_bytes());
                    }
                }
            )+
        }
    };
}

scalar_appends! {
    append_u8 => (u8, ArgTag::U8, 1);
    append_i8 => (i8, ArgTag::I8, 1);
    append_i16 => (i16, ArgTag::I16, 2);
    append_u16 => (u16, ArgTag::U16, 2);
    append_i32 => (i32, ArgTag::I32, 4);
    append_u32 => (u32, ArgTag::U32, 4);
    append_i64 => (i64, ArgTag::I64, 8);
    append_u64 => (u64, ArgTag::U64, 8);
    append_f32 => (f32, ArgTag::F32, 4);
    append_f64 => (f64, ArgTag::F64, 8);
    append_i128 => (i128, ArgTag::I128, 16);
    append_u128 => (u128, ArgTag::U128, 16);
}

impl LogMessage {
    pub fn append_isize(&mut self, value: isize, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Isize, fmt, 8) {
            buf.copy_from_slice(&(value as i64).to_le_bytes());
        }
    }

    pub fn append_usize(&mut self, value: usize, fmt: Option<&Arc<str>>) {
        if let Some(buf) = self.push_header(ArgTag::Usize, fmt, 8) {
            buf.copy_from_slice(&(value as u64).to_le_bytes());
        }
    }
}
