//! Argument stream decoding
//!
//! The worker-side counterpart of [`encode`](super::encode): a single
//! left-to-right walk over the byte region that renders each tagged value.
//! Three modes exist. *Formatted* builds the message body, honoring
//! per-argument format specifiers and omitting key/value pairs. *Unformatted*
//! is the diagnostic dump used by the formatter-failure path: every argument,
//! comma-separated, strings quoted. *KeyValue* extracts only the pairs tagged
//! by `KeyString`, with fixed renderings for temporal types.

use super::buffer::LogMessage;
use super::encode::{ArgTag, FORMAT_FLAG, TAG_MASK};
use super::error::{LoggerError, Result};
use super::registry;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use std::fmt::Write;
use std::time::Duration;
use uuid::Uuid;

/// One extracted structured-data pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Rendering options shared by all modes.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions<'a> {
    pub null_display: &'a str,
}

impl Default for DecodeOptions<'_> {
    fn default() -> Self {
        Self {
            null_display: "null",
        }
    }
}

// ---------------------------------------------------------------------------
// Temporal writers (shared with the pattern expander)
// ---------------------------------------------------------------------------

/// `yyyy-MM-dd`
pub(crate) fn write_date(out: &mut String, date: NaiveDate) {
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    );
}

/// `HH:mm:ss.fffffff` (hundred-nanosecond precision)
pub(crate) fn write_time(out: &mut String, time: NaiveTime) {
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}.{:07}",
        time.hour(),
        time.minute(),
        time.second(),
        time.nanosecond() / 100
    );
}

/// `yyyy-MM-dd HH:mm:ss.fffffff`
pub(crate) fn write_datetime(out: &mut String, datetime: DateTime<Utc>) {
    write_date(out, datetime.date_naive());
    out.push(' ');
    write_time(out, datetime.time());
}

fn write_duration(out: &mut String, duration: Duration) {
    let secs = duration.as_secs();
    let days = secs / 86_400;
    let rem = secs % 86_400;
    if days > 0 {
        let _ = write!(out, "{}d ", days);
    }
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}.{:07}",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
        duration.subsec_nanos() / 100
    );
}

// ---------------------------------------------------------------------------
// Format specifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Decimal,
    Hex,
    HexUpper,
    Binary,
    Octal,
}

#[derive(Debug, Clone, Copy)]
struct FmtSpec {
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    radix: Radix,
    scientific: bool,
}

/// Lenient parse of the supported specifier subset; anything unrecognized
/// degrades to the default rendering.
fn parse_spec(spec: &str) -> FmtSpec {
    let mut parsed = FmtSpec {
        zero_pad: false,
        width: None,
        precision: None,
        radix: Radix::Decimal,
        scientific: false,
    };
    let mut chars = spec.chars().peekable();

    if chars.peek() == Some(&'0') {
        parsed.zero_pad = true;
        chars.next();
    }
    let mut width = 0usize;
    let mut saw_width = parsed.zero_pad;
    while let Some(c) = chars.peek().copied() {
        if let Some(digit) = c.to_digit(10) {
            width = width.saturating_mul(10).saturating_add(digit as usize);
            saw_width = true;
            chars.next();
        } else {
            break;
        }
    }
    if saw_width {
        parsed.width = Some(width);
    }

    if chars.peek() == Some(&'.') {
        chars.next();
        let mut precision = 0usize;
        while let Some(c) = chars.peek().copied() {
            if let Some(digit) = c.to_digit(10) {
                precision = precision.saturating_mul(10).saturating_add(digit as usize);
                chars.next();
            } else {
                break;
            }
        }
        parsed.precision = Some(precision);
    }

    match chars.next() {
        Some('x') => parsed.radix = Radix::Hex,
        Some('X') => parsed.radix = Radix::HexUpper,
        Some('b') => parsed.radix = Radix::Binary,
        Some('o') => parsed.radix = Radix::Octal,
        Some('e') | Some('E') => parsed.scientific = true,
        _ => {}
    }
    parsed
}

macro_rules! write_radix {
    ($out:expr, $value:expr, $spec:expr, $conv:literal) => {{
        let out: &mut String = $out;
        match ($spec.width, $spec.zero_pad) {
            (Some(w), true) => {
                let _ = write!(out, concat!("{:0width$", $conv, "}"), $value, width = w);
            }
            (Some(w), false) => {
                let _ = write!(out, concat!("{:width$", $conv, "}"), $value, width = w);
            }
            (None, _) => {
                let _ = write!(out, concat!("{:", $conv, "}"), $value);
            }
        }
    }};
}

fn write_int(out: &mut String, value: i128, fmt: Option<&str>) {
    let spec = match fmt {
        Some(f) => parse_spec(f),
        None => {
            let _ = write!(out, "{}", value);
            return;
        }
    };
    match spec.radix {
        Radix::Decimal => write_radix!(out, value, spec, ""),
        Radix::Hex => write_radix!(out, value, spec, "x"),
        Radix::HexUpper => write_radix!(out, value, spec, "X"),
        Radix::Binary => write_radix!(out, value, spec, "b"),
        Radix::Octal => write_radix!(out, value, spec, "o"),
    }
}

fn write_uint(out: &mut String, value: u128, fmt: Option<&str>) {
    let spec = match fmt {
        Some(f) => parse_spec(f),
        None => {
            let _ = write!(out, "{}", value);
            return;
        }
    };
    match spec.radix {
        Radix::Decimal => write_radix!(out, value, spec, ""),
        Radix::Hex => write_radix!(out, value, spec, "x"),
        Radix::HexUpper => write_radix!(out, value, spec, "X"),
        Radix::Binary => write_radix!(out, value, spec, "b"),
        Radix::Octal => write_radix!(out, value, spec, "o"),
    }
}

fn write_float(out: &mut String, value: f64, fmt: Option<&str>) {
    let spec = match fmt {
        Some(f) => parse_spec(f),
        None => {
            let _ = write!(out, "{}", value);
            return;
        }
    };
    match (spec.scientific, spec.precision) {
        (true, Some(p)) => {
            let _ = write!(out, "{:.precision$e}", value, precision = p);
        }
        (true, None) => {
            let _ = write!(out, "{:e}", value);
        }
        (false, Some(p)) => {
            let _ = write!(out, "{:.precision$}", value, precision = p);
        }
        (false, None) => {
            let _ = write!(out, "{}", value);
        }
    }
}

/// Temporal value with a strftime specifier; falls back to `default` when the
/// specifier is invalid.
fn write_strftime(
    out: &mut String,
    items: chrono::format::DelayedFormat<chrono::format::StrftimeItems<'_>>,
    default: impl FnOnce(&mut String),
) {
    let mut tmp = String::new();
    if write!(tmp, "{}", items).is_ok() {
        out.push_str(&tmp);
    } else {
        default(out);
    }
}

// ---------------------------------------------------------------------------
// Cursor and raw argument reading
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    msg: &'a LogMessage,
    bytes: &'a [u8],
    pos: usize,
}

#[derive(Debug)]
enum Arg<'a> {
    Null,
    Bool(bool),
    Char(char),
    Int(i128),
    Uint(u128),
    F32(f32),
    F64(f64),
    DateTime(DateTime<Utc>),
    Duration(Duration),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    Str(&'a str),
    Utf8(&'a [u8]),
    Utf16(&'a [u8]),
    Enum { handle: u32, value: u64 },
    Unmanaged { handle: u32, bytes: &'a [u8] },
}

/// One decoded element: a key marker, a value, or the truncation sentinel.
enum Element<'a> {
    Key(&'a str),
    Value { arg: Arg<'a>, fmt: Option<&'a str> },
    EndOfTruncated,
}

impl<'a> Cursor<'a> {
    fn new(msg: &'a LogMessage) -> Self {
        Self {
            msg,
            bytes: msg.data(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(LoggerError::malformed(self.pos, "payload extends past buffer"));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_i32(&mut self) -> Result<i32> {
        Ok(self.take_u32()? as i32)
    }

    fn take_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("8-byte slice")))
    }

    fn take_i64(&mut self) -> Result<i64> {
        Ok(self.take_u64()? as i64)
    }

    fn table_str(&mut self, index: u8) -> Result<&'a str> {
        self.msg
            .get_string(index)
            .ok_or_else(|| LoggerError::malformed(self.pos, "string index out of table"))
    }

    fn span_len(&mut self) -> Result<usize> {
        let len = self.take_i32()?;
        usize::try_from(len)
            .map_err(|_| LoggerError::malformed(self.pos, "negative span length"))
    }

    fn next_element(&mut self) -> Result<Element<'a>> {
        let header_pos = self.pos;
        let header = self.take_u8()?;
        let tag = ArgTag::from_code(header & TAG_MASK)
            .ok_or_else(|| LoggerError::malformed(header_pos, "unknown argument tag"))?;

        if tag == ArgTag::EndOfTruncatedMessage {
            return Ok(Element::EndOfTruncated);
        }
        let fmt = if header & FORMAT_FLAG != 0 {
            let index = self.take_u8()?;
            Some(self.table_str(index)?)
        } else {
            None
        };
        if tag == ArgTag::KeyString {
            let index = self.take_u8()?;
            return Ok(Element::Key(self.table_str(index)?));
        }

        let arg = match tag {
            ArgTag::Null => Arg::Null,
            ArgTag::Bool => Arg::Bool(self.take_u8()? != 0),
            ArgTag::U8 => Arg::Uint(u128::from(self.take_u8()?)),
            ArgTag::I8 => Arg::Int(i128::from(self.take_u8()? as i8)),
            ArgTag::Char => {
                let scalar = self.take_u32()?;
                Arg::Char(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            ArgTag::I16 => Arg::Int(i128::from(self.take_u16()? as i16)),
            ArgTag::U16 => Arg::Uint(u128::from(self.take_u16()?)),
            ArgTag::I32 => Arg::Int(i128::from(self.take_i32()?)),
            ArgTag::U32 => Arg::Uint(u128::from(self.take_u32()?)),
            ArgTag::I64 | ArgTag::Isize => Arg::Int(i128::from(self.take_i64()?)),
            ArgTag::U64 | ArgTag::Usize => Arg::Uint(u128::from(self.take_u64()?)),
            ArgTag::F32 => Arg::F32(f32::from_bits(self.take_u32()?)),
            ArgTag::F64 => Arg::F64(f64::from_bits(self.take_u64()?)),
            ArgTag::I128 => {
                let b = self.take(16)?;
                Arg::Int(i128::from_le_bytes(b.try_into().expect("16-byte slice")))
            }
            ArgTag::U128 => {
                let b = self.take(16)?;
                Arg::Uint(u128::from_le_bytes(b.try_into().expect("16-byte slice")))
            }
            ArgTag::DateTime => {
                let micros = self.take_i64()?;
                let datetime = DateTime::<Utc>::from_timestamp_micros(micros)
                    .ok_or_else(|| LoggerError::malformed(self.pos, "timestamp out of range"))?;
                Arg::DateTime(datetime)
            }
            ArgTag::Duration => {
                let secs = self.take_u64()?;
                let nanos = self.take_u32()?;
                Arg::Duration(Duration::new(secs, nanos))
            }
            ArgTag::Date => {
                let days = self.take_i32()?;
                let date = NaiveDate::from_num_days_from_ce_opt(days)
                    .ok_or_else(|| LoggerError::malformed(self.pos, "date out of range"))?;
                Arg::Date(date)
            }
            ArgTag::Time => {
                let nanos = self.take_u64()?;
                let time = NaiveTime::from_num_seconds_from_midnight_opt(
                    (nanos / 1_000_000_000) as u32,
                    (nanos % 1_000_000_000) as u32,
                )
                .ok_or_else(|| LoggerError::malformed(self.pos, "time out of range"))?;
                Arg::Time(time)
            }
            ArgTag::Uuid => {
                let b = self.take(16)?;
                Arg::Uuid(Uuid::from_bytes(b.try_into().expect("16-byte slice")))
            }
            ArgTag::Str => {
                let index = self.take_u8()?;
                Arg::Str(self.table_str(index)?)
            }
            ArgTag::Utf8Span => {
                let len = self.span_len()?;
                Arg::Utf8(self.take(len)?)
            }
            ArgTag::Utf16Span => {
                let len = self.span_len()?;
                Arg::Utf16(self.take(len * 2)?)
            }
            ArgTag::Enum => Arg::Enum {
                handle: self.take_u32()?,
                value: self.take_u64()?,
            },
            ArgTag::Unmanaged => {
                let handle = self.take_u32()?;
                let size = self.take_u16()? as usize;
                Arg::Unmanaged {
                    handle,
                    bytes: self.take(size)?,
                }
            }
            ArgTag::KeyString | ArgTag::EndOfTruncatedMessage => unreachable!(),
        };
        Ok(Element::Value { arg, fmt })
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(out: &mut String, arg: &Arg<'_>, fmt: Option<&str>, opts: &DecodeOptions<'_>, quoted: bool) {
    match arg {
        Arg::Null => out.push_str(opts.null_display),
        Arg::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Arg::Char(c) => out.push(*c),
        Arg::Int(v) => write_int(out, *v, fmt),
        Arg::Uint(v) => write_uint(out, *v, fmt),
        Arg::F32(v) => write_float(out, f64::from(*v), fmt),
        Arg::F64(v) => write_float(out, *v, fmt),
        Arg::DateTime(dt) => match fmt {
            Some(spec) => write_strftime(out, dt.format(spec), |o| write_datetime(o, *dt)),
            None => write_datetime(out, *dt),
        },
        Arg::Duration(d) => write_duration(out, *d),
        Arg::Date(d) => match fmt {
            Some(spec) => write_strftime(out, d.format(spec), |o| write_date(o, *d)),
            None => write_date(out, *d),
        },
        Arg::Time(t) => match fmt {
            Some(spec) => write_strftime(out, t.format(spec), |o| write_time(o, *t)),
            None => write_time(out, *t),
        },
        Arg::Uuid(u) => {
            let _ = write!(out, "{}", u);
        }
        Arg::Str(s) => push_maybe_quoted(out, s, quoted),
        Arg::Utf8(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => push_maybe_quoted(out, s, quoted),
            Err(_) => push_maybe_quoted(out, &String::from_utf8_lossy(bytes), quoted),
        },
        Arg::Utf16(bytes) => {
            if quoted {
                out.push('"');
            }
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            for decoded in char::decode_utf16(units) {
                out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            if quoted {
                out.push('"');
            }
        }
        Arg::Enum { handle, value } => match registry::enum_info(*handle) {
            Some(info) => match (info.describe)(*value) {
                Some(name) => out.push_str(name),
                None => {
                    let _ = write!(out, "{}", value);
                }
            },
            None => {
                let _ = write!(out, "{}", value);
            }
        },
        Arg::Unmanaged { handle, bytes } => {
            let described = match registry::unmanaged_info(*handle) {
                Some(info) => (info.describe)(bytes, out),
                None => registry::describe_raw(bytes, out),
            };
            if described.is_err() {
                out.push_str("<unmanaged>");
            }
        }
    }
}

fn push_maybe_quoted(out: &mut String, s: &str, quoted: bool) {
    if quoted {
        out.push('"');
        out.push_str(s);
        out.push('"');
    } else {
        out.push_str(s);
    }
}

// ---------------------------------------------------------------------------
// Decode modes
// ---------------------------------------------------------------------------

/// Message body: arguments concatenated in order, key/value pairs omitted.
pub fn decode_formatted(
    msg: &LogMessage,
    opts: &DecodeOptions<'_>,
    out: &mut String,
) -> Result<()> {
    let mut cursor = Cursor::new(msg);
    while !cursor.at_end() {
        match cursor.next_element()? {
            Element::EndOfTruncated => break,
            Element::Key(_) => {
                // Swallow the value that belongs to the key. A truncated
                // record may end with a dangling key.
                if cursor.at_end() {
                    break;
                }
                if let Element::EndOfTruncated = cursor.next_element()? {
                    break;
                }
            }
            Element::Value { arg, fmt } => render(out, &arg, fmt, opts, false),
        }
    }
    Ok(())
}

/// Diagnostic dump: every argument, `", "`-separated, strings quoted,
/// key/value pairs rendered `key=value`. Used when normal formatting fails,
/// so it never gives up on a malformed stream; it stops at the first
/// undecodable byte instead.
pub fn decode_unformatted(msg: &LogMessage, opts: &DecodeOptions<'_>, out: &mut String) {
    let mut cursor = Cursor::new(msg);
    let mut first = true;
    let mut pending_key: Option<&str> = None;

    loop {
        if cursor.at_end() {
            break;
        }
        let element = match cursor.next_element() {
            Ok(e) => e,
            Err(_) => break,
        };
        match element {
            Element::EndOfTruncated => break,
            Element::Key(key) => pending_key = Some(key),
            Element::Value { arg, fmt } => {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                if let Some(key) = pending_key.take() {
                    out.push_str(key);
                    out.push('=');
                }
                render(out, &arg, fmt, opts, true);
            }
        }
    }
}

/// Key/value extraction: only `KeyString`-tagged pairs, in stream order.
/// Temporal values use the fixed formats regardless of format specifiers.
pub fn decode_key_values(
    msg: &LogMessage,
    opts: &DecodeOptions<'_>,
    out: &mut Vec<KeyValue>,
) -> Result<()> {
    let mut cursor = Cursor::new(msg);
    while !cursor.at_end() {
        match cursor.next_element()? {
            Element::EndOfTruncated => break,
            Element::Key(key) => {
                if cursor.at_end() {
                    break;
                }
                match cursor.next_element()? {
                    Element::EndOfTruncated => break,
                    Element::Value { arg, .. } => {
                        let mut value = String::new();
                        render(&mut value, &arg, None, opts, false);
                        out.push(KeyValue {
                            key: key.to_string(),
                            value,
                        });
                    }
                    // A key tagging another key carries no value; skip it.
                    Element::Key(_) => {}
                }
            }
            Element::Value { .. } => {}
        }
    }
    Ok(())
}
