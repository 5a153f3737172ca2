//! Round-trip tests for the binary argument encoding
//!
//! The worker must read back exactly the values the producer encoded, for
//! every argument type, and truncated output must always end with the
//! configured suffix.

use chrono::{DateTime, NaiveDate, NaiveTime};
use hotlog::core::buffer::LogMessage;
use hotlog::core::decode::{decode_formatted, decode_key_values, decode_unformatted, DecodeOptions};
use hotlog::core::formatter::DefaultFormatter;
use hotlog::core::{register_enum, register_unmanaged, LoggableEnum, LogLevel, Settings, UnmanagedValue};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn message() -> LogMessage {
    LogMessage::new_pooled(512, 32)
}

fn formatted(msg: &LogMessage) -> String {
    let mut out = String::new();
    decode_formatted(msg, &DecodeOptions::default(), &mut out).expect("well-formed stream");
    out
}

#[test]
fn scalar_types_roundtrip_by_value() {
    let mut msg = message();
    msg.append_bool(true, None);
    msg.append_str(" ", None);
    msg.append_u8(200, None);
    msg.append_str(" ", None);
    msg.append_i8(-100, None);
    msg.append_str(" ", None);
    msg.append_char('Ω', None);
    msg.append_str(" ", None);
    msg.append_i16(-30000, None);
    msg.append_str(" ", None);
    msg.append_u16(60000, None);
    msg.append_str(" ", None);
    msg.append_i32(-2_000_000_000, None);
    msg.append_str(" ", None);
    msg.append_u32(4_000_000_000, None);
    msg.append_str(" ", None);
    msg.append_i64(i64::MIN, None);
    msg.append_str(" ", None);
    msg.append_u64(u64::MAX, None);

    assert_eq!(
        formatted(&msg),
        format!(
            "true 200 -100 Ω -30000 60000 -2000000000 4000000000 {} {}",
            i64::MIN,
            u64::MAX
        )
    );
}

#[test]
fn wide_and_pointer_sized_integers_roundtrip() {
    let mut msg = message();
    msg.append_i128(i128::MIN, None);
    msg.append_str(" ", None);
    msg.append_u128(u128::MAX, None);
    msg.append_str(" ", None);
    msg.append_isize(-12345, None);
    msg.append_str(" ", None);
    msg.append_usize(98765, None);

    assert_eq!(
        formatted(&msg),
        format!("{} {} -12345 98765", i128::MIN, u128::MAX)
    );
}

#[test]
fn float_types_roundtrip() {
    let mut msg = message();
    msg.append_f32(2.5, None);
    msg.append_str(" ", None);
    msg.append_f64(-1234.5678, None);
    assert_eq!(formatted(&msg), "2.5 -1234.5678");
}

#[test]
fn temporal_types_roundtrip() {
    let mut msg = message();
    let datetime = DateTime::from_timestamp_micros(1_577_934_245_006_000).unwrap();
    msg.append_datetime(datetime, None);
    msg.append_str(" | ", None);
    msg.append_date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(), None);
    msg.append_str(" | ", None);
    msg.append_time(NaiveTime::from_hms_nano_opt(23, 59, 58, 123_456_700).unwrap(), None);
    msg.append_str(" | ", None);
    msg.append_duration(Duration::new(3_661, 200_000_000), None);

    assert_eq!(
        formatted(&msg),
        "2020-01-02 03:04:05.0060000 | 1999-12-31 | 23:59:58.1234567 | 01:01:01.2000000"
    );
}

#[test]
fn uuid_roundtrips() {
    let mut msg = message();
    let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    msg.append_uuid(id, None);
    assert_eq!(formatted(&msg), "67e55044-10b1-426f-9247-bb680e5fe0c8");
}

#[test]
fn string_variants_roundtrip() {
    let mut msg = message();
    let interned: Arc<str> = Arc::from("interned-template");
    msg.append_interned(&interned, None);
    msg.append_str(" / ", None);
    msg.append_utf8_span("utf8 ✓".as_bytes(), None);
    msg.append_str(" / ", None);
    let units: Vec<u16> = "utf16 ✓".encode_utf16().collect();
    msg.append_utf16_span(&units, None);

    assert_eq!(formatted(&msg), "interned-template / utf8 ✓ / utf16 ✓");
}

#[derive(Clone, Copy)]
enum ConnState {
    Idle = 1,
    Active = 2,
}

impl LoggableEnum for ConnState {
    fn type_name() -> &'static str {
        "ConnState"
    }

    fn describe(value: u64) -> Option<&'static str> {
        match value {
            1 => Some("Idle"),
            2 => Some("Active"),
            _ => None,
        }
    }

    fn to_u64(&self) -> u64 {
        *self as u64
    }
}

#[test]
fn registered_enum_decodes_to_variant_name() {
    let handle = register_enum::<ConnState>();
    let mut msg = message();
    msg.append_enum_raw(handle, ConnState::Active.to_u64(), None);
    assert_eq!(formatted(&msg), "Active");

    // Unknown variant values fall back to the number.
    let mut msg = message();
    msg.append_enum_raw(handle, 99, None);
    assert_eq!(formatted(&msg), "99");
}

#[derive(Clone, Copy)]
struct Coord {
    x: i32,
    y: i32,
}

impl UnmanagedValue for Coord {
    const SIZE: usize = 8;

    fn type_name() -> &'static str {
        "Coord"
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.x.to_le_bytes());
        buf[4..8].copy_from_slice(&self.y.to_le_bytes());
    }

    fn describe(bytes: &[u8], out: &mut String) -> std::fmt::Result {
        use std::fmt::Write;
        let x = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let y = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        write!(out, "({}, {})", x, y)
    }
}

#[test]
fn unmanaged_blob_roundtrips() {
    let handle = register_unmanaged::<Coord>();
    let coord = Coord { x: -3, y: 17 };
    let mut buf = [0u8; 8];
    coord.encode(&mut buf);

    let mut msg = message();
    msg.append_unmanaged_raw(handle, &buf, None);
    assert_eq!(formatted(&msg), "(-3, 17)");

    // An unregistered handle dumps hex rather than failing.
    let mut msg = message();
    msg.append_unmanaged_raw(u32::MAX, &[0xab, 0xcd], None);
    assert_eq!(formatted(&msg), "0xabcd");
}

#[test]
fn null_and_key_values_roundtrip() {
    let mut msg = message();
    msg.append_str("ctx", None);
    let key: Arc<str> = Arc::from("elapsed_ms");
    msg.append_key(&key);
    msg.append_u64(12, None);
    msg.append_null();

    assert_eq!(formatted(&msg), "ctxnull");

    let mut pairs = Vec::new();
    decode_key_values(&msg, &DecodeOptions::default(), &mut pairs).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].key, "elapsed_ms");
    assert_eq!(pairs[0].value, "12");

    let mut dump = String::new();
    decode_unformatted(&msg, &DecodeOptions::default(), &mut dump);
    assert_eq!(dump, "\"ctx\", elapsed_ms=12, null");
}

#[test]
fn string_table_overflow_truncates_record() {
    let mut msg = LogMessage::new_pooled(512, 2);
    let a: Arc<str> = Arc::from("a");
    let b: Arc<str> = Arc::from("b");
    let c: Arc<str> = Arc::from("c");
    msg.append_interned(&a, None);
    msg.append_interned(&b, None);
    assert!(!msg.is_truncated());
    msg.append_interned(&c, None);
    assert!(msg.is_truncated());
    // The two stored strings still decode.
    assert_eq!(formatted(&msg), "ab");
}

fn render_with_formatter(msg: &LogMessage, output_cap: usize) -> String {
    let formatter = DefaultFormatter::new(&Settings {
        prefix_pattern: String::new(),
        output_buffer_size: output_cap,
        ..Settings::default()
    });
    let mut out = String::new();
    formatter.format(msg, &mut out);
    out
}

proptest! {
    /// Any mix of integers and short strings decodes back to the exact
    /// concatenation the producer appended.
    #[test]
    fn prop_int_and_string_sequences_roundtrip(
        values in prop::collection::vec(
            prop_oneof![
                any::<i64>().prop_map(|v| v.to_string()),
                "[a-zA-Z0-9 ]{0,12}",
            ],
            0..8,
        )
    ) {
        let mut msg = LogMessage::new_pooled(4096, 32);
        for value in &values {
            match value.parse::<i64>() {
                Ok(number) => msg.append_i64(number, None),
                Err(_) => msg.append_str(value, None),
            }
        }
        prop_assume!(!msg.is_truncated());

        let expected: String = values
            .iter()
            .map(|v| match v.parse::<i64>() {
                Ok(number) => number.to_string(),
                Err(_) => v.clone(),
            })
            .collect();
        prop_assert_eq!(formatted(&msg), expected);
    }

    /// Whenever the decoded width exceeds the output capacity, the rendered
    /// text ends with the truncation suffix and stays within capacity.
    #[test]
    fn prop_oversized_output_ends_with_suffix(
        text in "[a-z]{1,64}",
        cap in 16usize..48,
    ) {
        let mut msg = LogMessage::new_pooled(512, 8);
        msg.stamp(LogLevel::Info, Arc::from("t"));
        msg.append_str(&text, None);

        let out = render_with_formatter(&msg, cap);
        if text.len() > cap {
            prop_assert!(out.ends_with(" [TRUNCATED]"));
            prop_assert!(out.len() <= cap);
        } else {
            prop_assert_eq!(out.as_str(), text.as_str());
        }
    }

    /// Truncated records always carry the suffix, whatever the overflow
    /// point was.
    #[test]
    fn prop_encoding_overflow_always_suffixes(extra in 1usize..200) {
        let mut msg = LogMessage::new_pooled(32, 8);
        msg.stamp(LogLevel::Info, Arc::from("t"));
        for _ in 0..extra {
            msg.append_u64(42, None);
        }
        if msg.is_truncated() {
            let out = render_with_formatter(&msg, 4096);
            prop_assert!(out.ends_with(" [TRUNCATED]"));
        }
    }
}
