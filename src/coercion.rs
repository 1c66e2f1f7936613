// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! Lenient, error-accumulating type coercion (spec.md §4.4). Coercers never
//! panic and never return a hard error across the row boundary — callers get
//! `Ok(None)` for an empty slice and `Err(message)` with the exact wording
//! spec.md specifies for everything else, which the scan driver pushes onto
//! the row's `parse_error` accumulator.

use chrono::NaiveDateTime;

/// Parse a signed 64-bit integer from the exact byte span. Empty input is not
/// an error (spec.md §4.4 "empty slices never produce errors").
pub fn parse_int(bytes: &[u8], field_name: &str) -> Result<Option<i64>, String> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(bytes).map_err(|_| invalid(field_name, bytes))?;
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| invalid(field_name, bytes))
}

/// Parse a 64-bit float from the exact byte span.
pub fn parse_float(bytes: &[u8], field_name: &str) -> Result<Option<f64>, String> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(bytes).map_err(|_| invalid(field_name, bytes))?;
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| invalid(field_name, bytes))
}

/// A coerced FIX timestamp: UTC microseconds since the Unix epoch, alongside
/// the parsed `NaiveDateTime` for callers that want calendar fields.
pub fn parse_timestamp(bytes: &[u8], field_name: &str) -> Result<Option<NaiveDateTime>, String> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|_| invalid_reason(field_name, bytes, "not UTF-8"))?;
    parse_timestamp_grammar(text).map(Some).map_err(|reason| invalid_reason(field_name, bytes, reason))
}

fn invalid(field_name: &str, literal: &[u8]) -> String {
    format!("Invalid {field_name}: '{}'", String::from_utf8_lossy(literal))
}

fn invalid_reason(field_name: &str, literal: &[u8], reason: &str) -> String {
    format!(
        "Invalid {field_name}: '{}' ({reason})",
        String::from_utf8_lossy(literal)
    )
}

/// Grammar: `YYYYMMDD-HH:MM:SS` with an optional `.sss` (1-3 digits, right
/// zero-padded to milliseconds). Separators at fixed positions are mandatory
/// (spec.md §4.4) — checked by hand rather than via a `chrono` format string
/// so the exact boundary behaviors of spec.md §8 (B3/B4) hold: a 16-byte
/// input fails, a 17-byte input succeeds, and out-of-range calendar fields
/// fail even though they're syntactically well-formed digits.
fn parse_timestamp_grammar(text: &str) -> Result<NaiveDateTime, &'static str> {
    let bytes = text.as_bytes();
    if bytes.len() < 17 {
        return Err("too short");
    }
    if bytes[8] != b'-' || bytes[11] != b':' || bytes[14] != b':' {
        return Err("malformed separators");
    }
    let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
    if !digits(&bytes[0..8]) || !digits(&bytes[9..11]) || !digits(&bytes[12..14]) || !digits(&bytes[15..17]) {
        return Err("malformed separators");
    }

    let millis = match bytes.len() {
        17 => 0,
        len if len > 17 && bytes[17] == b'.' => {
            let frac = &text[18..];
            if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err("malformed fraction");
            }
            let padded = format!("{frac:0<3}");
            padded.parse::<u32>().map_err(|_| "malformed fraction")?
        }
        _ => return Err("malformed fraction"),
    };

    let year: i32 = text[0..4].parse().map_err(|_| "malformed separators")?;
    let month: u32 = text[4..6].parse().map_err(|_| "malformed separators")?;
    let day: u32 = text[6..8].parse().map_err(|_| "malformed separators")?;
    let hour: u32 = text[9..11].parse().map_err(|_| "malformed separators")?;
    let minute: u32 = text[12..14].parse().map_err(|_| "malformed separators")?;
    let second: u32 = text[15..17].parse().map_err(|_| "malformed separators")?;

    if !(1900..=2100).contains(&year) {
        return Err("year out of range");
    }
    if !(1..=12).contains(&month) {
        return Err("month out of range");
    }
    if !(1..=31).contains(&day) {
        return Err("day out of range");
    }
    if hour > 23 {
        return Err("hour out of range");
    }
    if minute > 59 {
        return Err("minute out of range");
    }
    if second > 59 {
        return Err("second out of range");
    }

    let date = chrono::NaiveDate::from_ymd_opt(year, month, day).ok_or("invalid calendar date")?;
    let time = chrono::NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
        .ok_or("invalid time of day")?;
    Ok(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_is_null_not_error() {
        assert_eq!(parse_int(b"", "MsgSeqNum").unwrap(), None);
        assert_eq!(parse_float(b"", "Price").unwrap(), None);
        assert_eq!(parse_timestamp(b"", "SendingTime").unwrap(), None);
    }

    #[test]
    fn bad_numeric_uses_exact_message() {
        let err = parse_int(b"abc", "MsgSeqNum").unwrap_err();
        assert_eq!(err, "Invalid MsgSeqNum: 'abc'");
    }

    #[test]
    fn timestamp_boundary_lengths() {
        assert!(parse_timestamp(b"20231215-10:30:00", "SendingTime").unwrap().is_some());
        assert!(parse_timestamp(b"20231215-10:30:0", "SendingTime").is_err());
    }

    #[test]
    fn timestamp_fraction_padding() {
        let a = parse_timestamp(b"20231215-10:30:00.1", "SendingTime").unwrap().unwrap();
        assert_eq!(a.and_utc().timestamp_subsec_millis(), 100);
        let b = parse_timestamp(b"20231215-10:30:00.123", "SendingTime").unwrap().unwrap();
        assert_eq!(b.and_utc().timestamp_subsec_millis(), 123);
    }

    #[test]
    fn timestamp_range_checks_reject_invalid_calendar_fields() {
        assert!(parse_timestamp(b"20231315-10:30:00", "SendingTime").is_err());
        assert!(parse_timestamp(b"20231232-10:30:00", "SendingTime").is_err());
        assert!(parse_timestamp(b"20231215-24:30:00", "SendingTime").is_err());
        assert!(parse_timestamp(b"20231215-10:60:00", "SendingTime").is_err());
        assert!(parse_timestamp(b"20231215-10:30:60", "SendingTime").is_err());
    }
}
