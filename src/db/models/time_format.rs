//! Canonical wire formats for calendar dates (`YYYY-MM-DD`) and times of day (`HH:MM`).
//!
//! Both formats are fixed-width, so lexicographic order equals chronological order.

use chrono::{NaiveDate, NaiveTime};

/// Parse a strict `YYYY-MM-DD` calendar date.
///
/// chrono alone accepts unpadded fields such as `2026-3-2`; those are rejected here.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parse a strict `HH:MM` wall-clock time of day.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, c)| i == 2 || c.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

pub fn format_clock_time(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde helper: serialize a `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_clock_time(time))
    }
}
