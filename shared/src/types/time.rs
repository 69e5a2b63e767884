//! Timestamp helpers for the `LastSentAt` column
//!
//! Values are written as RFC 3339 UTC with a `Z` suffix, keeping whatever
//! sub-second precision the time carries. On read we accept
//! anything a spreadsheet round-trip tends to produce: explicit offsets,
//! `Z`, or a naive timestamp which is taken to be UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a stored timestamp, returning `None` for blank or unparseable input
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way it is persisted
///
/// Lossless: parsing the result yields `at` again, so a stored send time
/// never reads earlier than the moment it was taken.
pub fn format_timestamp_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parses_zulu_and_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:00:00+02:00"), Some(expected));
    }

    #[test]
    fn test_naive_timestamps_are_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:00:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn test_format_is_zulu_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp_utc(at), "2024-03-01T12:00:00Z");
        assert_eq!(parse_timestamp(&format_timestamp_utc(at)), Some(at));
    }

    #[test]
    fn test_format_keeps_sub_second_precision() {
        let millis = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap() + chrono::Duration::milliseconds(500);
        assert_eq!(format_timestamp_utc(millis), "2024-06-10T09:00:00.500Z");
        assert_eq!(parse_timestamp(&format_timestamp_utc(millis)), Some(millis));

        let nanos = millis + chrono::Duration::nanoseconds(123);
        assert_eq!(parse_timestamp(&format_timestamp_utc(nanos)), Some(nanos));
    }
}
