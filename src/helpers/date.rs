//! Date helper functions

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

/// Format a timestamp in ISO 8601 form
///
/// Microseconds are only written when non-zero, so whole-second timestamps
/// render as `2024-01-15T10:30:00`.
///
/// # Examples
/// ```ignore
/// isoformat(&dt) // -> "2024-01-15T10:30:00.250000"
/// ```
pub fn isoformat(dt: &NaiveDateTime) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = dt.nanosecond() / 1_000;
    if micros == 0 {
        base
    } else {
        format!("{}.{:06}", base, micros)
    }
}

/// Parse a header timestamp in the spellings posts commonly use
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // RFC 3339 keeps the wall-clock time as written
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_isoformat_whole_seconds() {
        assert_eq!(
            isoformat(&ymd_hms(2024, 1, 15, 10, 30, 0)),
            "2024-01-15T10:30:00"
        );
    }

    #[test]
    fn test_isoformat_micros() {
        let dt = NaiveDate::from_ymd_opt(2016, 3, 1)
            .unwrap()
            .and_hms_micro_opt(9, 5, 7, 250_000)
            .unwrap();
        assert_eq!(isoformat(&dt), "2016-03-01T09:05:07.250000");
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = ymd_hms(2024, 1, 15, 10, 30, 0);
        assert_eq!(parse_datetime("2024-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024/01/15 10:30"), Some(expected));
        assert_eq!(
            parse_datetime("2024-01-15T10:30:00+02:00"),
            Some(expected)
        );
        assert_eq!(
            parse_datetime(" 2024-01-15 "),
            Some(ymd_hms(2024, 1, 15, 0, 0, 0))
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }
}
