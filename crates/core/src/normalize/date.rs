//! Install-date parsing.
//!
//! Windows stores `InstallDate` as compact `YYYYMMDD`, but exports and
//! hand-edited reference lists carry all sorts of locale formats.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats tried in order after the compact form. US month-first wins over
/// day-first for slash-separated dates; dotted dates are read day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parse a raw install date. Unknown formats and impossible calendar dates
/// yield `None`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text[0..4].parse().ok()?;
        let month = text[4..6].parse().ok()?;
        let day = text[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    // Full timestamps: keep the calendar date.
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(stamp.date());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parses_compact_registry_dates() {
        assert_eq!(normalize_date("20240131"), ymd(2024, 1, 31));
        assert_eq!(normalize_date(" 20240131 "), ymd(2024, 1, 31));
    }

    #[test]
    fn rejects_impossible_compact_dates() {
        assert_eq!(normalize_date("20241341"), None);
        assert_eq!(normalize_date("20230229"), None);
    }

    #[test]
    fn parses_locale_formats() {
        assert_eq!(normalize_date("2024-01-31"), ymd(2024, 1, 31));
        assert_eq!(normalize_date("2024/1/5"), ymd(2024, 1, 5));
        assert_eq!(normalize_date("1/5/2024"), ymd(2024, 1, 5));
        assert_eq!(normalize_date("31.01.2024"), ymd(2024, 1, 31));
        assert_eq!(normalize_date("Jan 31, 2024"), ymd(2024, 1, 31));
        assert_eq!(normalize_date("31 January 2024"), ymd(2024, 1, 31));
    }

    #[test]
    fn keeps_date_part_of_timestamps() {
        assert_eq!(normalize_date("2024-01-31T10:15:00Z"), ymd(2024, 1, 31));
        assert_eq!(normalize_date("2024-01-31T10:15:00"), ymd(2024, 1, 31));
    }

    #[test]
    fn unknown_formats_are_absent() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("2024"), None);
    }
}
