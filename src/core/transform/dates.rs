//! Partial date handling
//!
//! The API emits full dates (`2024-03-15`), year-months (`2024-03`) and bare
//! years (`2024`). Parsing is best-effort: the original string is always
//! kept alongside the parsed value, and anything unparseable becomes None.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Parse a full or partial ISO date string
///
/// `YYYY-MM` resolves to the first of the month and `YYYY` to January 1st.
pub fn parse_partial_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    match raw.len() {
        10 => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok(),
        7 => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok(),
        4 => raw
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
        _ => None,
    }
}

/// Parse a full or partial ISO date string into a UTC timestamp at midnight
pub fn parse_partial_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_partial_date(raw)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_date() {
        assert_eq!(
            parse_partial_date("2024-03-15"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_year_month() {
        assert_eq!(
            parse_partial_date("2024-03"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_year_only() {
        assert_eq!(
            parse_partial_date("2024"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn test_garbage_returns_none() {
        assert_eq!(parse_partial_date("soon"), None);
        assert_eq!(parse_partial_date("2024-13-40"), None);
        assert_eq!(parse_partial_date("24-01"), None);
        assert_eq!(parse_partial_date(""), None);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            parse_partial_date(" 2024-03-15 "),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_timestamp_is_midnight_utc() {
        let ts = parse_partial_timestamp("2024-03-15").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }
}
