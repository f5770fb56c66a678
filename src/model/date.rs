//! Lenient date parsing for dates typed into spreadsheets.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    // Two-digit years first: `%Y` would also accept "24" as the year 24.
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Parses `s` as a calendar date, returning `None` if no known format matches.
///
/// Accepts ISO dates, US slash dates, month-name dates and timestamps (the time is dropped).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }
    if let Some(dt) = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(" 2024/01/15 "), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn test_parse_us() {
        assert_eq!(parse_date("1/15/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("01/15/24"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn test_parse_month_names() {
        assert_eq!(parse_date("Jan 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("January 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("Jan 15 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("February 3 2024"), Some(ymd(2024, 2, 3)));
    }

    #[test]
    fn test_parse_timestamps() {
        assert_eq!(parse_date("2024-01-15 08:30:00"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15 8:30 PM"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("1/15/2024 11:05:59 am"), Some(ymd(2024, 1, 15)));
        assert_eq!(
            parse_date("2024-01-15T08:30:00-07:00"),
            Some(ymd(2024, 1, 15))
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date(""), None);
    }
}
