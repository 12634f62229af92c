//! Domain types shared across the server.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Date format used for cache keys and upstream query strings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The upstream services the server aggregates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    Prediction,
    Weather,
    Tide,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Upstream::Prediction => "prediction API",
            Upstream::Weather => "weather API",
            Upstream::Tide => "tide API",
        };
        f.write_str(label)
    }
}

/// Render a date as a `YYYY-MM-DD` cache key.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` cache key. Returns `None` for anything else.
///
/// Only the canonical spelling is accepted, so each date has exactly one key.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()?;
    (format_date(date) == raw).then_some(date)
}

/// The civil date of `now` in the reference timezone.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// The day after `date`, saturating at the end of the calendar.
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_roundtrip() {
        let date = parse_date("2024-03-10").expect("valid date");
        assert_eq!(format_date(date), "2024-03-10");
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(parse_date("2024/03/10").is_none());
        assert!(parse_date("10-03-2024").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("2024-02-30").is_none());
    }

    #[test]
    fn test_parse_date_rejects_non_canonical_spellings() {
        assert!(parse_date("2024-3-9").is_none());
        assert!(parse_date("2024-03-9").is_none());
        assert!(parse_date(" 2024-03-09").is_none());
        assert!(parse_date("2024-03-09 ").is_none());
        assert!(parse_date("+2024-03-09").is_none());
        assert!(parse_date("2024-03-09").is_some());
    }

    #[test]
    fn test_local_date_crosses_midnight_in_tokyo() {
        // 16:30 UTC is 01:30 the next day in Tokyo.
        let now = DateTime::parse_from_rfc3339("2024-03-09T16:30:00Z")
            .expect("valid now")
            .with_timezone(&Utc);
        assert_eq!(
            local_date(now, chrono_tz::Asia::Tokyo),
            NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date")
        );
        assert_eq!(
            local_date(now, chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date")
        );
    }

    #[test]
    fn test_next_day_rolls_over_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
        assert_eq!(format_date(next_day(date)), "2024-03-01");
    }
}
