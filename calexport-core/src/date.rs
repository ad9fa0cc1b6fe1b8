//! Date normalization.
//!
//! Calendar helpers report dates in whatever format the platform felt like
//! that day. We try a fixed list of formats in order, most specific first,
//! and only then fall back to a permissive parser.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::error::{ExportError, ExportResult};
use crate::event::EventTime;

/// "Saturday, November 13, 2021 at 9:00:00 AM"
const VERBOSE_FORMAT: &str = "%A, %B %d, %Y at %I:%M:%S %p";
/// "2021-11-13 09:00:00 +0100"
const SPACED_OFFSET_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
/// "2021-11-13T09:00:00+0100"
const ISO_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
/// "2021-11-13 09:00:00"
const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A parsed point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instant {
    /// The input carried a numeric offset
    Offset(DateTime<FixedOffset>),
    /// No offset in the input; treated as naive local time
    Naive(NaiveDateTime),
}

impl Instant {
    /// Date and time as written in the source (not shifted to UTC).
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Instant::Offset(dt) => dt.naive_local(),
            Instant::Naive(dt) => *dt,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.wall_clock().date()
    }

    pub fn to_event_time(self) -> EventTime {
        match self {
            Instant::Offset(dt) => EventTime::DateTimeUtc(dt.with_timezone(&Utc)),
            Instant::Naive(dt) => EventTime::DateTimeFloating(dt),
        }
    }
}

type Pattern = fn(&str) -> Option<Instant>;

/// Fixed patterns, tried in order. Order matters: the first match wins.
const PATTERNS: [(&str, Pattern); 4] = [
    ("verbose", parse_verbose),
    ("spaced offset", parse_spaced_offset),
    ("iso offset", parse_iso_offset),
    ("naive", parse_naive),
];

/// Normalize a raw date string into an `Instant`.
///
/// An optional literal `date ` prefix is stripped first. If none of the fixed
/// patterns match, a permissive parser gets the last word.
pub fn normalize(raw: &str) -> ExportResult<Instant> {
    let cleaned = clean(raw);
    let input = cleaned.strip_prefix("date ").unwrap_or(&cleaned);

    for (name, parse) in PATTERNS {
        if let Some(instant) = parse(input) {
            tracing::trace!(input, pattern = name, "parsed date");
            return Ok(instant);
        }
    }

    parse_permissive(input).ok_or_else(|| ExportError::DateParse(raw.to_string()))
}

/// Trim and replace the non-breaking spaces some locales put before AM/PM.
fn clean(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '\u{a0}' | '\u{202f}' => ' ',
            c => c,
        })
        .collect()
}

fn parse_verbose(input: &str) -> Option<Instant> {
    NaiveDateTime::parse_from_str(input, VERBOSE_FORMAT)
        .ok()
        .map(Instant::Naive)
}

fn parse_spaced_offset(input: &str) -> Option<Instant> {
    DateTime::parse_from_str(input, SPACED_OFFSET_FORMAT)
        .ok()
        .map(Instant::Offset)
}

fn parse_iso_offset(input: &str) -> Option<Instant> {
    DateTime::parse_from_str(input, ISO_OFFSET_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(input))
        .ok()
        .map(Instant::Offset)
}

fn parse_naive(input: &str) -> Option<Instant> {
    NaiveDateTime::parse_from_str(input, NAIVE_FORMAT)
        .ok()
        .map(Instant::Naive)
}

fn parse_permissive(input: &str) -> Option<Instant> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Instant::Naive(date.and_time(chrono::NaiveTime::MIN)));
    }

    // fuzzydate only understands lowercase words
    match fuzzydate::parse(input.to_lowercase().as_str()) {
        Ok(dt) => {
            tracing::debug!(input, "date only parsed by permissive fallback");
            Some(Instant::Naive(dt))
        }
        Err(_) => {
            tracing::error!(input, "Failed to parse date");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn verbose_format_with_date_prefix() {
        let result = normalize("date Saturday, November 13, 2021 at 9:00:00 AM").unwrap();
        assert_eq!(result, Instant::Naive(naive(2021, 11, 13, 9, 0, 0)));
    }

    #[test]
    fn verbose_format_afternoon() {
        let result = normalize("Saturday, November 13, 2021 at 3:15:30 PM").unwrap();
        assert_eq!(result, Instant::Naive(naive(2021, 11, 13, 15, 15, 30)));
    }

    #[test]
    fn verbose_format_with_narrow_no_break_space() {
        let result = normalize("Saturday, November 13, 2021 at 9:00:00\u{202f}AM").unwrap();
        assert_eq!(result, Instant::Naive(naive(2021, 11, 13, 9, 0, 0)));
    }

    #[test]
    fn spaced_offset_format() {
        let result = normalize("2021-11-13 09:00:00 +0100").unwrap();
        let Instant::Offset(dt) = result else {
            panic!("expected an offset instant, got {result:?}");
        };
        assert_eq!(
            dt.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2021, 11, 13, 8, 0, 0).unwrap()
        );
        assert_eq!(dt.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn iso_offset_format() {
        let result = normalize("2021-11-13T09:00:00+0100").unwrap();
        assert!(matches!(result, Instant::Offset(_)));
        assert_eq!(result.date(), NaiveDate::from_ymd_opt(2021, 11, 13).unwrap());
    }

    #[test]
    fn iso_offset_with_colon() {
        let result = normalize("2021-11-13T23:30:00+02:00").unwrap();
        let EventTime::DateTimeUtc(dt) = result.to_event_time() else {
            panic!("expected UTC event time");
        };
        assert_eq!(dt.hour(), 21);
        // wall-clock date is kept for all-day mapping
        assert_eq!(result.date(), NaiveDate::from_ymd_opt(2021, 11, 13).unwrap());
    }

    #[test]
    fn naive_format() {
        let result = normalize("2021-11-13 09:00:00").unwrap();
        assert_eq!(result, Instant::Naive(naive(2021, 11, 13, 9, 0, 0)));
        assert_eq!(
            result.to_event_time(),
            EventTime::DateTimeFloating(naive(2021, 11, 13, 9, 0, 0))
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let result = normalize("  2021-11-13 09:00:00\n").unwrap();
        assert_eq!(result, Instant::Naive(naive(2021, 11, 13, 9, 0, 0)));
    }

    #[test]
    fn offset_pattern_wins_over_naive() {
        let result = normalize("2021-11-13 09:00:00 +0000").unwrap();
        assert!(matches!(result, Instant::Offset(_)));
    }

    #[test]
    fn bare_date_is_midnight() {
        let result = normalize("2021-11-13").unwrap();
        assert_eq!(result, Instant::Naive(naive(2021, 11, 13, 0, 0, 0)));
    }

    #[test]
    fn permissive_fallback_accepts_relative_dates() {
        assert!(normalize("tomorrow").is_ok());
    }

    #[test]
    fn garbage_is_a_date_parse_error() {
        let err = normalize("not a date at all xyz").unwrap_err();
        assert!(matches!(err, ExportError::DateParse(ref raw) if raw == "not a date at all xyz"));
    }
}
