//! Event types.
//!
//! `RawEventRecord` is what the calendar helper hands us, untouched.
//! `NormalizedEvent` is what ends up in the document, with parsed times.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event exactly as reported by the calendar source.
///
/// Date strings are free-form; their format is not guaranteed to be
/// consistent even within a single batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEventRecord {
    pub title: String,
    pub event_id: String,
    #[serde(default)]
    pub calendar_name: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Start or end of a normalized event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// All-day: a calendar date with no time of day
    Date(NaiveDate),
    /// Instant that carried an offset in the source, kept in UTC
    DateTimeUtc(DateTime<Utc>),
    /// Offset-less wall-clock time (floating)
    DateTimeFloating(NaiveDateTime),
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Compact form used to build per-occurrence UIDs.
    pub fn compact(&self) -> String {
        match self {
            EventTime::Date(d) => d.format("%Y%m%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            EventTime::DateTimeFloating(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
        }
    }
}

/// An event ready to be written into a calendar document.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    /// Possibly truncated title
    pub title: String,
    pub event_id: String,
    pub calendar_name: String,
    pub start: EventTime,
    pub end: EventTime,
    /// Only present when details were requested
    pub location: Option<String>,
    /// Only present when details were requested
    pub description: Option<String>,
}

impl NormalizedEvent {
    /// UID for the document.
    ///
    /// Occurrences of a recurring event share their source id, so the start
    /// time is appended to keep every occurrence unique.
    pub fn uid(&self) -> String {
        format!("{}-{}", self.event_id, self.start.compact())
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }
}
