//! Building a calendar document from raw event records.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::collect::{Collected, Warning};
use crate::date::{self, Instant};
use crate::error::{ExportError, ExportResult};
use crate::event::{EventTime, NormalizedEvent, RawEventRecord};
use crate::ics::timezone::TimezoneDefinition;

pub const PRODUCT_ID: &str = "-//calexport//calexport//EN";
pub const ICS_VERSION: &str = "2.0";

/// Appended to titles cut at the object level.
pub const TITLE_ELLIPSIS: char = '…';

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub include_details: bool,
    /// Maximum title length in characters, 0 for unlimited
    pub title_limit: usize,
}

/// In-memory calendar, ready to be rendered.
#[derive(Debug, Clone)]
pub struct CalendarDocument {
    pub product_id: String,
    pub version: &'static str,
    pub display_name: String,
    /// Owned by this document, never shared
    pub timezone: TimezoneDefinition,
    pub events: Vec<NormalizedEvent>,
    /// DTSTAMP for every event
    pub stamp: DateTime<Utc>,
}

impl CalendarDocument {
    pub fn new(display_name: &str, events: Vec<NormalizedEvent>) -> Self {
        CalendarDocument {
            product_id: PRODUCT_ID.to_string(),
            version: ICS_VERSION,
            display_name: display_name.to_string(),
            timezone: TimezoneDefinition::europe_berlin(),
            events,
            stamp: Utc::now(),
        }
    }
}

/// A built document plus everything that had to be left out of it.
#[derive(Debug)]
pub struct BuiltDocument {
    pub document: CalendarDocument,
    pub warnings: Vec<Warning>,
}

/// Build a document from `records`.
///
/// Never fails as a whole: an event that cannot be built is logged, reported
/// in `warnings` and skipped. Titles are truncated in place in `records`, so
/// anything reading them afterwards sees the same text as the document.
pub fn build(
    records: &mut [RawEventRecord],
    display_name: &str,
    options: BuildOptions,
) -> BuiltDocument {
    tracing::info!(count = records.len(), "Generating calendar document");

    let mut events = Collected::new();
    for record in records.iter_mut() {
        let subject = record.title.clone();
        events.record(subject, build_event(record, options));
    }

    BuiltDocument {
        document: CalendarDocument::new(display_name, events.items),
        warnings: events.warnings,
    }
}

/// Build one event, truncating `record.title` if it is over the limit.
pub fn build_event(
    record: &mut RawEventRecord,
    options: BuildOptions,
) -> ExportResult<NormalizedEvent> {
    let start = date::normalize(&record.start_date)?;
    let end = date::normalize(&record.end_date)?;

    let original = record.title.clone();
    if truncate_title(&mut record.title, options.title_limit) {
        tracing::info!(from = %original, to = %record.title, "Truncated title");
    }

    let backwards = if record.all_day {
        end.date() < start.date()
    } else {
        ends_before_start(&start, &end)
    };
    if backwards {
        return Err(ExportError::DocumentBuild {
            title: record.title.clone(),
            reason: format!(
                "ends ({}) before it starts ({})",
                record.end_date, record.start_date
            ),
        });
    }

    let (start, end) = if record.all_day {
        all_day_span(start, end)
    } else {
        (start.to_event_time(), end.to_event_time())
    };

    let (location, description) = if options.include_details {
        (
            non_empty(record.location.as_deref()),
            non_empty(record.description.as_deref()),
        )
    } else {
        (None, None)
    };

    Ok(NormalizedEvent {
        title: record.title.clone(),
        event_id: record.event_id.clone(),
        calendar_name: record.calendar_name.clone(),
        start,
        end,
        location,
        description,
    })
}

/// Cut `title` to `limit` characters plus an ellipsis.
///
/// Returns whether the title changed. Applying it to an already truncated
/// title is a no-op.
pub fn truncate_title(title: &mut String, limit: usize) -> bool {
    if limit == 0 {
        return false;
    }

    let len = title.chars().count();
    if len <= limit || (len == limit + 1 && title.ends_with(TITLE_ELLIPSIS)) {
        return false;
    }

    if let Some((cut, _)) = title.char_indices().nth(limit) {
        title.truncate(cut);
    }
    title.push(TITLE_ELLIPSIS);
    true
}

/// Instants compare in UTC only when both carry an offset. A naive side is
/// local wall-clock time, so mixed pairs compare as written.
fn ends_before_start(start: &Instant, end: &Instant) -> bool {
    match (start, end) {
        (Instant::Offset(s), Instant::Offset(e)) => e < s,
        _ => end.wall_clock() < start.wall_clock(),
    }
}

/// Date-only span with an exclusive end date.
fn all_day_span(start: Instant, end: Instant) -> (EventTime, EventTime) {
    let start_date = start.date();
    let end_date = exclusive_end(start_date, end);
    (EventTime::Date(start_date), EventTime::Date(end_date))
}

/// Sources report all-day ends either as the last day itself (often at
/// 23:59:59) or as midnight of the following day.
fn exclusive_end(start_date: NaiveDate, end: Instant) -> NaiveDate {
    let end_date = end.date();
    let at_midnight = end.wall_clock().time() == NaiveTime::MIN;

    if end_date < start_date || (at_midnight && end_date > start_date) {
        end_date
    } else {
        end_date + Duration::days(1)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
