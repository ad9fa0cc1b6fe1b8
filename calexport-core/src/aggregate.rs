//! Collecting raw events from one or more calendars.

use crate::collect::{Collected, Warning};
use crate::event::RawEventRecord;
use crate::source::CalendarSource;
use crate::window::DateWindow;

/// Subject used for warnings when all calendars were queried at once.
pub const ALL_CALENDARS: &str = "all calendars";

/// Query `source` for events in `window`.
///
/// With no `names`, one query covers every calendar. Otherwise each name is
/// queried in turn; a failing name is logged and left out, the others still
/// count. Results keep the order of `names` and are not deduplicated.
pub async fn aggregate<S: CalendarSource>(
    source: &S,
    names: &[String],
    window: &DateWindow,
) -> Collected<RawEventRecord> {
    let mut collected = Collected::new();

    if names.is_empty() {
        tracing::info!(from = %window.start, to = %window.end, "Fetching events from all calendars");
        match source.query_events(window, None).await {
            Ok(events) => collected.items.extend(events),
            Err(e) => {
                tracing::error!("Fetching events from all calendars failed: {}", e);
                collected.warnings.push(Warning::new(ALL_CALENDARS, &e));
            }
        }
        return collected;
    }

    for name in names {
        tracing::info!(calendar = %name, "Fetching events");
        match source.query_events(window, Some(name)).await {
            Ok(events) => {
                tracing::debug!(calendar = %name, count = events.len(), "Fetched events");
                collected.items.extend(events);
            }
            Err(e) => collected.absorb(name.as_str(), e),
        }
    }

    collected
}
