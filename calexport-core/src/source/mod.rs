//! Where events come from.
//!
//! The platform calendar store is reached through an external helper
//! executable. The pipeline only sees the traits below, so tests can run it
//! against in-memory fakes.

mod helper;
pub mod protocol;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExportResult;
use crate::event::RawEventRecord;
use crate::window::DateWindow;

pub use helper::HelperProcess;

/// A calendar as reported by the helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub title: String,
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub source: String,
}

/// Read access to a calendar store.
#[allow(async_fn_in_trait)]
pub trait CalendarSource {
    async fn list_calendars(&self) -> ExportResult<Vec<CalendarInfo>>;

    /// Events in `window`, from one calendar or (with `None`) from all of them.
    async fn query_events(
        &self,
        window: &DateWindow,
        calendar: Option<&str>,
    ) -> ExportResult<Vec<RawEventRecord>>;
}

/// Write access to a local calendar, used for replace-imports.
///
/// Both operations report whether the store accepted them.
#[allow(async_fn_in_trait)]
pub trait LocalCalendar {
    async fn delete_events(&self, calendar: &str, window: &DateWindow) -> ExportResult<bool>;

    async fn import_file(&self, calendar: &str, path: &Path) -> ExportResult<bool>;
}
