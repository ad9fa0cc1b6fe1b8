//! Export date window.

use chrono::{Duration, Local, NaiveDate};

/// Days before and after today to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window around `today`, from midnight `days_behind` days ago to
    /// midnight `days_ahead` days from now.
    pub fn around(today: NaiveDate, days_behind: u32, days_ahead: u32) -> Self {
        DateWindow {
            start: today - Duration::days(i64::from(days_behind)),
            end: today + Duration::days(i64::from(days_ahead)),
        }
    }

    /// Window around the local date of the machine running the export.
    pub fn from_today(days_behind: u32, days_ahead: u32) -> Self {
        Self::around(Local::now().date_naive(), days_behind, days_ahead)
    }

    /// `start` as passed to the calendar helper.
    pub fn start_arg(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// `end` as passed to the calendar helper.
    pub fn end_arg(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}
