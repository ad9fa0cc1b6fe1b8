//! In-memory collaborators for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::delivery::{RemoteTarget, RemoteTransfer};
use crate::error::{ExportError, ExportResult};
use crate::event::RawEventRecord;
use crate::source::{CalendarInfo, CalendarSource, LocalCalendar};
use crate::window::DateWindow;

pub(crate) fn raw_event(title: &str, calendar: &str) -> RawEventRecord {
    RawEventRecord {
        title: title.to_string(),
        event_id: format!("{calendar}-{title}"),
        calendar_name: calendar.to_string(),
        start_date: "2025-03-20 09:00:00".to_string(),
        end_date: "2025-03-20 10:00:00".to_string(),
        all_day: false,
        location: None,
        description: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeSource {
    calendars: Vec<(String, Vec<RawEventRecord>)>,
    failures: HashMap<String, String>,
    fail_all: Option<String>,
    queries: RefCell<Vec<Option<String>>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_calendar(mut self, name: &str, events: Vec<RawEventRecord>) -> Self {
        self.calendars.push((name.to_string(), events));
        self
    }

    pub(crate) fn failing(mut self, name: &str, message: &str) -> Self {
        self.failures.insert(name.to_string(), message.to_string());
        self
    }

    pub(crate) fn failing_all(mut self, message: &str) -> Self {
        self.fail_all = Some(message.to_string());
        self
    }

    /// Calendar filter of every query, in call order.
    pub(crate) fn queries(&self) -> Vec<Option<String>> {
        self.queries.borrow().clone()
    }
}

impl CalendarSource for FakeSource {
    async fn list_calendars(&self) -> ExportResult<Vec<CalendarInfo>> {
        Ok(self
            .calendars
            .iter()
            .map(|(name, _)| CalendarInfo {
                title: name.clone(),
                id: name.to_lowercase(),
                kind: "Local".to_string(),
                source: "Fake".to_string(),
            })
            .collect())
    }

    async fn query_events(
        &self,
        _window: &DateWindow,
        calendar: Option<&str>,
    ) -> ExportResult<Vec<RawEventRecord>> {
        self.queries.borrow_mut().push(calendar.map(str::to_string));

        if let Some(message) = &self.fail_all {
            return Err(ExportError::ExternalQuery(message.clone()));
        }

        match calendar {
            Some(name) => {
                if let Some(message) = self.failures.get(name) {
                    return Err(ExportError::ExternalQuery(message.clone()));
                }
                Ok(self
                    .calendars
                    .iter()
                    .filter(|(n, _)| n == name)
                    .flat_map(|(_, events)| events.clone())
                    .collect())
            }
            None => Ok(self
                .calendars
                .iter()
                .flat_map(|(_, events)| events.clone())
                .collect()),
        }
    }
}

pub(crate) struct FakeLocal {
    delete_ok: bool,
    import_ok: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeLocal {
    pub(crate) fn new() -> Self {
        FakeLocal {
            delete_ok: true,
            import_ok: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn delete_fails(mut self) -> Self {
        self.delete_ok = false;
        self
    }

    pub(crate) fn import_rejected(mut self) -> Self {
        self.import_ok = false;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl LocalCalendar for FakeLocal {
    async fn delete_events(&self, calendar: &str, _window: &DateWindow) -> ExportResult<bool> {
        self.calls.borrow_mut().push(format!("delete {calendar}"));
        if self.delete_ok {
            Ok(true)
        } else {
            Err(ExportError::ExternalQuery("delete refused".into()))
        }
    }

    async fn import_file(&self, calendar: &str, path: &Path) -> ExportResult<bool> {
        self.calls
            .borrow_mut()
            .push(format!("import {calendar} {}", path.display()));
        Ok(self.import_ok)
    }
}

#[derive(Default)]
pub(crate) struct FakeTransfer {
    error: Option<String>,
    uploads: RefCell<Vec<String>>,
}

impl FakeTransfer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// `user@host:port/path` of every attempted upload.
    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.borrow().clone()
    }
}

impl RemoteTransfer for FakeTransfer {
    async fn upload(&self, target: &RemoteTarget, _local: &Path) -> ExportResult<()> {
        self.uploads.borrow_mut().push(format!(
            "{}@{}:{}{}",
            target.username, target.host, target.port, target.remote_path
        ));
        match &self.error {
            Some(message) => Err(ExportError::DeliveryTransport(message.clone())),
            None => Ok(()),
        }
    }
}
