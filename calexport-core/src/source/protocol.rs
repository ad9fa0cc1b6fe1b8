//! JSON protocol spoken with the calendar helper over stdin/stdout.
//!
//! One request line goes in, one JSON document comes out. Replies are keyed
//! by what they carry (`calendars`, `events`, `success`) or by `error`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::RawEventRecord;
use crate::source::CalendarInfo;

pub trait HelperCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListCalendars,
    ListEvents,
    DeleteEvents,
    ImportFile,
}

/// Request sent to the helper.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Reply from the helper. An `error` key wins over anything else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Error { error: String },
    Ok(T),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCalendars {}

#[derive(Debug, Deserialize)]
pub struct CalendarList {
    pub calendars: Vec<CalendarInfo>,
}

impl HelperCommand for ListCalendars {
    type Response = CalendarList;
    fn command() -> Command {
        Command::ListCalendars
    }
}

/// Events between two dates (inclusive, `YYYY-MM-DD`).
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    pub start_date: String,
    pub end_date: String,
    /// All calendars when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventList {
    pub events: Vec<RawEventRecord>,
}

impl HelperCommand for ListEvents {
    type Response = EventList;
    fn command() -> Command {
        Command::ListEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvents {
    pub calendar_name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct Outcome {
    pub success: bool,
}

impl HelperCommand for DeleteEvents {
    type Response = Outcome;
    fn command() -> Command {
        Command::DeleteEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportFile {
    pub calendar_name: String,
    pub file_path: String,
}

impl HelperCommand for ImportFile {
    type Response = Outcome;
    fn command() -> Command {
        Command::ImportFile
    }
}
