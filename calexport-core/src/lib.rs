//! Core of calexport.
//!
//! Turns raw calendar events into an ICS document and delivers it:
//! - `aggregate` collects events from a `CalendarSource`
//! - `ics` builds, renders and post-processes the document
//! - `delivery` picks and runs one delivery strategy
//! - `export` ties them together for a single run

pub mod aggregate;
pub mod collect;
pub mod config;
pub mod date;
pub mod delivery;
pub mod error;
pub mod event;
pub mod export;
pub mod ics;
pub mod source;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use collect::{Collected, Warning};
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use event::{EventTime, NormalizedEvent, RawEventRecord};
pub use export::{ExportContext, ExportReport};
pub use window::DateWindow;
