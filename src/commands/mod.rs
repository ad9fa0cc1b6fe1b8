pub mod calendars;
pub mod config;
pub mod export;
