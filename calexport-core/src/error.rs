//! Error types for calexport.

use thiserror::Error;

/// Errors that can occur while exporting and delivering a calendar.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot parse date format: {0}")]
    DateParse(String),

    #[error("Calendar query failed: {0}")]
    ExternalQuery(String),

    #[error("Calendar query timed out after {0}s")]
    QueryTimeout(u64),

    #[error("Cannot build event '{title}': {reason}")]
    DocumentBuild { title: String, reason: String },

    #[error("Delivery configuration error: {0}")]
    DeliveryConfig(String),

    #[error("Delivery failed: {0}")]
    DeliveryTransport(String),

    #[error("No events found between {from} and {to}")]
    NoEvents { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for calexport operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_name_the_event() {
        let err = ExportError::DocumentBuild {
            title: "Standup".into(),
            reason: "ends before it starts".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot build event 'Standup': ends before it starts"
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: ExportError = std::io::Error::other("disk full").into();
        assert!(matches!(err, ExportError::Io(_)));
        assert_eq!(err.to_string(), "IO error: disk full");
    }
}
