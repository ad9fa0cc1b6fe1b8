//! Partial-failure results.
//!
//! Per-event and per-calendar failures are never raised. They are folded
//! into a `Collected` next to the successful items so callers can inspect
//! (and tests can assert on) exactly what was skipped.

use crate::error::ExportError;

/// A failure that cost one item, not the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// What was skipped: an event title, a calendar name, ...
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(subject: impl Into<String>, error: &ExportError) -> Self {
        Warning {
            subject: subject.into(),
            message: error.to_string(),
        }
    }
}

/// Successful items plus the warnings for everything that was skipped.
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub warnings: Vec<Warning>,
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Collected {
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> Collected<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Record a skipped item and log it.
    pub fn absorb(&mut self, subject: impl Into<String>, error: ExportError) {
        let warning = Warning::new(subject, &error);
        tracing::warn!(subject = %warning.subject, "Skipping: {}", warning.message);
        self.warnings.push(warning);
    }

    /// Fold one result into the collection.
    pub fn record(&mut self, subject: impl Into<String>, result: Result<T, ExportError>) {
        match result {
            Ok(item) => self.push(item),
            Err(error) => self.absorb(subject, error),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
