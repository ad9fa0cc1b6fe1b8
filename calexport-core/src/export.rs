//! One export run: aggregate, build, serialize, write, deliver.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::aggregate::aggregate;
use crate::collect::Warning;
use crate::config::ExportConfig;
use crate::delivery::{self, DeliveryOutcome, RemoteTransfer};
use crate::error::{ExportError, ExportResult};
use crate::ics::{self, BuildOptions};
use crate::source::{CalendarSource, LocalCalendar};
use crate::window::DateWindow;

/// Everything a run reads, built once and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub config: ExportConfig,
    pub window: DateWindow,
}

impl ExportContext {
    /// Context with the window computed from today's date.
    pub fn new(config: ExportConfig) -> Self {
        let window =
            DateWindow::from_today(config.calendar.days_behind, config.calendar.days_ahead);
        ExportContext { config, window }
    }

    pub fn with_window(config: ExportConfig, window: DateWindow) -> Self {
        ExportContext { config, window }
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            include_details: self.config.calendar.include_details,
            title_limit: self.config.calendar.title_length_limit,
        }
    }
}

#[derive(Debug)]
pub struct ExportReport {
    pub output: PathBuf,
    pub events_written: usize,
    /// Calendars and events that were skipped
    pub warnings: Vec<Warning>,
    pub delivery: DeliveryOutcome,
}

/// Run a complete export.
///
/// Fails without writing anything when no events were found. A delivery
/// failure is returned after the document has been written, so the file
/// stays usable.
pub async fn run<S, L, T>(
    ctx: &ExportContext,
    source: &S,
    local: &L,
    transfer: &T,
) -> ExportResult<ExportReport>
where
    S: CalendarSource,
    L: LocalCalendar,
    T: RemoteTransfer,
{
    let calendar = &ctx.config.calendar;

    let aggregated = aggregate(source, &calendar.names, &ctx.window).await;
    let mut warnings = aggregated.warnings;
    let mut records = aggregated.items;
    if records.is_empty() {
        return Err(ExportError::NoEvents {
            from: ctx.window.start_arg(),
            to: ctx.window.end_arg(),
        });
    }
    tracing::info!(count = records.len(), "Collected events");

    let options = ctx.build_options();
    let built = ics::build(&mut records, &calendar.display_name, options);
    warnings.extend(built.warnings);
    let events_written = built.document.events.len();

    let bytes = ics::serialize(&built.document, options.title_limit);
    let output = ctx.config.output_file();
    write_document(&output, &bytes)?;
    tracing::info!(path = %output.display(), events = events_written, "Wrote calendar");

    let decision = delivery::decide(&ctx.config)?;
    let outcome = delivery::route(&decision, &ctx.window, &output, local, transfer).await?;

    Ok(ExportReport {
        output,
        events_written,
        warnings,
        delivery: outcome,
    })
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so readers see either the old file or the complete new one.
pub fn write_document(path: &Path, bytes: &[u8]) -> ExportResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ExportError::Io(e.error))?;
    Ok(())
}
