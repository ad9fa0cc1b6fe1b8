use std::path::PathBuf;

use anyhow::{Context, Result};
use calexport_core::delivery::SftpUploader;
use calexport_core::export;
use calexport_core::source::HelperProcess;
use calexport_core::{ExportConfig, ExportContext, ExportError};
use clap::Args;
use owo_colors::OwoColorize;

/// Per-run overrides of the loaded configuration.
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Calendar to export (repeatable; default: all)
    #[arg(short, long = "calendar")]
    pub calendars: Vec<String>,

    /// Days after today to include
    #[arg(long)]
    pub days_ahead: Option<u32>,

    /// Days before today to include
    #[arg(long)]
    pub days_behind: Option<u32>,

    /// Where to write the .ics file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Calendar display name in the document
    #[arg(long)]
    pub name: Option<String>,

    /// Maximum title length (0 = unlimited)
    #[arg(long)]
    pub title_length: Option<usize>,

    /// Include descriptions and locations
    #[arg(long)]
    pub include_details: bool,

    /// Skip the SFTP upload even if it is configured
    #[arg(long)]
    pub no_upload: bool,

    /// Replace the window's events in this local calendar with the export
    #[arg(long)]
    pub import_into: Option<String>,
}

impl ExportArgs {
    pub fn apply(self, config: &mut ExportConfig) {
        let calendar = &mut config.calendar;
        if !self.calendars.is_empty() {
            calendar.names = self.calendars;
        }
        if let Some(days) = self.days_ahead {
            calendar.days_ahead = days;
        }
        if let Some(days) = self.days_behind {
            calendar.days_behind = days;
        }
        if let Some(output) = self.output {
            calendar.output_file = output.display().to_string();
        }
        if let Some(name) = self.name {
            calendar.display_name = name;
        }
        if let Some(limit) = self.title_length {
            calendar.title_length_limit = limit;
        }
        if self.include_details {
            calendar.include_details = true;
        }
        if let Some(target) = self.import_into {
            calendar.local_import_calendar = target;
        }
        if self.no_upload {
            config.sftp.enabled = false;
        }
    }
}

pub async fn run(mut config: ExportConfig, args: ExportArgs) -> Result<()> {
    args.apply(&mut config);

    let helper = HelperProcess::new(&config.source).context("Calendar helper unavailable")?;
    tracing::debug!(helper = %helper.binary().display(), "Using calendar helper");
    let ctx = ExportContext::new(config);
    let output = ctx.config.output_file();

    let scope = if ctx.config.calendar.names.is_empty() {
        "all calendars".to_string()
    } else {
        ctx.config.calendar.names.join(", ")
    };
    println!(
        "Exporting {} from {} to {}",
        scope.bold(),
        ctx.window.start_arg(),
        ctx.window.end_arg()
    );

    let report = match export::run(&ctx, &helper, &helper, &SftpUploader::new()).await {
        Ok(report) => report,
        Err(e @ (ExportError::DeliveryConfig(_) | ExportError::DeliveryTransport(_))) => {
            return Err(e).with_context(|| {
                format!(
                    "Calendar written to {}, but delivery failed",
                    output.display()
                )
            });
        }
        Err(e) => return Err(e).context("Export failed"),
    };

    for warning in &report.warnings {
        println!(
            "   {} {}: {}",
            "skipped".yellow(),
            warning.subject,
            warning.message.dimmed()
        );
    }

    println!(
        "{} {} events written to {}",
        "✓".green(),
        report.events_written,
        report.output.display()
    );
    println!("  Delivery: {}", report.delivery);

    Ok(())
}
