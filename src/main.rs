mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calexport_core::ExportConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "calexport")]
#[command(about = "Export calendar events to an ICS file and deliver it")]
struct Cli {
    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.config/calexport/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export events and deliver the document
    Export(commands::export::ExportArgs),
    /// List the calendars the helper can see
    ListCalendars {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = ExportConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    tracing::debug!(
        calendars = ?config.calendar.names,
        sftp = config.sftp.enabled,
        local_import = %config.calendar.local_import_calendar,
        "Configuration ready"
    );

    match cli.command {
        Commands::Export(args) => commands::export::run(config, args).await,
        Commands::ListCalendars { json } => commands::calendars::run(&config, json).await,
        Commands::ShowConfig => commands::config::run(&config, cli.config.as_deref()),
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "calexport=debug,calexport_core=debug"
    } else {
        "calexport=info,calexport_core=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
