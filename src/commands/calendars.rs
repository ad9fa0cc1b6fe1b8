use anyhow::{Context, Result};
use calexport_core::ExportConfig;
use calexport_core::source::{CalendarSource, HelperProcess};
use owo_colors::OwoColorize;

pub async fn run(config: &ExportConfig, json: bool) -> Result<()> {
    let helper = HelperProcess::new(&config.source).context("Calendar helper unavailable")?;
    let calendars = helper
        .list_calendars()
        .await
        .context("Failed to list calendars")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&calendars)?);
        return Ok(());
    }

    if calendars.is_empty() {
        println!("No calendars found.");
        return Ok(());
    }

    for cal in &calendars {
        let selected = config.calendar.names.is_empty() || config.calendar.names.contains(&cal.title);
        let marker = if selected { "●".green().to_string() } else { "○".dimmed().to_string() };
        println!(
            "{} {}  {}",
            marker,
            cal.title.bold(),
            format!("{} · {}", cal.kind, cal.source).dimmed()
        );
    }

    Ok(())
}
