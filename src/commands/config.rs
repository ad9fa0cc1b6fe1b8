use std::path::Path;

use anyhow::Result;
use calexport_core::ExportConfig;
use owo_colors::OwoColorize;

pub fn run(config: &ExportConfig, explicit_path: Option<&Path>) -> Result<()> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => ExportConfig::default_path()?,
    };

    println!("{}", "Paths".bold());
    println!("  Config:  {}", path.display());
    println!("  Output:  {}", config.output_file().display());
    println!();

    println!("{}", "Effective configuration".bold());
    println!("{}", config.to_toml()?);

    if config.sftp.password.is_some() {
        println!("{}", "(sftp.password is set but not shown)".dimmed());
    }

    Ok(())
}
