//! Export configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file (~/.config/calexport/config.toml), then `CALEXPORT_*`
//! environment variables. The result is read-only for the rest of the run.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};

const ENV_PREFIX: &str = "CALEXPORT";
const DEFAULT_OUTPUT_FILE: &str = "~/calendar_export.ics";
const DEFAULT_DISPLAY_NAME: &str = "Exported Calendar";
const DEFAULT_TITLE_LENGTH_LIMIT: usize = 36;
const DEFAULT_HELPER: &str = "calexport-eventkit";

/// Complete configuration for one export run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub calendar: CalendarSettings,
    pub sftp: SftpSettings,
    pub source: SourceSettings,
}

/// What to export and how the document looks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendars to export; empty means all of them
    pub names: Vec<String>,
    pub days_ahead: u32,
    pub days_behind: u32,
    pub output_file: String,
    /// X-WR-CALNAME of the generated document
    pub display_name: String,
    /// Maximum title length, 0 for unlimited
    pub title_length_limit: usize,
    /// Include description and location
    pub include_details: bool,
    /// When set, replace this local calendar's events with the export
    pub local_import_calendar: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        CalendarSettings {
            names: Vec::new(),
            days_ahead: 30,
            days_behind: 30,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            title_length_limit: DEFAULT_TITLE_LENGTH_LIMIT,
            include_details: false,
            local_import_calendar: String::new(),
        }
    }
}

/// Remote transfer target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Never written back out
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub key_file: Option<String>,
    #[serde(skip_serializing)]
    pub key_passphrase: Option<String>,
    /// Full remote file path
    pub remote_path: String,
    pub create_dirs: bool,
    pub timeout_secs: u64,
}

impl Default for SftpSettings {
    fn default() -> Self {
        SftpSettings {
            enabled: false,
            host: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            key_file: None,
            key_passphrase: None,
            remote_path: "/calendar/calendar.ics".to_string(),
            create_dirs: true,
            timeout_secs: 30,
        }
    }
}

/// The external helper that talks to the platform calendar store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Executable name (looked up in PATH) or path
    pub helper: String,
    /// Extra arguments, e.g. a script path when `helper` is an interpreter
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            helper: DEFAULT_HELPER.to_string(),
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl ExportConfig {
    /// ~/.config/calexport/config.toml
    pub fn default_path() -> ExportResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ExportError::Config("Could not determine config directory".into()))?
            .join("calexport");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> ExportResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("calendar.names");

        Self::layered(&path, required, env)
    }

    fn layered(path: &Path, required: bool, env: Environment) -> ExportResult<Self> {
        let config: ExportConfig = Config::builder()
            .add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(env)
            .build()
            .map_err(|e| ExportError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ExportError::Config(e.to_string()))?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Output path with `~` expanded.
    pub fn output_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.calendar.output_file).into_owned())
    }

    /// TOML rendering without secrets.
    pub fn to_toml(&self) -> ExportResult<String> {
        toml::to_string_pretty(self).map_err(|e| ExportError::Serialization(e.to_string()))
    }
}
