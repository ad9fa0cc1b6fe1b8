//! Calendar helper subprocess.
//!
//! Every call spawns the configured helper, writes one JSON request line to
//! its stdin and reads one JSON reply from its stdout. Anything other than a
//! well-formed reply (spawn failure, non-zero exit, empty or malformed
//! output, an `error` reply) fails that call only.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::config::SourceSettings;
use crate::error::{ExportError, ExportResult};
use crate::event::RawEventRecord;
use crate::source::protocol::{
    Command, DeleteEvents, HelperCommand, ImportFile, ListCalendars, ListEvents, Reply, Request,
};
use crate::source::{CalendarInfo, CalendarSource, LocalCalendar};
use crate::window::DateWindow;

const STDOUT_LOG_LIMIT: usize = 1000;
const STDERR_LOG_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct HelperProcess {
    binary: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl HelperProcess {
    /// Resolve the helper from settings (`~` expanded, then looked up in PATH).
    pub fn new(settings: &SourceSettings) -> ExportResult<Self> {
        let name = shellexpand::tilde(&settings.helper).into_owned();
        let binary = which::which(&name).map_err(|_| {
            ExportError::ExternalQuery(format!(
                "Calendar helper '{name}' not found. Set source.helper in the config file"
            ))
        })?;

        Ok(Self::with_binary(
            binary,
            settings.args.clone(),
            Duration::from_secs(settings.timeout_secs),
        ))
    }

    pub fn with_binary(binary: PathBuf, args: Vec<String>, timeout: Duration) -> Self {
        HelperProcess {
            binary,
            args,
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Call a typed helper command and return its reply.
    pub async fn call<C: HelperCommand>(&self, cmd: C) -> ExportResult<C::Response> {
        timeout(self.timeout, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| ExportError::QueryTimeout(self.timeout.as_secs()))?
    }

    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> ExportResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| ExportError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| ExportError::Serialization(e.to_string()))?;

        tracing::debug!(helper = %self.binary.display(), ?command, "Calling calendar helper");

        let mut child = TokioCommand::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExportError::ExternalQuery(format!(
                    "Failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExportError::ExternalQuery("Helper stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await
            .map_err(|e| ExportError::ExternalQuery(format!("Failed to send request: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExportError::ExternalQuery(format!("Failed to read reply: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            tracing::error!(
                stdout = %clip(&stdout, STDOUT_LOG_LIMIT),
                stderr = %clip(&stderr, STDERR_LOG_LIMIT),
                "Calendar helper failed"
            );
            return Err(ExportError::ExternalQuery(format!(
                "Helper exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        if stdout.trim().is_empty() {
            tracing::error!(stderr = %clip(&stderr, STDERR_LOG_LIMIT), "Calendar helper returned no output");
            return Err(ExportError::ExternalQuery(
                "Helper returned no response".into(),
            ));
        }

        let reply: Reply<R> = serde_json::from_str(&stdout).map_err(|e| {
            tracing::error!(output = %clip(&stdout, STDOUT_LOG_LIMIT), "Malformed helper reply");
            ExportError::ExternalQuery(format!("Failed to parse response: {e}"))
        })?;

        match reply {
            Reply::Ok(data) => Ok(data),
            Reply::Error { error } => Err(ExportError::ExternalQuery(error)),
        }
    }
}

impl CalendarSource for HelperProcess {
    async fn list_calendars(&self) -> ExportResult<Vec<CalendarInfo>> {
        Ok(self.call(ListCalendars {}).await?.calendars)
    }

    async fn query_events(
        &self,
        window: &DateWindow,
        calendar: Option<&str>,
    ) -> ExportResult<Vec<RawEventRecord>> {
        let reply = self
            .call(ListEvents {
                start_date: window.start_arg(),
                end_date: window.end_arg(),
                calendar_name: calendar.map(str::to_string),
            })
            .await?;
        Ok(reply.events)
    }
}

impl LocalCalendar for HelperProcess {
    async fn delete_events(&self, calendar: &str, window: &DateWindow) -> ExportResult<bool> {
        let reply = self
            .call(DeleteEvents {
                calendar_name: calendar.to_string(),
                start_date: window.start_arg(),
                end_date: window.end_arg(),
            })
            .await?;
        Ok(reply.success)
    }

    async fn import_file(&self, calendar: &str, path: &Path) -> ExportResult<bool> {
        let reply = self
            .call(ImportFile {
                calendar_name: calendar.to_string(),
                file_path: path.display().to_string(),
            })
            .await?;
        Ok(reply.success)
    }
}

/// First `limit` characters of `text`, for logging.
fn clip(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
