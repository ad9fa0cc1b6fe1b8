//! Delivering a written document.
//!
//! Exactly one strategy runs per export, chosen once from the configuration
//! in strict priority order: replace-import into a local calendar, then
//! remote transfer, then nothing.

mod sftp;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::source::LocalCalendar;
use crate::window::DateWindow;

pub use sftp::SftpUploader;

/// Pushes a local file to a remote target.
#[allow(async_fn_in_trait)]
pub trait RemoteTransfer {
    async fn upload(&self, target: &RemoteTarget, local: &Path) -> ExportResult<()>;
}

/// Authentication material for a remote target. Secrets never show up in
/// `Debug` output.
#[derive(Clone, Default)]
pub struct Credentials {
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
    pub key_passphrase: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.key_file.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field(
                "key_passphrase",
                &self.key_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credentials: Credentials,
    /// Full remote file path
    pub remote_path: String,
    pub create_dirs: bool,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum DeliveryDecision {
    NoOp,
    LocalReplace { calendar: String },
    RemoteTransfer(RemoteTarget),
}

/// What delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Left on local storage only
    Kept,
    Imported {
        calendar: String,
        /// The pre-import delete failed; older events may still be there
        stale_events_kept: bool,
    },
    Uploaded {
        host: String,
        remote_path: String,
    },
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Kept => write!(f, "kept locally"),
            DeliveryOutcome::Imported {
                calendar,
                stale_events_kept: false,
            } => write!(f, "imported into '{calendar}'"),
            DeliveryOutcome::Imported {
                calendar,
                stale_events_kept: true,
            } => write!(f, "imported into '{calendar}' (old events could not be removed)"),
            DeliveryOutcome::Uploaded { host, remote_path } => {
                write!(f, "uploaded to {host}:{remote_path}")
            }
        }
    }
}

/// Pick the delivery strategy for this run.
///
/// SFTP that is enabled but lacks a host, a username or any credential is a
/// configuration error rather than a silent no-op.
pub fn decide(config: &ExportConfig) -> ExportResult<DeliveryDecision> {
    let calendar = config.calendar.local_import_calendar.trim();
    if !calendar.is_empty() {
        return Ok(DeliveryDecision::LocalReplace {
            calendar: calendar.to_string(),
        });
    }

    let sftp = &config.sftp;
    if !sftp.enabled {
        return Ok(DeliveryDecision::NoOp);
    }

    if sftp.host.trim().is_empty() || sftp.username.trim().is_empty() {
        return Err(ExportError::DeliveryConfig(
            "SFTP is enabled but host or username is missing".into(),
        ));
    }

    let credentials = Credentials {
        password: sftp.password.clone().filter(|p| !p.is_empty()),
        key_file: sftp
            .key_file
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(|k| PathBuf::from(shellexpand::tilde(k).into_owned())),
        key_passphrase: sftp.key_passphrase.clone().filter(|p| !p.is_empty()),
    };
    if credentials.is_empty() {
        return Err(ExportError::DeliveryConfig(
            "SFTP needs either a password or a key file".into(),
        ));
    }

    Ok(DeliveryDecision::RemoteTransfer(RemoteTarget {
        host: sftp.host.trim().to_string(),
        port: sftp.port,
        username: sftp.username.trim().to_string(),
        credentials,
        remote_path: sftp.remote_path.clone(),
        create_dirs: sftp.create_dirs,
        timeout: Duration::from_secs(sftp.timeout_secs),
    }))
}

/// Run the chosen strategy for the document at `document`.
pub async fn route<L, T>(
    decision: &DeliveryDecision,
    window: &DateWindow,
    document: &Path,
    local: &L,
    transfer: &T,
) -> ExportResult<DeliveryOutcome>
where
    L: LocalCalendar,
    T: RemoteTransfer,
{
    match decision {
        DeliveryDecision::NoOp => {
            tracing::info!(path = %document.display(), "No delivery configured, keeping file");
            Ok(DeliveryOutcome::Kept)
        }
        DeliveryDecision::LocalReplace { calendar } => {
            replace_local(calendar, window, document, local).await
        }
        DeliveryDecision::RemoteTransfer(target) => {
            tracing::info!(host = %target.host, path = %target.remote_path, "Uploading");
            transfer.upload(target, document).await?;
            Ok(DeliveryOutcome::Uploaded {
                host: target.host.clone(),
                remote_path: target.remote_path.clone(),
            })
        }
    }
}

/// Delete the window's events from `calendar`, then import the document.
///
/// A failed delete leaves stale events behind but does not stop the import.
async fn replace_local<L: LocalCalendar>(
    calendar: &str,
    window: &DateWindow,
    document: &Path,
    local: &L,
) -> ExportResult<DeliveryOutcome> {
    tracing::info!(calendar, from = %window.start, to = %window.end, "Removing existing events");
    let stale_events_kept = match local.delete_events(calendar, window).await {
        Ok(true) => false,
        Ok(false) => {
            tracing::warn!(calendar, "Could not delete existing events, importing anyway");
            true
        }
        Err(e) => {
            tracing::warn!(calendar, "Could not delete existing events, importing anyway: {}", e);
            true
        }
    };

    tracing::info!(calendar, path = %document.display(), "Importing");
    match local.import_file(calendar, document).await {
        Ok(true) => Ok(DeliveryOutcome::Imported {
            calendar: calendar.to_string(),
            stale_events_kept,
        }),
        Ok(false) => Err(ExportError::DeliveryTransport(format!(
            "Import into '{calendar}' was rejected"
        ))),
        Err(e) => Err(ExportError::DeliveryTransport(format!(
            "Import into '{calendar}' failed: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLocal, FakeTransfer};
    use chrono::NaiveDate;

    fn window() -> DateWindow {
        DateWindow::around(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(), 30, 30)
    }

    fn config(local_import: &str, sftp_enabled: bool) -> ExportConfig {
        let mut config = ExportConfig::default();
        config.calendar.local_import_calendar = local_import.to_string();
        config.sftp.enabled = sftp_enabled;
        config.sftp.host = "h".to_string();
        config.sftp.username = "u".to_string();
        config.sftp.password = Some("p".to_string());
        config
    }

    async fn run(config: &ExportConfig, local: &FakeLocal, transfer: &FakeTransfer) -> DeliveryOutcome {
        let decision = decide(config).unwrap();
        route(&decision, &window(), Path::new("/tmp/out.ics"), local, transfer)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn local_replace_wins_over_sftp() {
        let (local, transfer) = (FakeLocal::new(), FakeTransfer::new());

        let outcome = run(&config("Home", true), &local, &transfer).await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Imported {
                calendar: "Home".into(),
                stale_events_kept: false
            }
        );
        assert_eq!(local.calls(), vec!["delete Home", "import Home /tmp/out.ics"]);
        assert!(transfer.uploads().is_empty());
    }

    #[tokio::test]
    async fn sftp_when_no_local_import() {
        let (local, transfer) = (FakeLocal::new(), FakeTransfer::new());

        let outcome = run(&config("", true), &local, &transfer).await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Uploaded {
                host: "h".into(),
                remote_path: "/calendar/calendar.ics".into()
            }
        );
        assert_eq!(transfer.uploads(), vec!["u@h:22/calendar/calendar.ics"]);
        assert!(local.calls().is_empty());
    }

    #[tokio::test]
    async fn nothing_configured_is_a_successful_noop() {
        let (local, transfer) = (FakeLocal::new(), FakeTransfer::new());

        let outcome = run(&config("", false), &local, &transfer).await;

        assert_eq!(outcome, DeliveryOutcome::Kept);
        assert!(local.calls().is_empty());
        assert!(transfer.uploads().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_still_imports() {
        let local = FakeLocal::new().delete_fails();
        let transfer = FakeTransfer::new();

        let outcome = run(&config("Home", false), &local, &transfer).await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Imported {
                calendar: "Home".into(),
                stale_events_kept: true
            }
        );
        assert_eq!(local.calls(), vec!["delete Home", "import Home /tmp/out.ics"]);
    }

    #[tokio::test]
    async fn rejected_import_is_a_transport_error() {
        let local = FakeLocal::new().import_rejected();
        let decision = decide(&config("Home", false)).unwrap();

        let err = route(
            &decision,
            &window(),
            Path::new("/tmp/out.ics"),
            &local,
            &FakeTransfer::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::DeliveryTransport(_)));
    }

    #[tokio::test]
    async fn upload_failure_is_returned() {
        let transfer = FakeTransfer::new().failing("connection refused");
        let decision = decide(&config("", true)).unwrap();

        let err = route(
            &decision,
            &window(),
            Path::new("/tmp/out.ics"),
            &FakeLocal::new(),
            &transfer,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::DeliveryTransport(ref msg) if msg == "connection refused"));
    }

    #[test]
    fn sftp_without_credentials_is_a_config_error() {
        let mut config = config("", true);
        config.sftp.password = None;
        assert!(matches!(decide(&config), Err(ExportError::DeliveryConfig(_))));
    }

    #[test]
    fn sftp_without_host_is_a_config_error() {
        let mut config = config("", true);
        config.sftp.host = "  ".to_string();
        assert!(matches!(decide(&config), Err(ExportError::DeliveryConfig(_))));
    }

    #[test]
    fn key_file_is_accepted_without_password() {
        let mut config = config("", true);
        config.sftp.password = None;
        config.sftp.key_file = Some("/keys/id_ed25519".to_string());

        let Ok(DeliveryDecision::RemoteTransfer(target)) = decide(&config) else {
            panic!("expected a remote transfer");
        };
        assert_eq!(
            target.credentials.key_file,
            Some(PathBuf::from("/keys/id_ed25519"))
        );
        assert_eq!(target.timeout, Duration::from_secs(30));
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let credentials = Credentials {
            password: Some("hunter2".into()),
            key_file: None,
            key_passphrase: Some("open sesame".into()),
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("open sesame"));
        assert!(debug.contains("<redacted>"));
    }
}
