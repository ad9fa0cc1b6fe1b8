//! SFTP upload.
//!
//! ssh2 is blocking, so each upload runs on tokio's blocking pool and is
//! awaited right away. The SSH session lives in a guard that disconnects on
//! drop, error paths included.

use std::fs::File;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};

use ssh2::{Session, Sftp};

use crate::delivery::{RemoteTarget, RemoteTransfer};
use crate::error::{ExportError, ExportResult};

const DIR_MODE: i32 = 0o755;

#[derive(Debug, Clone, Copy, Default)]
pub struct SftpUploader;

impl SftpUploader {
    pub fn new() -> Self {
        SftpUploader
    }
}

impl RemoteTransfer for SftpUploader {
    async fn upload(&self, target: &RemoteTarget, local: &Path) -> ExportResult<()> {
        if !local.is_file() {
            return Err(ExportError::DeliveryTransport(format!(
                "Local file not found: {}",
                local.display()
            )));
        }

        let target = target.clone();
        let local = local.to_path_buf();
        tokio::task::spawn_blocking(move || upload_blocking(&target, &local))
            .await
            .map_err(|e| ExportError::DeliveryTransport(format!("Upload task failed: {e}")))?
    }
}

/// Open session, closed when dropped.
struct SftpSession {
    session: Session,
    sftp: Option<Sftp>,
}

impl SftpSession {
    fn open(target: &RemoteTarget) -> ExportResult<Self> {
        let tcp = connect(target)?;

        // Guard first, so a failed handshake or login still disconnects
        let mut guard = SftpSession {
            session: Session::new().map_err(transport)?,
            sftp: None,
        };
        let session = &mut guard.session;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(target.timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().map_err(transport)?;

        authenticate(session, target)?;

        let sftp = session.sftp().map_err(transport)?;
        guard.sftp = Some(sftp);
        tracing::info!(host = %target.host, "SFTP connection established");

        Ok(guard)
    }

    fn sftp(&self) -> ExportResult<&Sftp> {
        self.sftp
            .as_ref()
            .ok_or_else(|| ExportError::DeliveryTransport("SFTP channel closed".into()))
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        // The channel has to go before the session it runs on
        self.sftp.take();
        if let Err(e) = self.session.disconnect(None, "calexport done", None) {
            tracing::debug!("SFTP disconnect failed: {}", e);
        }
        tracing::debug!("SFTP connection closed");
    }
}

fn upload_blocking(target: &RemoteTarget, local: &Path) -> ExportResult<()> {
    let session = SftpSession::open(target)?;
    let sftp = session.sftp()?;
    let remote = Path::new(&target.remote_path);

    if target.create_dirs
        && let Some(parent) = remote.parent()
    {
        create_dir_all(sftp, parent)?;
    }

    let mut source = File::open(local)?;
    let mut dest = sftp.create(remote).map_err(transport)?;
    let bytes = std::io::copy(&mut source, &mut dest)
        .map_err(|e| ExportError::DeliveryTransport(format!("Upload failed: {e}")))?;

    tracing::info!(
        host = %target.host,
        path = %target.remote_path,
        bytes,
        "Uploaded calendar"
    );
    Ok(())
}

fn connect(target: &RemoteTarget) -> ExportResult<TcpStream> {
    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| {
            ExportError::DeliveryTransport(format!("Cannot resolve {}: {}", target.host, e))
        })?
        .collect();

    let mut last_error = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, target.timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(ExportError::DeliveryTransport(match last_error {
        Some(e) => format!("Cannot connect to {}:{}: {}", target.host, target.port, e),
        None => format!("No address for {}", target.host),
    }))
}

/// Key file first (when it exists on disk), then password.
fn authenticate(session: &Session, target: &RemoteTarget) -> ExportResult<()> {
    let credentials = &target.credentials;

    if let Some(key) = credentials.key_file.as_deref() {
        if key.is_file() {
            match session.userauth_pubkey_file(
                &target.username,
                None,
                key,
                credentials.key_passphrase.as_deref(),
            ) {
                Ok(()) if session.authenticated() => return Ok(()),
                Ok(()) => tracing::warn!("Key authentication did not complete"),
                Err(e) => tracing::warn!(key = %key.display(), "Key authentication failed: {}", e),
            }
        } else {
            tracing::warn!(key = %key.display(), "Key file not found");
        }
    }

    let Some(password) = credentials.password.as_deref() else {
        return Err(ExportError::DeliveryConfig(
            "No usable key file and no password for SFTP".into(),
        ));
    };

    session
        .userauth_password(&target.username, password)
        .map_err(|e| ExportError::DeliveryTransport(format!("Authentication failed: {e}")))?;

    if session.authenticated() {
        Ok(())
    } else {
        Err(ExportError::DeliveryTransport("Authentication failed".into()))
    }
}

fn create_dir_all(sftp: &Sftp, dir: &Path) -> ExportResult<()> {
    for path in ancestors_to_create(dir) {
        if sftp.stat(&path).is_ok() {
            continue;
        }
        tracing::debug!(dir = %path.display(), "Creating remote directory");
        sftp.mkdir(&path, DIR_MODE).map_err(|e| {
            ExportError::DeliveryTransport(format!("Cannot create {}: {}", path.display(), e))
        })?;
    }
    Ok(())
}

/// Every directory from the top down to `dir`, excluding the root.
fn ancestors_to_create(dir: &Path) -> Vec<PathBuf> {
    let mut current = PathBuf::new();
    let mut dirs = Vec::new();
    for component in dir.components() {
        current.push(component);
        if matches!(component, Component::Normal(_)) {
            dirs.push(current.clone());
        }
    }
    dirs
}

fn transport(e: ssh2::Error) -> ExportError {
    ExportError::DeliveryTransport(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::Credentials;
    use std::net::TcpListener;
    use std::time::Duration;

    fn target(port: u16) -> RemoteTarget {
        RemoteTarget {
            host: "127.0.0.1".to_string(),
            port,
            username: "u".to_string(),
            credentials: Credentials {
                password: Some("p".to_string()),
                ..Credentials::default()
            },
            remote_path: "/calendar/calendar.ics".to_string(),
            create_dirs: true,
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn directories_are_created_top_down() {
        assert_eq!(
            ancestors_to_create(Path::new("/srv/www/calendar")),
            vec![
                PathBuf::from("/srv"),
                PathBuf::from("/srv/www"),
                PathBuf::from("/srv/www/calendar"),
            ]
        );
        assert!(ancestors_to_create(Path::new("/")).is_empty());
        assert_eq!(
            ancestors_to_create(Path::new("uploads")),
            vec![PathBuf::from("uploads")]
        );
    }

    #[tokio::test]
    async fn missing_local_file_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let err = SftpUploader::new()
            .upload(&target(22), &dir.path().join("missing.ics"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::DeliveryTransport(ref msg) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("calendar.ics");
        std::fs::write(&file, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").unwrap();

        let err = SftpUploader::new()
            .upload(&target(port), &file)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::DeliveryTransport(ref msg) if msg.contains("Cannot connect")));
    }
}
