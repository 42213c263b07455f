//! FTP publishing collaborators.
//!
//! The pipeline opens exactly one session per run through an [`FtpConnector`] and
//! drives it through the [`FtpSession`] commands it needs: change directory, list,
//! delete, store. [`SuppaFtpConnector`] talks to a real server; [`MemoryFtp`] keeps
//! a fake directory tree for tests and dry inspection.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::{Arc, Mutex};

use camino::Utf8Path;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use thiserror::Error;

/// Port used when the configured FTP address has none.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Failure of a single FTP command.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Error reported by the FTP client.
    #[error("{0}")]
    Ftp(#[from] suppaftp::FtpError),

    /// Reading the local file to upload failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server refused the command.
    #[error("{0}")]
    Rejected(String),
}

/// An authenticated FTP session.
pub trait FtpSession {
    /// Change the working directory (`CWD`).
    fn change_dir(&mut self, path: &str) -> Result<(), PublishError>;

    /// Names of the entries in the working directory (`NLST`).
    fn list(&mut self) -> Result<Vec<String>, PublishError>;

    /// Delete a file in the working directory (`DELE`).
    fn delete(&mut self, name: &str) -> Result<(), PublishError>;

    /// Store `data` as `name` in the working directory (binary `STOR`).
    fn upload(&mut self, name: &str, data: &mut dyn Read) -> Result<(), PublishError>;

    /// Close the session (`QUIT`).
    fn quit(&mut self) -> Result<(), PublishError>;
}

/// Opens authenticated FTP sessions.
pub trait FtpConnector {
    fn connect(
        &self,
        address: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn FtpSession>, PublishError>;
}

/// Plain FTP via `suppaftp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuppaFtpConnector;

impl FtpConnector for SuppaFtpConnector {
    fn connect(
        &self,
        address: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn FtpSession>, PublishError> {
        let address = with_default_port(address);
        tracing::debug!("Connecting to {}", address);
        let mut stream = FtpStream::connect(address.as_str())?;
        stream.login(user, password)?;
        stream.transfer_type(FileType::Binary)?;
        Ok(Box::new(SuppaFtpSession { stream }))
    }
}

struct SuppaFtpSession {
    stream: FtpStream,
}

impl FtpSession for SuppaFtpSession {
    fn change_dir(&mut self, path: &str) -> Result<(), PublishError> {
        Ok(self.stream.cwd(path)?)
    }

    fn list(&mut self) -> Result<Vec<String>, PublishError> {
        Ok(self.stream.nlst(None)?)
    }

    fn delete(&mut self, name: &str) -> Result<(), PublishError> {
        Ok(self.stream.rm(name)?)
    }

    fn upload(&mut self, name: &str, mut data: &mut dyn Read) -> Result<(), PublishError> {
        self.stream.put_file(name, &mut data)?;
        Ok(())
    }

    fn quit(&mut self) -> Result<(), PublishError> {
        Ok(self.stream.quit()?)
    }
}

/// Append the default FTP port unless `address` already names one.
///
/// Bare IPv6 addresses are bracketed so the result parses as a socket address.
pub fn with_default_port(address: &str) -> String {
    if let Some(rest) = address.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, "")) => format!("{}:{}", address, DEFAULT_FTP_PORT),
            _ => address.to_string(),
        };
    }
    if address.matches(':').count() > 1 {
        return format!("[{}]:{}", address, DEFAULT_FTP_PORT);
    }
    let has_port = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if has_port {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_FTP_PORT)
    }
}

/// Split a remote file path into its directory and file name.
///
/// The directory is empty when the path has no directory component.
pub fn split_remote_path(path: &str) -> (&str, &str) {
    let remote = Utf8Path::new(path);
    let dir = remote.parent().map(Utf8Path::as_str).unwrap_or("");
    let name = remote.file_name().unwrap_or(path);
    (dir, name)
}

/// Shared state behind [`MemoryFtp`].
#[derive(Debug, Default)]
pub struct MemoryFtpState {
    /// Files per directory.
    pub dirs: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    /// Every command issued, in order (e.g. `CWD /keys`, `DELE old.bikey`).
    pub commands: Vec<String>,
    /// Number of sessions opened.
    pub connections: usize,
    /// Set when `QUIT` was sent by the last session.
    pub closed: bool,
    /// Uploads whose name is listed here are rejected.
    pub reject_uploads: BTreeSet<String>,
}

/// In-memory FTP server.
///
/// Clones share the same state, so a test can keep one handle and inspect what the
/// pipeline did through the other.
#[derive(Debug, Default, Clone)]
pub struct MemoryFtp {
    state: Arc<Mutex<MemoryFtpState>>,
    credentials: Option<(String, String)>,
}

impl MemoryFtp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept logins with these credentials.
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Seed a file on the fake server.
    pub fn with_file(self, dir: &str, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.lock()
            .dirs
            .entry(dir.to_string())
            .or_default()
            .insert(name.to_string(), data.into());
        self
    }

    /// Seed an empty directory on the fake server.
    pub fn with_dir(self, dir: &str) -> Self {
        self.lock().dirs.entry(dir.to_string()).or_default();
        self
    }

    /// Reject any upload of `name`.
    pub fn rejecting_upload(self, name: &str) -> Self {
        self.lock().reject_uploads.insert(name.to_string());
        self
    }

    /// Names of the files currently stored in `dir`.
    pub fn files(&self, dir: &str) -> Vec<String> {
        self.lock()
            .dirs
            .get(dir)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content of `dir/name`, if present.
    pub fn file(&self, dir: &str, name: &str) -> Option<Vec<u8>> {
        self.lock()
            .dirs
            .get(dir)
            .and_then(|files| files.get(name).cloned())
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    pub fn closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryFtpState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FtpConnector for MemoryFtp {
    fn connect(
        &self,
        _address: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn FtpSession>, PublishError> {
        if let Some((expected_user, expected_password)) = &self.credentials {
            if expected_user != user || expected_password != password {
                return Err(PublishError::Rejected("530 Login incorrect".to_string()));
            }
        }

        let mut state = self.lock();
        state.connections += 1;
        state.closed = false;
        drop(state);

        Ok(Box::new(MemoryFtpSession {
            server: self.clone(),
            cwd: "/".to_string(),
        }))
    }
}

struct MemoryFtpSession {
    server: MemoryFtp,
    cwd: String,
}

impl MemoryFtpSession {
    fn resolve(&self, path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        if path.starts_with('/') {
            if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            }
        } else if self.cwd == "/" {
            format!("/{}", trimmed)
        } else {
            format!("{}/{}", self.cwd, trimmed)
        }
    }
}

impl FtpSession for MemoryFtpSession {
    fn change_dir(&mut self, path: &str) -> Result<(), PublishError> {
        let target = self.resolve(path);
        let mut state = self.server.lock();
        state.commands.push(format!("CWD {}", path));
        if target != "/" && !state.dirs.contains_key(&target) {
            return Err(PublishError::Rejected(format!(
                "550 {}: No such directory",
                path
            )));
        }
        self.cwd = target;
        Ok(())
    }

    fn list(&mut self) -> Result<Vec<String>, PublishError> {
        let mut state = self.server.lock();
        state.commands.push("NLST".to_string());
        Ok(state
            .dirs
            .get(&self.cwd)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&mut self, name: &str) -> Result<(), PublishError> {
        let mut state = self.server.lock();
        state.commands.push(format!("DELE {}", name));
        let removed = state
            .dirs
            .get_mut(&self.cwd)
            .and_then(|files| files.remove(name));
        match removed {
            Some(_) => Ok(()),
            None => Err(PublishError::Rejected(format!(
                "550 {}: No such file",
                name
            ))),
        }
    }

    fn upload(&mut self, name: &str, data: &mut dyn Read) -> Result<(), PublishError> {
        let mut buffer = Vec::new();
        data.read_to_end(&mut buffer)?;

        let mut state = self.server.lock();
        state.commands.push(format!("STOR {}", name));
        if state.reject_uploads.contains(name) {
            return Err(PublishError::Rejected(format!(
                "553 {}: Permission denied",
                name
            )));
        }
        state
            .dirs
            .entry(self.cwd.clone())
            .or_default()
            .insert(name.to_string(), buffer);
        Ok(())
    }

    fn quit(&mut self) -> Result<(), PublishError> {
        let mut state = self.server.lock();
        state.commands.push("QUIT".to_string());
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_default_port() {
        assert_eq!(with_default_port("ftp.example.com"), "ftp.example.com:21");
        assert_eq!(
            with_default_port("ftp.example.com:2121"),
            "ftp.example.com:2121"
        );
        assert_eq!(with_default_port("10.0.0.5"), "10.0.0.5:21");
    }

    #[test]
    fn test_with_default_port_ipv6() {
        assert_eq!(with_default_port("::1"), "[::1]:21");
        assert_eq!(with_default_port("2001:db8::1"), "[2001:db8::1]:21");
        assert_eq!(with_default_port("[::1]"), "[::1]:21");
        assert_eq!(with_default_port("[::1]:2121"), "[::1]:2121");
        assert!(with_default_port("2001:db8::1")
            .parse::<std::net::SocketAddr>()
            .is_ok());
    }

    #[test]
    fn test_split_remote_path() {
        assert_eq!(
            split_remote_path("/arma3/server.par"),
            ("/arma3", "server.par")
        );
        assert_eq!(split_remote_path("server.par"), ("", "server.par"));
    }

    #[test]
    fn test_memory_ftp_round_trip() {
        let ftp = MemoryFtp::new().with_file("/keys", "old.bikey", "old");
        let mut session = ftp.connect("host", "user", "pw").unwrap();

        session.change_dir("/keys").unwrap();
        assert_eq!(session.list().unwrap(), vec!["old.bikey".to_string()]);
        session.delete("old.bikey").unwrap();
        session.upload("new.bikey", &mut "new".as_bytes()).unwrap();
        session.quit().unwrap();

        assert_eq!(ftp.files("/keys"), vec!["new.bikey".to_string()]);
        assert!(ftp.closed());
        assert_eq!(
            ftp.commands(),
            vec!["CWD /keys", "NLST", "DELE old.bikey", "STOR new.bikey", "QUIT"]
        );
    }

    #[test]
    fn test_memory_ftp_rejects_bad_login() {
        let ftp = MemoryFtp::new().with_credentials("admin", "secret");
        assert!(ftp.connect("host", "admin", "wrong").is_err());
        assert!(ftp.connect("host", "admin", "secret").is_ok());
    }

    #[test]
    fn test_memory_ftp_relative_dirs() {
        let ftp = MemoryFtp::new()
            .with_file("/arma3", "server.par", "par")
            .with_file("/arma3/keys", "a.bikey", "a");
        let mut session = ftp.connect("host", "u", "p").unwrap();

        session.change_dir("/arma3").unwrap();
        session.change_dir("keys").unwrap();
        assert_eq!(session.list().unwrap(), vec!["a.bikey".to_string()]);
        assert!(session.change_dir("missing").is_err());
    }
}
