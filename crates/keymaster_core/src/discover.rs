//! Read-only discovery of a server's mods and remote key directory.

use crate::error::{Error, Result};
use crate::events::{StageOutcome, SyncEvent, SyncStage};
use crate::mods::{parse_server_config, ModSet};
use crate::publish::FtpConnector;
use crate::source::RemoteSource;
use camino::Utf8Path;

/// Where to look.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub server_config_url: String,
    pub ftp_address: String,
    pub ftp_user: String,
    pub ftp_password: String,
    pub ftp_dir: String,
}

/// A file present in the remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: String,
    pub is_key: bool,
}

/// What discovery found.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub server_name: Option<String>,
    pub mods: ModSet,
    pub remote_files: Vec<RemoteFile>,
}

impl DiscoveryReport {
    /// Remote files that look like key files.
    pub fn remote_keys(&self) -> impl Iterator<Item = &str> {
        self.remote_files
            .iter()
            .filter(|file| file.is_key)
            .map(|file| file.name.as_str())
    }
}

fn looks_like_key(name: &str) -> bool {
    Utf8Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bikey"))
}

/// Read the server config and list the remote directory. Never modifies the server.
///
/// Progress is reported to `on_event` with the same stages a sync run uses.
pub fn discover(
    source: &dyn RemoteSource,
    connector: &dyn FtpConnector,
    request: &DiscoveryRequest,
    on_event: &dyn Fn(&SyncEvent),
) -> Result<DiscoveryReport> {
    let emit = |stage: SyncStage, outcome: StageOutcome, detail: String| {
        let event = SyncEvent::new(stage, outcome, detail);
        event.trace();
        on_event(&event);
    };
    let failed =
        |stage: SyncStage, err: &Error| emit(stage, StageOutcome::Failed, err.to_string());

    emit(
        SyncStage::DownloadingServerConfig,
        StageOutcome::Started,
        request.server_config_url.clone(),
    );
    let text = source
        .fetch_text(&request.server_config_url)
        .map_err(|source| Error::ThirdPartyConfigFetchFailed {
            url: request.server_config_url.clone(),
            source,
        })
        .inspect_err(|e| failed(SyncStage::DownloadingServerConfig, e))?;
    let server_config = parse_server_config(&text);
    emit(
        SyncStage::DownloadingServerConfig,
        StageOutcome::Completed,
        format!(
            "server '{}' requires {} mod(s)",
            server_config.name.as_deref().unwrap_or("<unnamed>"),
            server_config.mods.len()
        ),
    );

    emit(
        SyncStage::ConnectingToFtp,
        StageOutcome::Started,
        request.ftp_address.clone(),
    );
    let mut session = connector
        .connect(
            &request.ftp_address,
            &request.ftp_user,
            &request.ftp_password,
        )
        .map_err(|source| Error::FtpConnectFailed {
            address: request.ftp_address.clone(),
            source,
        })
        .inspect_err(|e| failed(SyncStage::ConnectingToFtp, e))?;
    emit(
        SyncStage::ConnectingToFtp,
        StageOutcome::Completed,
        format!("logged in as {}", request.ftp_user),
    );

    emit(
        SyncStage::ListingRemoteFiles,
        StageOutcome::Started,
        request.ftp_dir.clone(),
    );
    let listing = session
        .change_dir(&request.ftp_dir)
        .map_err(|e| Error::ftp(format!("CWD {}", request.ftp_dir), e))
        .and_then(|()| session.list().map_err(|e| Error::ftp("NLST", e)));

    if let Err(e) = session.quit() {
        tracing::warn!("Failed to close FTP session cleanly: {}", e);
    }

    let mut names = listing.inspect_err(|e| failed(SyncStage::ListingRemoteFiles, e))?;
    names.sort();
    emit(
        SyncStage::ListingRemoteFiles,
        StageOutcome::Completed,
        format!("{} file(s) in {}", names.len(), request.ftp_dir),
    );

    Ok(DiscoveryReport {
        server_name: server_config.name,
        mods: server_config.mods,
        remote_files: names
            .into_iter()
            .map(|name| RemoteFile {
                is_key: looks_like_key(&name),
                name,
            })
            .collect(),
    })
}
