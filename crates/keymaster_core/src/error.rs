//! Error types for key synchronization.
//!
//! Every stage of a run maps its failure onto one [`Error`] variant. All of them are
//! fatal: the pipeline stops at the first error and never retries. Collaborator
//! failures ([`FetchError`], [`PublishError`]) are kept as the error source so the
//! full chain can be reported.

use crate::publish::PublishError;
use crate::source::FetchError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum Error {
    /// The run configuration could not be downloaded.
    #[error("Failed to fetch run configuration from {url}")]
    ConfigFetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A required entry is absent from the run configuration.
    #[error("Missing required entry in config file: {field}")]
    ConfigFieldMissing { field: &'static str },

    /// The run configuration is not a JSON object of the expected shape.
    #[error("Invalid run configuration: {0}")]
    ConfigInvalid(#[source] serde_json::Error),

    /// The mod-to-key mapping file could not be downloaded.
    #[error("Failed to fetch mapping file from {url}")]
    MappingFetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The mapping file is not a JSON object of string arrays.
    #[error("Invalid mapping file: {0}")]
    MappingInvalid(#[source] serde_json::Error),

    /// The third-party server configuration could not be downloaded.
    #[error("Failed to fetch server configuration from {url}")]
    ThirdPartyConfigFetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The PAR file source could not be downloaded.
    #[error("Failed to fetch PAR file from {url}")]
    ParFetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The client-only mod list could not be downloaded or parsed.
    #[error("Failed to fetch client-only mod list from {url}")]
    ClientOnlyListFetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// One or more mods have no entry in the mapping file.
    #[error("Unable to find keys for {} mod(s) in the mapping file: {}", mods.len(), mods.join(", "))]
    UnmappedMods { mods: Vec<String> },

    /// A key file could not be downloaded from the key store.
    #[error("Failed to fetch key '{key}' from {url}")]
    KeyFetchFailed {
        key: String,
        url: String,
        #[source]
        source: FetchError,
    },

    /// Connecting or logging in to the FTP server failed.
    #[error("Failed to connect to FTP server {address}")]
    FtpConnectFailed {
        address: String,
        #[source]
        source: PublishError,
    },

    /// An FTP command failed after the session was established.
    #[error("FTP operation failed: {operation}")]
    FtpOperationFailed {
        operation: String,
        #[source]
        source: PublishError,
    },

    /// The mod directory given to the mapping generator is unusable.
    #[error("Invalid mod directory: {0}")]
    InvalidModDir(Utf8PathBuf),

    /// Local filesystem I/O failed (staging directory, mapping output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize JSON output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn ftp(operation: impl Into<String>, source: PublishError) -> Self {
        Self::FtpOperationFailed {
            operation: operation.into(),
            source,
        }
    }
}
