//! Remote document retrieval.
//!
//! Everything the pipeline downloads (run config, mapping file, server config, PAR
//! file, client-only list, key files) goes through the [`RemoteSource`] trait. The
//! crate ships [`UrlSource`] for `http(s)://` and `file://` URLs and [`MemorySource`]
//! for running the pipeline against canned documents.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a single document could not be retrieved.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// A `file://` URL could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid UTF-8 text.
    #[error("document is not valid UTF-8")]
    NotText,

    /// The document is not the expected JSON shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No document is registered under the URL (used by [`MemorySource`]).
    #[error("no document at {0}")]
    NotFound(String),
}

/// Retrieves documents by URL.
///
/// Each call is blocking and either returns the complete body or fails; callers do
/// not retry.
pub trait RemoteSource {
    /// Fetch the raw bytes at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch the document at `url` as UTF-8 text.
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        String::from_utf8(self.fetch(url)?).map_err(|_| FetchError::NotText)
    }
}

/// Blocking `reqwest` client that also understands `file://` URLs.
pub struct UrlSource {
    client: reqwest::blocking::Client,
}

impl UrlSource {
    /// Create a source with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a source whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("keymaster/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl RemoteSource for UrlSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(path) = url.strip_prefix("file://") {
            let path = urlencoding::decode(path).map_err(|_| FetchError::NotText)?;
            tracing::debug!("Reading local document {}", path);
            return Ok(std::fs::read(&*path)?);
        }

        tracing::debug!("GET {}", url);
        let resp = self.client.get(url).send()?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.bytes()?.to_vec())
    }
}

/// In-memory source mapping URLs to fixed documents.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` under `url`, replacing any previous document.
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.documents.insert(url.into(), body.into());
    }
}

impl RemoteSource for MemorySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

/// Build the key store URL for `key_name`.
///
/// The file name is percent-encoded; a trailing `/` on the base is not doubled.
pub fn key_url(key_location: &str, key_name: &str) -> String {
    format!(
        "{}/{}",
        key_location.trim_end_matches('/'),
        urlencoding::encode(key_name)
    )
}
