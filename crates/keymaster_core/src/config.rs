//! Run configuration.
//!
//! The run configuration is a JSON object fetched once at the start of a run. Its
//! optional entries switch pipeline capabilities on or off:
//!
//! ```json
//! {
//!   "keyLocation": "http://example.com/keys",
//!   "keyMappingFile": "http://example.com/mapping.json",
//!   "ftpAddress": "ftp.example.com",
//!   "ftpUser": "arma",
//!   "ftpPassword": "secret",
//!   "ftpPath": "/arma3/keys",
//!   "playWithSixServerConfigUrl": "http://example.com/server.yml",
//!   "manualMods": ["@extra"],
//!   "manualKeys": ["a3.bikey"],
//!   "blacklistKeys": ["broken.bikey"],
//!   "parFileSource": "http://example.com/server.par",
//!   "parFileFtpPath": "/arma3/server.par",
//!   "parFileGenerateModParameter": "true",
//!   "parFileClientOnlyModList": "http://example.com/client_only.json"
//! }
//! ```

use crate::error::{Error, Result};
use crate::source::RemoteSource;
use serde::Deserialize;

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub key_location: String,
    pub key_mapping_file: String,
    pub ftp: FtpTarget,
    pub server_config_url: Option<String>,
    pub manual_mods: Option<Vec<String>>,
    pub manual_keys: Option<Vec<String>>,
    pub blacklisted_keys: Vec<String>,
    pub par: Option<ParOptions>,
}

/// Where and as whom to publish keys.
#[derive(Clone, PartialEq, Eq)]
pub struct FtpTarget {
    pub address: String,
    pub user: String,
    pub password: String,
    pub path: String,
}

impl std::fmt::Debug for FtpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpTarget")
            .field("address", &self.address)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("path", &self.path)
            .finish()
    }
}

/// PAR file replacement, present only when both a source and a remote path are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParOptions {
    pub source: String,
    pub ftp_path: String,
    pub generate_mod_parameter: bool,
    pub client_only_mod_list: Option<String>,
}

/// The configuration exactly as written, before required entries are checked.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRunConfig {
    key_location: Option<String>,
    key_mapping_file: Option<String>,
    ftp_address: Option<String>,
    ftp_user: Option<String>,
    ftp_password: Option<String>,
    ftp_path: Option<String>,
    play_with_six_server_config_url: Option<String>,
    manual_mods: Option<Vec<String>>,
    manual_keys: Option<Vec<String>>,
    blacklist_keys: Option<Vec<String>>,
    par_file_source: Option<String>,
    par_file_ftp_path: Option<String>,
    par_file_generate_mod_parameter: Option<Flag>,
    par_file_client_only_mod_list: Option<String>,
}

/// A boolean switch written either as a string (`"true"`, any case) or as a JSON bool.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn enabled(&self) -> bool {
        match self {
            Flag::Bool(value) => *value,
            Flag::Text(text) => text.eq_ignore_ascii_case("true"),
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value.ok_or(Error::ConfigFieldMissing { field })
}

impl RunConfig {
    /// Parse and validate a run configuration document.
    ///
    /// Required entries are checked in a fixed order and the first missing one is
    /// reported by name.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: RawRunConfig = serde_json::from_slice(data).map_err(Error::ConfigInvalid)?;

        let key_location = required(raw.key_location, "keyLocation")?;
        let key_mapping_file = required(raw.key_mapping_file, "keyMappingFile")?;
        let ftp = FtpTarget {
            address: required(raw.ftp_address, "ftpAddress")?,
            user: required(raw.ftp_user, "ftpUser")?,
            password: required(raw.ftp_password, "ftpPassword")?,
            path: required(raw.ftp_path, "ftpPath")?,
        };

        let par = match (raw.par_file_source, raw.par_file_ftp_path) {
            (Some(source), Some(ftp_path)) => Some(ParOptions {
                source,
                ftp_path,
                generate_mod_parameter: raw
                    .par_file_generate_mod_parameter
                    .as_ref()
                    .is_some_and(Flag::enabled),
                client_only_mod_list: raw.par_file_client_only_mod_list,
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "PAR replacement needs both parFileSource and parFileFtpPath, skipping"
                );
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            key_location,
            key_mapping_file,
            ftp,
            server_config_url: raw.play_with_six_server_config_url,
            manual_mods: raw.manual_mods,
            manual_keys: raw.manual_keys,
            blacklisted_keys: raw.blacklist_keys.unwrap_or_default(),
            par,
        })
    }

    /// Download and validate the run configuration at `url`.
    pub fn fetch(source: &dyn RemoteSource, url: &str) -> Result<Self> {
        let data = source.fetch(url).map_err(|source| Error::ConfigFetchFailed {
            url: url.to_string(),
            source,
        })?;
        Self::from_json(&data)
    }
}
