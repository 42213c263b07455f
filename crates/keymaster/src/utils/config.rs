//! Local settings stored next to the executable.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;

/// Settings read from `keymaster.toml`. Command line flags take precedence.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory keys are downloaded into before upload.
    pub staging_dir: Option<String>,
    /// Timeout for a single HTTP request, in seconds.
    pub http_timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default settings file path (keymaster.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("keymaster.toml"))
}

/// Parses settings, falling back to defaults for an unreadable file.
pub fn parse_config(content: &str) -> AppConfig {
    match toml::from_str(content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Ignoring invalid keymaster.toml: {}", e);
            AppConfig::default()
        }
    }
}

/// Loads the settings from keymaster.toml.
/// Returns default settings if the file doesn't exist or cannot be read.
pub fn load_config() -> AppConfig {
    if let Some(path) = default_config_path() {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(&path) {
                return parse_config(&content);
            }
        }
    }
    AppConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let cfg = parse_config("staging_dir = \"/var/keymaster\"\nhttp_timeout_secs = 10\n");
        assert_eq!(cfg.staging_dir.as_deref(), Some("/var/keymaster"));
        assert_eq!(cfg.http_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_parse_partial_and_invalid_config() {
        assert_eq!(parse_config("http_timeout_secs = 5").staging_dir, None);
        assert_eq!(parse_config("staging_dir = 5"), AppConfig::default());
        assert_eq!(parse_config(""), AppConfig::default());
    }
}
