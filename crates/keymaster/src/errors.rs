use keymaster_core::{Error, FetchError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Run configuration is unusable")]
    #[diagnostic(
        code(config::invalid),
        help("Check that the config URL is reachable and that the JSON sets keyLocation, keyMappingFile, ftpAddress, ftpUser, ftpPassword and ftpPath")
    )]
    Config {
        #[source]
        source: Error,
    },

    #[error("{} mod(s) have no entry in the mapping file: {}", mods.len(), mods.join(", "))]
    #[diagnostic(
        code(mapping::unmapped_mods),
        help("Add these mods to the mapping file and run again. `keymaster generate-mapping` can build entries from a local mod folder")
    )]
    UnmappedMods { mods: Vec<String> },

    #[error("Failed to download a required document")]
    #[diagnostic(
        code(fetch::failed),
        help("Check the URL in the run configuration and that its server is reachable")
    )]
    Download {
        #[source]
        source: Error,
    },

    #[error("Failed to download a key file")]
    #[diagnostic(
        code(keys::fetch_failed),
        help("Make sure the key exists under keyLocation. Mapping entries must match key file names exactly")
    )]
    KeyDownload {
        #[source]
        source: Error,
    },

    #[error("Could not log in to the FTP server")]
    #[diagnostic(
        code(ftp::connect_failed),
        help("Check ftpAddress (host or host:port), ftpUser and ftpPassword")
    )]
    FtpConnect {
        #[source]
        source: Error,
    },

    #[error("FTP transfer failed")]
    #[diagnostic(
        code(ftp::operation_failed),
        help("The remote key directory may be partially updated. Fix the cause and run sync again")
    )]
    FtpOperation {
        #[source]
        source: Error,
    },

    #[error("Invalid mod directory")]
    #[diagnostic(
        code(generate::invalid_mod_dir),
        help("Pass --inputDir pointing at the folder that contains your @mod folders")
    )]
    ModDir {
        #[source]
        source: Error,
    },

    #[error("Local file operation failed")]
    #[diagnostic(
        code(io::operation_failed),
        help("Check permissions and free space for the staging directory or output file")
    )]
    Io {
        #[source]
        source: Error,
    },

    #[error("Could not create the HTTP client")]
    #[diagnostic(code(fetch::client))]
    HttpClient {
        #[from]
        source: FetchError,
    },
}

impl From<Error> for CliError {
    fn from(error: Error) -> Self {
        match error {
            Error::UnmappedMods { mods } => Self::UnmappedMods { mods },
            source @ (Error::ConfigFetchFailed { .. }
            | Error::ConfigFieldMissing { .. }
            | Error::ConfigInvalid(_)) => Self::Config { source },
            source @ (Error::MappingFetchFailed { .. }
            | Error::MappingInvalid(_)
            | Error::ThirdPartyConfigFetchFailed { .. }
            | Error::ParFetchFailed { .. }
            | Error::ClientOnlyListFetchFailed { .. }) => Self::Download { source },
            source @ Error::KeyFetchFailed { .. } => Self::KeyDownload { source },
            source @ Error::FtpConnectFailed { .. } => Self::FtpConnect { source },
            source @ Error::FtpOperationFailed { .. } => Self::FtpOperation { source },
            source @ Error::InvalidModDir(_) => Self::ModDir { source },
            source @ (Error::Io(_) | Error::Json(_)) => Self::Io { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(error: Error) -> String {
        CliError::from(error)
            .code()
            .map(|code| code.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            code(Error::ConfigFieldMissing { field: "ftpPath" }),
            "config::invalid"
        );
        assert_eq!(
            code(Error::UnmappedMods {
                mods: vec!["@unknownmod".to_string()]
            }),
            "mapping::unmapped_mods"
        );
        assert_eq!(
            code(Error::InvalidModDir("missing".into())),
            "generate::invalid_mod_dir"
        );
    }

    #[test]
    fn test_unmapped_mods_message_lists_every_mod() {
        let error = CliError::from(Error::UnmappedMods {
            mods: vec!["@a".to_string(), "@b".to_string()],
        });
        assert_eq!(
            error.to_string(),
            "2 mod(s) have no entry in the mapping file: @a, @b"
        );
    }

    #[test]
    fn test_missing_field_kept_as_source() {
        let error = CliError::from(Error::ConfigFieldMissing { field: "keyLocation" });
        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(
            source.to_string(),
            "Missing required entry in config file: keyLocation"
        );
    }
}
