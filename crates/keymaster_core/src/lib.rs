//! Mod key synchronization for game servers.
//!
//! Given a run configuration, this crate works out which mods a server needs, which
//! key files those mods require, and publishes exactly that set of keys to the
//! server's key directory over FTP. It supports:
//!
//! - **Mod resolution**: Merge a third-party server config with manually listed mods
//! - **Key resolution**: Map mods to keys, reporting every unmapped mod at once
//! - **PAR patching**: Replace the server's `-mod=` launch argument with a generated one
//! - **Mapping generation**: Build a mapping file from a local mod directory
//! - **Discovery**: Inspect a server config and remote key directory without changes
//!
//! # Example
//!
//! ```no_run
//! use keymaster_core::{RunConfig, SuppaFtpConnector, SyncPipeline, UrlSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = UrlSource::new()?;
//! let config = RunConfig::fetch(&source, "https://example.com/keymaster.json")?;
//!
//! let pipeline = SyncPipeline::new(Box::new(source), Box::new(SuppaFtpConnector))
//!     .with_events(|event| println!("{}: {}", event.stage, event.detail));
//!
//! let report = pipeline.run(&config)?;
//! println!("Uploaded {} keys", report.uploaded_keys.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discover;
pub mod error;
pub mod events;
pub mod generate;
pub mod keys;
pub mod mapping;
pub mod mods;
pub mod par;
pub mod pipeline;
pub mod publish;
pub mod source;

// Re-export main types
pub use config::{FtpTarget, ParOptions, RunConfig};
pub use discover::{discover, DiscoveryReport, DiscoveryRequest, RemoteFile};
pub use error::{Error, Result};
pub use events::{StageOutcome, SyncEvent, SyncStage};
pub use generate::{generate_mapping, scan_mod_dir, GeneratedMapping};
pub use keys::{resolve_keys, KeyResolution, RequiredKeys, MANUAL_REQUESTER};
pub use mapping::ModMapping;
pub use mods::{parse_server_config, resolve_mods, ModSet, ServerConfig};
pub use par::{patch_par, ParModPlan};
pub use pipeline::{PlannedPar, SyncPipeline, SyncPlan, SyncReport, DEFAULT_STAGING_DIR};
pub use publish::{FtpConnector, FtpSession, MemoryFtp, PublishError, SuppaFtpConnector};
pub use source::{FetchError, MemorySource, RemoteSource, UrlSource};
