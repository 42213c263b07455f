//! Key synchronization pipeline.
//!
//! The [`SyncPipeline`] runs one synchronization from a validated [`RunConfig`]:
//!
//! 1. Download the mapping file and (if configured) the third-party server config.
//! 2. Merge server config mods and manual mods into one [`ModSet`].
//! 3. Resolve every mod to its keys. Any unmapped mod aborts the run here, before
//!    anything is downloaded into staging or touched on the FTP server.
//! 4. Drop blacklisted keys.
//! 5. If a PAR file is configured, download it and, when asked to, patch in a
//!    generated `-mod=` launch argument.
//! 6. Download each key into the staging directory.
//! 7. Open one FTP session: delete every file in the key directory, upload the
//!    staged keys, then replace the PAR file. The session is closed on every path.
//!
//! Steps 1–5 form the [`SyncPlan`], which [`SyncPipeline::plan`] returns on its own
//! for dry runs. Optional config entries switch steps on and off; there is a single
//! code path for every combination.

use crate::config::{ParOptions, RunConfig};
use crate::error::{Error, Result};
use crate::events::{StageOutcome, SyncEvent, SyncStage};
use crate::keys::{resolve_keys, RequiredKeys};
use crate::mapping::ModMapping;
use crate::mods::{parse_server_config, resolve_mods, ModSet};
use crate::par::{fetch_client_only_mods, partition_mods, patch_par};
use crate::publish::{split_remote_path, FtpConnector, FtpSession};
use crate::source::{key_url, RemoteSource};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::sync::Arc;

/// Staging directory used when none is configured.
pub const DEFAULT_STAGING_DIR: &str = "tmp";

type EventCallback = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Everything a run decided before touching the key store or the FTP server.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Name declared by the server config, if one was read.
    pub server_name: Option<String>,
    pub mods: ModSet,
    pub keys: RequiredKeys,
    /// Keys that were resolved but dropped by `blacklistKeys`.
    pub blacklisted: Vec<String>,
    pub par: Option<PlannedPar>,
}

/// The PAR file that will replace the remote one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPar {
    /// Remote path of the PAR file.
    pub ftp_path: String,
    /// Content to upload, patched if a launch argument was generated.
    pub content: String,
    /// Mods placed in the generated launch argument, `None` when not patched.
    pub server_startup: Option<ModSet>,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub plan: SyncPlan,
    /// Local paths of the downloaded keys.
    pub staged_keys: Vec<Utf8PathBuf>,
    /// Files deleted from the remote key directory.
    pub removed_files: Vec<String>,
    /// Keys uploaded to the remote key directory.
    pub uploaded_keys: Vec<String>,
    pub par_replaced: bool,
}

#[derive(Debug, Default)]
struct PublishOutcome {
    removed_files: Vec<String>,
    uploaded_keys: Vec<String>,
    par_replaced: bool,
}

/// Runs key synchronizations against a remote source and an FTP server.
///
/// Create one with [`new`](Self::new), optionally set the staging directory and an
/// event callback, then call [`run`](Self::run) (or [`plan`](Self::plan) for a dry
/// run). The pipeline holds no per-run state and can run several configs in turn.
pub struct SyncPipeline {
    source: Box<dyn RemoteSource>,
    connector: Box<dyn FtpConnector>,
    staging_dir: Utf8PathBuf,
    event_callback: Option<EventCallback>,
}

impl SyncPipeline {
    pub fn new(source: Box<dyn RemoteSource>, connector: Box<dyn FtpConnector>) -> Self {
        Self {
            source,
            connector,
            staging_dir: Utf8PathBuf::from(DEFAULT_STAGING_DIR),
            event_callback: None,
        }
    }

    /// Download keys into `dir` instead of `./tmp`. Created on first use.
    pub fn with_staging_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Register a callback receiving every [`SyncEvent`] of a run.
    pub fn with_events<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Arc::new(callback));
        self
    }

    /// Run a full synchronization.
    pub fn run(&self, config: &RunConfig) -> Result<SyncReport> {
        let plan = self.plan(config)?;
        let staged_keys = self.stage_keys(config, &plan.keys)?;
        let outcome = self.publish(config, &plan)?;

        self.emit(
            SyncStage::Complete,
            StageOutcome::Completed,
            format!(
                "{} key(s) uploaded, {} stale file(s) removed",
                outcome.uploaded_keys.len(),
                outcome.removed_files.len()
            ),
        );

        Ok(SyncReport {
            plan,
            staged_keys,
            removed_files: outcome.removed_files,
            uploaded_keys: outcome.uploaded_keys,
            par_replaced: outcome.par_replaced,
        })
    }

    /// Resolve mods, keys and the PAR file without downloading keys or using FTP.
    pub fn plan(&self, config: &RunConfig) -> Result<SyncPlan> {
        self.emit(
            SyncStage::DownloadingMapping,
            StageOutcome::Started,
            &config.key_mapping_file,
        );
        let mapping = self.check(
            SyncStage::DownloadingMapping,
            ModMapping::fetch(self.source.as_ref(), &config.key_mapping_file),
        )?;
        self.emit(
            SyncStage::DownloadingMapping,
            StageOutcome::Completed,
            format!("{} mod(s) mapped", mapping.len()),
        );

        let server_config = match &config.server_config_url {
            Some(url) => {
                self.emit(
                    SyncStage::DownloadingServerConfig,
                    StageOutcome::Started,
                    url,
                );
                let text = self.check(
                    SyncStage::DownloadingServerConfig,
                    self.source.fetch_text(url).map_err(|source| {
                        Error::ThirdPartyConfigFetchFailed {
                            url: url.clone(),
                            source,
                        }
                    }),
                )?;
                let server_config = parse_server_config(&text);
                self.emit(
                    SyncStage::DownloadingServerConfig,
                    StageOutcome::Completed,
                    match &server_config.name {
                        Some(name) => format!("server '{}'", name),
                        None => "server config has no name".to_string(),
                    },
                );
                Some(server_config)
            }
            None => {
                self.emit(
                    SyncStage::DownloadingServerConfig,
                    StageOutcome::Skipped,
                    "no server config configured",
                );
                None
            }
        };

        let server_name = server_config.as_ref().and_then(|c| c.name.clone());
        let mods = resolve_mods(
            server_config.map(|c| c.mods),
            config.manual_mods.as_deref(),
        );
        self.emit(
            SyncStage::ResolvingMods,
            StageOutcome::Completed,
            format!("{} mod(s) required", mods.len()),
        );

        let resolution = resolve_keys(&mods, &mapping, config.manual_keys.as_deref());
        let mut keys = self.check(SyncStage::ResolvingKeys, resolution.into_required())?;

        let mut blacklisted = Vec::new();
        for key in &config.blacklisted_keys {
            if keys.remove(key).is_some() {
                self.emit(
                    SyncStage::ResolvingKeys,
                    StageOutcome::Skipped,
                    format!("blacklisted key {}", key),
                );
                blacklisted.push(key.clone());
            }
        }
        self.emit(
            SyncStage::ResolvingKeys,
            StageOutcome::Completed,
            format!("{} key(s) required", keys.len()),
        );

        let par = match &config.par {
            Some(options) => self.plan_par(options, &mods)?,
            None => {
                self.emit(
                    SyncStage::DownloadingParFile,
                    StageOutcome::Skipped,
                    "no PAR file specified",
                );
                None
            }
        };

        Ok(SyncPlan {
            server_name,
            mods,
            keys,
            blacklisted,
            par,
        })
    }

    fn plan_par(&self, options: &ParOptions, mods: &ModSet) -> Result<Option<PlannedPar>> {
        self.emit(
            SyncStage::DownloadingParFile,
            StageOutcome::Started,
            &options.source,
        );
        let content = self.check(
            SyncStage::DownloadingParFile,
            self.source
                .fetch_text(&options.source)
                .map_err(|source| Error::ParFetchFailed {
                    url: options.source.clone(),
                    source,
                }),
        )?;
        if content.is_empty() {
            self.emit(
                SyncStage::DownloadingParFile,
                StageOutcome::Skipped,
                "PAR file is empty",
            );
            return Ok(None);
        }
        self.emit(
            SyncStage::DownloadingParFile,
            StageOutcome::Completed,
            format!("{} byte(s)", content.len()),
        );

        if !options.generate_mod_parameter {
            self.emit(
                SyncStage::PatchingParFile,
                StageOutcome::Skipped,
                "mod parameter generation disabled",
            );
            return Ok(Some(PlannedPar {
                ftp_path: options.ftp_path.clone(),
                content,
                server_startup: None,
            }));
        }

        let client_only = match &options.client_only_mod_list {
            Some(url) => {
                self.emit(
                    SyncStage::DownloadingClientOnlyList,
                    StageOutcome::Started,
                    url,
                );
                let client_only = self.check(
                    SyncStage::DownloadingClientOnlyList,
                    fetch_client_only_mods(self.source.as_ref(), url),
                )?;
                self.emit(
                    SyncStage::DownloadingClientOnlyList,
                    StageOutcome::Completed,
                    format!("{} client-only mod(s)", client_only.len()),
                );
                client_only
            }
            None => ModSet::new(),
        };

        let plan = partition_mods(mods, &client_only, &ModSet::new());
        let content = patch_par(&content, mods, &plan.client_only);
        self.emit(
            SyncStage::PatchingParFile,
            StageOutcome::Completed,
            format!(
                "{} mod(s) in server startup command",
                plan.server_startup.len()
            ),
        );

        Ok(Some(PlannedPar {
            ftp_path: options.ftp_path.clone(),
            content,
            server_startup: Some(plan.server_startup),
        }))
    }

    /// Download every required key into the staging directory.
    fn stage_keys(&self, config: &RunConfig, keys: &RequiredKeys) -> Result<Vec<Utf8PathBuf>> {
        self.emit(
            SyncStage::DownloadingKeys,
            StageOutcome::Started,
            format!("{} key(s) into {}", keys.len(), self.staging_dir),
        );
        let staged = self.check(SyncStage::DownloadingKeys, self.download_keys(config, keys))?;
        self.emit(
            SyncStage::DownloadingKeys,
            StageOutcome::Completed,
            format!("{} key(s) staged", staged.len()),
        );
        Ok(staged)
    }

    fn download_keys(&self, config: &RunConfig, keys: &RequiredKeys) -> Result<Vec<Utf8PathBuf>> {
        std::fs::create_dir_all(self.staging_dir.as_std_path())?;

        let mut staged = Vec::with_capacity(keys.len());
        for (key, requesters) in keys.iter() {
            let local_path = self.staging_path(key)?;
            let url = key_url(&config.key_location, key);
            let data = self
                .source
                .fetch(&url)
                .map_err(|source| Error::KeyFetchFailed {
                    key: key.to_string(),
                    url: url.clone(),
                    source,
                })?;
            std::fs::write(local_path.as_std_path(), data)?;

            let requesters: Vec<&str> = requesters.iter().map(String::as_str).collect();
            self.emit(
                SyncStage::DownloadingKeys,
                StageOutcome::Progress,
                format!("{} ({})", key, requesters.join(",")),
            );
            staged.push(local_path);
        }
        Ok(staged)
    }

    /// Local path for a key; key names must be plain file names.
    fn staging_path(&self, key: &str) -> Result<Utf8PathBuf> {
        if Utf8Path::new(key).file_name() != Some(key) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("key name '{}' is not a plain file name", key),
            )));
        }
        Ok(self.staging_dir.join(key))
    }

    fn publish(&self, config: &RunConfig, plan: &SyncPlan) -> Result<PublishOutcome> {
        let ftp = &config.ftp;
        self.emit(SyncStage::ConnectingToFtp, StageOutcome::Started, &ftp.address);
        let mut session = self.check(
            SyncStage::ConnectingToFtp,
            self.connector
                .connect(&ftp.address, &ftp.user, &ftp.password)
                .map_err(|source| Error::FtpConnectFailed {
                    address: ftp.address.clone(),
                    source,
                }),
        )?;

        let outcome = self.publish_with(session.as_mut(), config, plan);

        if let Err(e) = session.quit() {
            tracing::warn!("Failed to close FTP session cleanly: {}", e);
        }
        if outcome.is_err() {
            tracing::warn!(
                "Publishing stopped partway; {} may be left partially updated",
                ftp.path
            );
        }
        outcome
    }

    fn publish_with(
        &self,
        session: &mut dyn FtpSession,
        config: &RunConfig,
        plan: &SyncPlan,
    ) -> Result<PublishOutcome> {
        let ftp = &config.ftp;
        self.check(
            SyncStage::ConnectingToFtp,
            session
                .change_dir(&ftp.path)
                .map_err(|e| Error::ftp(format!("CWD {}", ftp.path), e)),
        )?;
        self.emit(
            SyncStage::ConnectingToFtp,
            StageOutcome::Completed,
            format!("{} {}", ftp.address, ftp.path),
        );

        let mut outcome = PublishOutcome::default();

        self.emit(SyncStage::RemovingStaleKeys, StageOutcome::Started, &ftp.path);
        let existing = self.check(
            SyncStage::RemovingStaleKeys,
            session.list().map_err(|e| Error::ftp("NLST", e)),
        )?;
        for name in existing {
            self.check(
                SyncStage::RemovingStaleKeys,
                session
                    .delete(&name)
                    .map_err(|e| Error::ftp(format!("DELE {}", name), e)),
            )?;
            self.emit(
                SyncStage::RemovingStaleKeys,
                StageOutcome::Progress,
                &name,
            );
            outcome.removed_files.push(name);
        }
        self.emit(
            SyncStage::RemovingStaleKeys,
            StageOutcome::Completed,
            format!("{} file(s) removed", outcome.removed_files.len()),
        );

        self.emit(
            SyncStage::UploadingKeys,
            StageOutcome::Started,
            format!("{} key(s)", plan.keys.len()),
        );
        for key in plan.keys.names() {
            self.check(SyncStage::UploadingKeys, self.upload_key(session, key))?;
            self.emit(SyncStage::UploadingKeys, StageOutcome::Progress, key);
            outcome.uploaded_keys.push(key.to_string());
        }
        self.emit(
            SyncStage::UploadingKeys,
            StageOutcome::Completed,
            format!("{} key(s) uploaded", outcome.uploaded_keys.len()),
        );

        if let Some(par) = &plan.par {
            self.replace_par(session, par)?;
            outcome.par_replaced = true;
        }

        Ok(outcome)
    }

    fn upload_key(&self, session: &mut dyn FtpSession, key: &str) -> Result<()> {
        let mut file = File::open(self.staging_path(key)?.as_std_path())?;
        session
            .upload(key, &mut file)
            .map_err(|e| Error::ftp(format!("STOR {}", key), e))
    }

    fn replace_par(&self, session: &mut dyn FtpSession, par: &PlannedPar) -> Result<()> {
        let (dir, name) = split_remote_path(&par.ftp_path);
        if !dir.is_empty() {
            self.check(
                SyncStage::RemovingStaleParFile,
                session
                    .change_dir(dir)
                    .map_err(|e| Error::ftp(format!("CWD {}", dir), e)),
            )?;
        }

        let existing = self.check(
            SyncStage::RemovingStaleParFile,
            session.list().map_err(|e| Error::ftp("NLST", e)),
        )?;
        if existing.iter().any(|file| file == name) {
            self.check(
                SyncStage::RemovingStaleParFile,
                session
                    .delete(name)
                    .map_err(|e| Error::ftp(format!("DELE {}", name), e)),
            )?;
            self.emit(SyncStage::RemovingStaleParFile, StageOutcome::Completed, name);
        } else {
            self.emit(
                SyncStage::RemovingStaleParFile,
                StageOutcome::Skipped,
                format!("no existing {}", name),
            );
        }

        self.check(
            SyncStage::UploadingParFile,
            session
                .upload(name, &mut par.content.as_bytes())
                .map_err(|e| Error::ftp(format!("STOR {}", name), e)),
        )?;
        self.emit(
            SyncStage::UploadingParFile,
            StageOutcome::Completed,
            &par.ftp_path,
        );
        Ok(())
    }

    /// Report a stage failure before handing the error back.
    fn check<T>(&self, stage: SyncStage, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.emit(stage, StageOutcome::Failed, err.to_string());
        }
        result
    }

    fn emit(&self, stage: SyncStage, outcome: StageOutcome, detail: impl Into<String>) {
        let event = SyncEvent::new(stage, outcome, detail);
        event.trace();
        if let Some(callback) = &self.event_callback {
            callback(&event);
        }
    }
}
