//! Structured progress events.
//!
//! Neither the pipeline nor discovery prints. Each stage reports a [`SyncEvent`] to
//! the registered callback and mirrors it to `tracing` at debug level, so the CLI can
//! render progress while tests inspect the exact sequence of stages.

/// Stages of a run, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    DownloadingMapping,
    DownloadingServerConfig,
    ResolvingMods,
    ResolvingKeys,
    DownloadingParFile,
    DownloadingClientOnlyList,
    PatchingParFile,
    DownloadingKeys,
    ConnectingToFtp,
    RemovingStaleKeys,
    UploadingKeys,
    RemovingStaleParFile,
    UploadingParFile,
    ListingRemoteFiles,
    Complete,
}

impl SyncStage {
    /// Human-readable stage label.
    pub fn label(self) -> &'static str {
        match self {
            SyncStage::DownloadingMapping => "Downloading mapping file",
            SyncStage::DownloadingServerConfig => "Downloading server config",
            SyncStage::ResolvingMods => "Resolving mods",
            SyncStage::ResolvingKeys => "Resolving keys",
            SyncStage::DownloadingParFile => "Downloading PAR file",
            SyncStage::DownloadingClientOnlyList => "Downloading client-only mod list",
            SyncStage::PatchingParFile => "Patching PAR file",
            SyncStage::DownloadingKeys => "Downloading key files",
            SyncStage::ConnectingToFtp => "Connecting to FTP server",
            SyncStage::RemovingStaleKeys => "Removing stale keys",
            SyncStage::UploadingKeys => "Uploading keys",
            SyncStage::RemovingStaleParFile => "Removing stale PAR file",
            SyncStage::UploadingParFile => "Uploading PAR file",
            SyncStage::ListingRemoteFiles => "Listing remote files",
            SyncStage::Complete => "Complete",
        }
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a stage (or one step within it) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Started,
    /// One item of a multi-item stage finished (a key downloaded, a file removed).
    Progress,
    Completed,
    Skipped,
    Failed,
}

/// One entry of the run's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub stage: SyncStage,
    pub outcome: StageOutcome,
    pub detail: String,
}

impl SyncEvent {
    pub fn new(stage: SyncStage, outcome: StageOutcome, detail: impl Into<String>) -> Self {
        Self {
            stage,
            outcome,
            detail: detail.into(),
        }
    }

    /// Mirror the event to `tracing` at debug level.
    pub(crate) fn trace(&self) {
        match self.outcome {
            StageOutcome::Skipped => tracing::debug!("{} skipped: {}", self.stage, self.detail),
            StageOutcome::Progress => tracing::debug!("{}: {}", self.stage, self.detail),
            outcome => tracing::debug!("{} ({:?}): {}", self.stage, outcome, self.detail),
        }
    }
}
