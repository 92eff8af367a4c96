use crate::OperationId;

/// All event types emitted during a single target's install pipeline.
#[derive(Debug, Clone)]
pub enum InstallerEvent {
    /// Resolving the GitHub release for a target.
    Resolving {
        op_id: OperationId,
        target: String,
    },
    /// Selecting an asset from the resolved release.
    SelectingAsset {
        op_id: OperationId,
        target: String,
        candidate_count: usize,
    },
    /// Download is starting.
    DownloadStarting {
        op_id: OperationId,
        target: String,
        total: u64,
    },
    /// Download is resuming from a previous checkpoint.
    DownloadResuming {
        op_id: OperationId,
        target: String,
        current: u64,
        total: u64,
    },
    /// Download progress update.
    DownloadProgress {
        op_id: OperationId,
        target: String,
        current: u64,
        total: u64,
    },
    /// Download completed successfully.
    DownloadComplete {
        op_id: OperationId,
        target: String,
        total: u64,
    },
    /// Download error, retrying.
    DownloadRetry {
        op_id: OperationId,
        target: String,
        attempt: u32,
    },
    /// Download permanently failed after retries.
    DownloadAborted { op_id: OperationId, target: String },
    /// Download recovered from an error.
    DownloadRecovered { op_id: OperationId, target: String },
    /// Verification stage.
    Verifying {
        op_id: OperationId,
        target: String,
        stage: VerifyStage,
    },
    /// Install/file-placement stage.
    Installing {
        op_id: OperationId,
        target: String,
        stage: InstallStage,
    },
    /// Icon acquisition stage.
    AcquiringIcon {
        op_id: OperationId,
        target: String,
        stage: IconStage,
    },
    /// Per-app config record written to disk.
    ConfigWritten { op_id: OperationId, target: String },
    /// Desktop entry written to disk.
    DesktopEntryWritten { op_id: OperationId, target: String },
    /// Per-target pipeline completed successfully.
    OperationComplete { op_id: OperationId, target: String },
    /// Per-target pipeline failed.
    OperationFailed {
        op_id: OperationId,
        target: String,
        error: String,
    },
    /// Per-target pipeline was skipped because the target is already installed.
    AlreadyInstalled { op_id: OperationId, target: String },
    /// Overall progress across a batch of targets.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Verification stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyStage {
    /// Checking a digest against the asset's reported checksum.
    Digest,
    /// Checking against a downloaded checksum file.
    ChecksumFile { source: String },
    /// All verification passed.
    Passed,
    /// No strong verification method was available.
    Unverified,
    /// Verification failed.
    Failed(String),
}

/// Installation (file placement) stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStage {
    /// Moving the downloaded file to its final install path.
    Moving,
    /// Setting executable permissions.
    SettingPermissions,
    /// Renaming to the canonical `.AppImage` form.
    Renaming,
    /// Installation complete.
    Complete,
}

/// Icon acquisition stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconStage {
    /// Running `--appimage-extract` in a scratch directory.
    Extracting,
    /// Falling back to downloading `iconUrl`.
    Downloading,
    /// Icon acquired.
    Complete { source: IconSource },
    /// No icon could be acquired; non-fatal.
    None,
}

/// Where an installed icon came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSource {
    Extraction,
    Github,
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
