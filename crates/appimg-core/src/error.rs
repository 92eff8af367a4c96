use miette::Diagnostic;
use thiserror::Error;

use crate::types::ErrorKind;

/// Unified error type surfaced by the install orchestrator. Variants map 1:1 onto the error
/// kinds the orchestrator records in a [`PerTargetOutcome::Failed`](crate::types::PerTargetOutcome::Failed).
#[derive(Error, Diagnostic, Debug)]
pub enum InstallerError {
    #[error("Unknown target(s): {0}")]
    #[diagnostic(
        code(appimg::validation),
        help("Targets must be a GitHub URL (https://github.com/<owner>/<repo>) or a catalog key")
    )]
    Validation(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] appimg_dl::DownloadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Verification(#[from] appimg_verify::VerificationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] appimg_utils::error::FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lock(#[from] appimg_utils::error::LockError),

    #[error("No compatible AppImage asset found for '{target}'")]
    #[diagnostic(
        code(appimg::asset_not_found),
        help("The release may not publish a Linux x86_64 AppImage")
    )]
    AssetNotFound { target: String },

    #[error("Installation of '{target}' was cancelled")]
    #[diagnostic(code(appimg::cancelled))]
    Cancelled { target: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(appimg::io))]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    #[diagnostic(code(appimg::internal), help("This is unexpected; please report it"))]
    Internal(String),
}

impl InstallerError {
    /// Normalizes this error to the stable kind string recorded in a failed outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Download(e) => download_error_kind(e),
            Self::Verification(_) => ErrorKind::VerificationFailed,
            Self::FileSystem(_) | Self::Lock(_) => ErrorKind::Install,
            Self::AssetNotFound { .. } => ErrorKind::AssetNotFound,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn download_error_kind(e: &appimg_dl::DownloadError) -> ErrorKind {
    use appimg_dl::DownloadError as D;
    match e {
        D::Network(_) | D::HttpError { .. } => ErrorKind::Network,
        D::Protocol(_) => ErrorKind::Protocol,
        D::Cancelled => ErrorKind::Cancelled,
        D::NoAsset { .. } | D::ReleaseNotFound { .. } => ErrorKind::AssetNotFound,
        D::InvalidUrl { .. } => ErrorKind::Validation,
        D::Io(_) | D::NoFilename { .. } | D::ResumeMismatch { .. } => ErrorKind::Internal,
    }
}

pub type InstallerResult<T> = Result<T, InstallerError>;
