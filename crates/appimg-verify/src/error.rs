use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum VerificationError {
    #[error("Unsupported digest algorithm: {0}")]
    #[diagnostic(code(appimg_verify::unsupported_algorithm))]
    UnsupportedAlgorithm(String),

    #[error("Invalid digest format: {0}")]
    #[diagnostic(
        code(appimg_verify::invalid_digest),
        help("Expected '<algorithm>:<hex>', e.g. 'sha256:deadbeef'")
    )]
    InvalidDigestFormat(String),

    #[error("No strong verification method passed for '{file}'")]
    #[diagnostic(
        code(appimg_verify::failed),
        help("The asset's digest and all detected checksum files failed to match")
    )]
    Failed { file: String },

    #[error("Hash for '{filename}' not found in checksum file")]
    #[diagnostic(code(appimg_verify::hash_not_found))]
    HashNotFound { filename: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] appimg_dl::DownloadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] appimg_utils::error::FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hash(#[from] appimg_utils::error::HashError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(appimg_verify::io))]
    Io(#[from] std::io::Error),
}

pub type VerificationOutcome<T> = Result<T, VerificationError>;
