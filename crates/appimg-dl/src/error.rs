use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(appimg_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Network request failed")]
    #[diagnostic(
        code(appimg_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(appimg_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(appimg_dl::io))]
    Io(#[from] std::io::Error),

    #[error("Could not determine a download filename for '{url}'")]
    #[diagnostic(
        code(appimg_dl::no_filename),
        help("Try specifying an output path explicitly")
    )]
    NoFilename { url: String },

    #[error("No AppImage asset found in release '{tag}'")]
    #[diagnostic(code(appimg_dl::no_asset))]
    NoAsset { tag: String },

    #[error("Release '{tag}' not found for {owner}/{repo}")]
    #[diagnostic(code(appimg_dl::release_not_found))]
    ReleaseNotFound {
        owner: String,
        repo: String,
        tag: String,
    },

    #[error("Malformed release response from GitHub")]
    #[diagnostic(code(appimg_dl::protocol))]
    Protocol(#[from] serde_json::Error),

    #[error("Download was cancelled")]
    #[diagnostic(code(appimg_dl::cancelled))]
    Cancelled,

    #[error("Resume metadata mismatch for '{path}'")]
    #[diagnostic(code(appimg_dl::resume_mismatch))]
    ResumeMismatch { path: String },
}

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
