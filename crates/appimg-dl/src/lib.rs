//! Release resolution, asset selection, checksum-file detection, and download mechanics for
//! the GitHub-sourced AppImage installer.

pub mod checksum_detect;
pub mod download;
pub mod error;
pub mod github;
pub mod http_client;
pub mod select;
pub mod types;
pub mod xattr;

pub use checksum_detect::{
    detect_checksum_files, prioritize_checksum_files, resolve_manual_checksum_file,
    ChecksumFileInfo, ChecksumFormat,
};
pub use download::{CancellationToken, Download};
pub use error::{DownloadError, DownloadResult};
pub use github::{Asset, GithubResolver, Release, ReleaseCache, ReleaseKind};
pub use select::{select_appimage, InstallationSource};
pub use types::{Progress, ResumeInfo};
