//! Filesystem manipulations the orchestrator performs once a verified AppImage is sitting in
//! the download directory: renaming to a canonical name, moving into place, and marking
//! executable.

use std::path::{Path, PathBuf};

use appimg_utils::error::{FileSystemError, FileSystemResult, IoOperation, IoResultExt};

/// Strips a release tag/version suffix a publisher commonly bakes into the asset filename,
/// leaving a stable `<app>.AppImage` name to install under.
///
/// Only strips a suffix that looks like a version: a run of `-`/`_`/`.` followed by digits,
/// immediately before the `.AppImage` extension. A name with no such suffix is returned as-is.
pub fn clean_appimage_name(asset_name: &str) -> String {
    let stem = asset_name
        .strip_suffix(".AppImage")
        .or_else(|| asset_name.strip_suffix(".appimage"))
        .unwrap_or(asset_name);

    let bytes = stem.as_bytes();
    let mut cut = stem.len();
    let mut i = stem.len();
    let mut saw_digit = false;

    while i > 0 {
        let c = bytes[i - 1];
        if c.is_ascii_digit() {
            saw_digit = true;
            i -= 1;
            continue;
        }
        if saw_digit && matches!(c, b'-' | b'_' | b'.') {
            cut = i - 1;
        }
        break;
    }

    let base = if saw_digit { &stem[..cut] } else { stem };
    let base = base.trim_end_matches(['-', '_', '.']);
    let base = if base.is_empty() { stem } else { base };

    format!("{base}.AppImage")
}

/// Where an app with the given canonical name should live once installed, under `install_dir`.
///
/// Strips any pre-existing `.AppImage`/`.appimage` (and version) suffix from `app_name` before
/// re-applying the canonical extension, so a name that already looks like an asset filename
/// doesn't end up double-suffixed or install-path-unstable across releases.
pub fn canonical_install_path(install_dir: &Path, app_name: &str) -> PathBuf {
    install_dir.join(clean_appimage_name(app_name))
}

/// Moves `from` to `to`, falling back to copy+remove across filesystem boundaries, then sets
/// the executable bit. `to`'s parent directory is created if missing.
pub fn move_file(from: &Path, to: &Path) -> FileSystemResult<()> {
    if let Some(parent) = to.parent() {
        appimg_utils::fs::ensure_dir_exists(parent)?;
    }

    if std::fs::rename(from, to).is_err() {
        // Cross-device renames fail with EXDEV; falling back to copy+remove covers that case
        // without needing to inspect the OS error code.
        std::fs::copy(from, to).with_path(from, IoOperation::WriteFile)?;
        std::fs::remove_file(from).with_path(from, IoOperation::RemoveFile)?;
    }

    make_executable(to)
}

/// Sets the installed AppImage's permission bits to `0o755`.
pub fn make_executable(path: &Path) -> FileSystemResult<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_path(path, IoOperation::SetPermissions)?;
    Ok(())
}

pub fn not_a_file(path: &Path) -> FileSystemError {
    FileSystemError::NotAFile {
        path: path.to_path_buf(),
    }
}
