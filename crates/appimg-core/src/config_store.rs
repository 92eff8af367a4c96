//! Durable per-app config: one JSON document per installed app under
//! `<config_dir>/apps/<appName>.json`, written atomically via a temp file + rename so a reader
//! never observes a half-written record.

use std::path::{Path, PathBuf};

use appimg_utils::error::{FileSystemResult, IoOperation, IoResultExt};

use crate::types::AppConfigRecord;

/// Directory `config_store` reads and writes app records under.
pub fn apps_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("apps")
}

fn record_path(config_dir: &Path, app_name: &str) -> PathBuf {
    apps_dir(config_dir).join(format!("{app_name}.json"))
}

/// Writes `record` to `<config_dir>/apps/<appName>.json`, replacing any prior record.
pub fn write_record(config_dir: &Path, app_name: &str, record: &AppConfigRecord) -> FileSystemResult<()> {
    let dir = apps_dir(config_dir);
    appimg_utils::fs::ensure_dir_exists(&dir)?;

    let path = record_path(config_dir, app_name);
    let tmp_path = dir.join(format!(".{app_name}.json.tmp"));

    let json = serde_json::to_vec_pretty(record).map_err(|e| {
        appimg_utils::error::FileSystemError::WriteFile {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        }
    })?;

    std::fs::write(&tmp_path, &json).with_path(&tmp_path, IoOperation::WriteFile)?;
    std::fs::rename(&tmp_path, &path).with_path(
        &tmp_path,
        IoOperation::Rename { to: path.clone() },
    )?;

    Ok(())
}

/// Reads back a previously written record, if present.
pub fn read_record(config_dir: &Path, app_name: &str) -> FileSystemResult<Option<AppConfigRecord>> {
    let path = record_path(config_dir, app_name);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&path).with_path(&path, IoOperation::ReadFile)?;
    let record = serde_json::from_slice(&bytes).map_err(|e| {
        appimg_utils::error::FileSystemError::ReadFile {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        }
    })?;

    Ok(Some(record))
}

/// Whether an app with the given canonical name already has a recorded install.
pub fn is_installed(config_dir: &Path, app_name: &str) -> bool {
    record_path(config_dir, app_name).exists()
}

/// Removes the recorded install for an app, if present.
pub fn remove_record(config_dir: &Path, app_name: &str) -> FileSystemResult<()> {
    appimg_utils::fs::safe_remove(record_path(config_dir, app_name))
}
