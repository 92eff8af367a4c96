//! Layered configuration: compiled-in defaults, overridden by a TOML file at a path resolved
//! from `APPIMG_CONFIG` or the XDG default.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};
use std::time::Duration;

use appimg_core::GlobalConfigProvider;
use appimg_utils::path::{default_config_path, desktop_dir, icons_dir, install_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> =
    LazyLock::new(|| RwLock::new(default_config_path()));

/// The `appimg` global configuration document. Every field is optional so a partial file only
/// overrides what it names; anything absent falls back to [`GlobalConfig::default`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Directory installed AppImages live under. Default: `$XDG_DATA_HOME/appimg/apps`.
    pub install_dir: Option<String>,

    /// Directory acquired icons are installed under. Default: `$XDG_DATA_HOME/icons/hicolor`.
    pub icons_dir: Option<String>,

    /// Directory `.desktop` launcher entries are written to. Default: `$XDG_DATA_HOME/applications`.
    pub desktop_dir: Option<String>,

    /// Maximum download attempts per asset. Default: 3.
    pub max_retries: Option<u32>,

    /// Per-request network timeout, in seconds. Default: 30.
    pub request_timeout_secs: Option<u64>,

    /// Default number of targets installed concurrently. Default: 3.
    pub concurrency: Option<usize>,
}

impl GlobalConfig {
    /// Loads the config document at `path`, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(3).max(1)
    }
}

impl GlobalConfigProvider for GlobalConfig {
    fn install_dir(&self) -> PathBuf {
        self.install_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(install_dir)
    }

    fn icons_dir(&self) -> PathBuf {
        self.icons_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(icons_dir)
    }

    fn desktop_dir(&self) -> PathBuf {
        self.desktop_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(desktop_dir)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(3)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = GlobalConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.concurrency(), 3);
        assert_eq!(config.max_retries(), 3);
    }

    #[test]
    fn test_load_partial_file_overrides_only_named_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "concurrency = 8\n").unwrap();

        let config = GlobalConfig::load(&path).unwrap();
        assert_eq!(config.concurrency(), 8);
        assert_eq!(config.max_retries(), 3);
    }

    #[test]
    fn test_install_dir_override() {
        let mut config = GlobalConfig::default();
        config.install_dir = Some("/opt/appimg/apps".to_string());
        assert_eq!(
            GlobalConfigProvider::install_dir(&config),
            PathBuf::from("/opt/appimg/apps")
        );
    }
}
