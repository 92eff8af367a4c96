//! `CatalogProvider` over a directory of per-app JSON files, one file per catalog entry keyed by
//! its filename stem — the simplest concrete realization of a keyed lookup over JSON files.

use std::collections::HashMap;
use std::path::Path;

use appimg_core::{CatalogEntry, CatalogProvider, IconPolicy, VerificationPolicy};
use serde::Deserialize;
use tracing::warn;

/// On-disk shape of one catalog entry file, e.g. `<catalog_dir>/htop.json`.
#[derive(Debug, Deserialize)]
struct CatalogEntryFile {
    owner: String,
    repo: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    preferred_suffixes: Vec<String>,
    #[serde(default)]
    naming_template: Option<String>,
    #[serde(default)]
    verification: VerificationPolicy,
    #[serde(default)]
    icon: IconPolicy,
}

impl From<CatalogEntryFile> for CatalogEntry {
    fn from(file: CatalogEntryFile) -> Self {
        Self {
            owner: file.owner,
            repo: file.repo,
            prerelease: file.prerelease,
            preferred_suffixes: file.preferred_suffixes,
            naming_template: file.naming_template,
            verification: file.verification,
            icon: file.icon,
        }
    }
}

/// Loads every `<name>.json` file directly under `catalog_dir` once at startup; unreadable or
/// malformed entries are logged and skipped rather than failing the whole load.
pub struct DirectoryCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl DirectoryCatalog {
    pub fn load(catalog_dir: &Path) -> Self {
        let mut entries = HashMap::new();

        let Ok(read_dir) = std::fs::read_dir(catalog_dir) else {
            return Self { entries };
        };

        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match std::fs::read(&path) {
                Ok(bytes) => match serde_json::from_slice::<CatalogEntryFile>(&bytes) {
                    Ok(file) => {
                        entries.insert(name.to_string(), file.into());
                    }
                    Err(e) => warn!("skipping catalog entry {}: {e}", path.display()),
                },
                Err(e) => warn!("skipping catalog entry {}: {e}", path.display()),
            }
        }

        Self { entries }
    }
}

impl CatalogProvider for DirectoryCatalog {
    fn available_apps(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn app_config(&self, name: &str) -> Option<CatalogEntry> {
        self.entries.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_reads_valid_entries_and_skips_malformed() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("htop.json"),
            r#"{"owner": "htop-dev", "repo": "htop"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "not json").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "irrelevant").unwrap();

        let catalog = DirectoryCatalog::load(dir.path());

        assert_eq!(catalog.available_apps(), vec!["htop".to_string()]);
        let entry = catalog.app_config("htop").unwrap();
        assert_eq!(entry.owner, "htop-dev");
        assert_eq!(entry.repo, "htop");
        assert!(catalog.app_config("broken").is_none());
    }

    #[test]
    fn test_missing_directory_yields_empty_catalog() {
        let catalog = DirectoryCatalog::load(Path::new("/nonexistent/path/for/test"));
        assert!(catalog.available_apps().is_empty());
    }
}
