//! Narrow traits the orchestrator depends on but does not implement: catalog lookup and global
//! configuration are supplied by whatever embeds this crate (the `appimg-cli` binary, in this
//! workspace) through an injected context rather than the orchestrator owning config/catalog
//! storage itself.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::{IconPolicy, VerificationPolicy};

/// One catalog-defined application, the install-time equivalent of a user's URL override block.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub owner: String,
    pub repo: String,
    pub prerelease: bool,
    pub preferred_suffixes: Vec<String>,
    pub naming_template: Option<String>,
    pub verification: VerificationPolicy,
    pub icon: IconPolicy,
}

/// Keyed lookup over the catalog's backing store (a directory of JSON files in `appimg-cli`).
pub trait CatalogProvider: Send + Sync {
    /// All catalog entries, keyed by app name.
    fn available_apps(&self) -> Vec<String>;

    /// A single entry, if `name` is a known catalog key.
    fn app_config(&self, name: &str) -> Option<CatalogEntry>;
}

/// Process-wide settings outside the per-target policy: directories and network tuning.
pub trait GlobalConfigProvider: Send + Sync {
    fn install_dir(&self) -> PathBuf;
    fn icons_dir(&self) -> PathBuf;
    fn desktop_dir(&self) -> PathBuf;
    fn max_retries(&self) -> u32;
    fn request_timeout(&self) -> Duration;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestCatalog(HashMap<String, CatalogEntry>);

    impl CatalogProvider for TestCatalog {
        fn available_apps(&self) -> Vec<String> {
            self.0.keys().cloned().collect()
        }

        fn app_config(&self, name: &str) -> Option<CatalogEntry> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn test_catalog_provider_lookup() {
        let mut entries = HashMap::new();
        entries.insert(
            "app1".to_string(),
            CatalogEntry {
                owner: "acme".to_string(),
                repo: "app1".to_string(),
                prerelease: false,
                preferred_suffixes: vec!["x86_64".to_string()],
                naming_template: None,
                verification: VerificationPolicy::default(),
                icon: IconPolicy::default(),
            },
        );
        let catalog = TestCatalog(entries);

        assert_eq!(catalog.available_apps(), vec!["app1".to_string()]);
        assert!(catalog.app_config("app1").is_some());
        assert!(catalog.app_config("missing").is_none());
    }
}
