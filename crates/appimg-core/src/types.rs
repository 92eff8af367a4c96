//! Data model shared across the install pipeline: the request/outcome shapes the orchestrator
//! exchanges with its caller, and the durable per-app config record written to disk.

use std::path::PathBuf;

use appimg_utils::hash::Algorithm;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: &str = "1.0.0";

/// Stable, user-facing classification of a failed install, per the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    Protocol,
    AssetNotFound,
    VerificationFailed,
    Install,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Network => "NetworkError",
            Self::Protocol => "ProtocolError",
            Self::AssetNotFound => "AssetNotFound",
            Self::VerificationFailed => "VerificationFailed",
            Self::Install => "InstallError",
            Self::Cancelled => "Cancelled",
            Self::Internal => "InternalError",
        }
    }
}

/// A single requested install target, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A raw `https://github.com/<owner>/<repo>` URL.
    Url(String),
    /// A key present in the catalog.
    Catalog(String),
}

impl Target {
    /// The string originally supplied for this target, used in outcomes and log lines.
    pub fn raw(&self) -> &str {
        match self {
            Self::Url(s) | Self::Catalog(s) => s,
        }
    }
}

/// Options controlling one `install` call across however many targets are requested.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub concurrency: usize,
    pub verify: bool,
    pub show_progress: bool,
    pub download_dir: PathBuf,
    pub force: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            verify: true,
            show_progress: true,
            download_dir: std::env::temp_dir().join("appimg-downloads"),
            force: false,
        }
    }
}

/// The result of running the per-target pipeline for one requested target.
#[derive(Debug, Clone)]
pub enum PerTargetOutcome {
    Installed {
        target: String,
        path: PathBuf,
        warning: Option<String>,
    },
    AlreadyInstalled {
        target: String,
    },
    Failed {
        target: String,
        kind: ErrorKind,
        message: String,
    },
}

impl PerTargetOutcome {
    pub fn target(&self) -> &str {
        match self {
            Self::Installed { target, .. }
            | Self::AlreadyInstalled { target }
            | Self::Failed { target, .. } => target,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Per-app verification policy, as persisted/read back from `AppConfigRecord.overrides`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationPolicy {
    pub skip: bool,
    pub checksum_file: Option<String>,
    pub hash_algorithm: String,
    pub digest: bool,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            skip: false,
            checksum_file: None,
            hash_algorithm: Algorithm::Sha256.as_str().to_string(),
            digest: false,
        }
    }
}

impl From<&appimg_verify::VerificationConfig> for VerificationPolicy {
    fn from(config: &appimg_verify::VerificationConfig) -> Self {
        Self {
            skip: config.skip,
            checksum_file: config.checksum_file.clone(),
            hash_algorithm: config.hash_algorithm.as_str().to_string(),
            digest: config.digest,
        }
    }
}

impl From<&VerificationPolicy> for appimg_verify::VerificationConfig {
    fn from(policy: &VerificationPolicy) -> Self {
        Self {
            skip: policy.skip,
            checksum_file: policy.checksum_file.clone(),
            hash_algorithm: Algorithm::parse(&policy.hash_algorithm).unwrap_or(Algorithm::Sha256),
            digest: policy.digest,
        }
    }
}

/// Per-app icon policy, as persisted/read back from `AppConfigRecord.overrides`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconPolicy {
    pub extraction: bool,
    pub icon_url: Option<String>,
    pub preserve_url_on_extraction: bool,
}

impl Default for IconPolicy {
    fn default() -> Self {
        Self {
            extraction: true,
            icon_url: None,
            preserve_url_on_extraction: false,
        }
    }
}

/// URL-install metadata override block, the full catalog-entry-equivalent for installs that
/// were not driven by a catalog key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlOverrides {
    pub owner: String,
    pub repo: String,
    pub prerelease: bool,
    pub naming_template: Option<String>,
    pub verification: VerificationPolicy,
    pub icon: IconPolicy,
}

/// One verification method's recorded outcome, in the shape written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethodRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub algorithm: String,
    pub expected: String,
    pub computed: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub passed: bool,
    pub methods: Vec<VerificationMethodRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconRecord {
    pub installed: bool,
    pub method: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub version: String,
    pub installed_date: String,
    pub installed_path: String,
    pub verification: VerificationRecord,
    pub icon: IconRecord,
}

/// The durable post-install record, one JSON document per installed app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfigRecord {
    pub config_version: String,
    pub source: InstallSource,
    pub catalog_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<UrlOverrides>,
    pub state: StateRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallSource {
    Catalog,
    Url,
}

impl From<appimg_verify::VerificationResult> for VerificationRecord {
    fn from(result: appimg_verify::VerificationResult) -> Self {
        let mut methods: Vec<(String, appimg_verify::MethodResult)> =
            result.methods.into_iter().collect();
        methods.sort_by(|a, b| a.0.cmp(&b.0));

        let methods = methods
            .into_iter()
            .map(|(name, m)| {
                let (kind, source) = if name == "digest" {
                    ("digest".to_string(), "GitHub API".to_string())
                } else {
                    (
                        "checksum_file".to_string(),
                        m.source_url.clone().unwrap_or_default(),
                    )
                };
                VerificationMethodRecord {
                    kind,
                    status: if m.passed { "passed" } else { "failed" }.to_string(),
                    algorithm: m
                        .algorithm
                        .map(|a| a.as_str().to_ascii_uppercase())
                        .unwrap_or_default(),
                    expected: m.expected_hash,
                    computed: m.computed_hash,
                    source,
                }
            })
            .collect();

        VerificationRecord {
            passed: result.passed,
            methods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_raw() {
        assert_eq!(Target::Url("https://github.com/o/r".to_string()).raw(), "https://github.com/o/r");
        assert_eq!(Target::Catalog("app1".to_string()).raw(), "app1");
    }

    #[test]
    fn test_per_target_outcome_is_success() {
        let installed = PerTargetOutcome::Installed {
            target: "app1".to_string(),
            path: PathBuf::from("/tmp/app1.AppImage"),
            warning: None,
        };
        assert!(installed.is_success());

        let failed = PerTargetOutcome::Failed {
            target: "app1".to_string(),
            kind: ErrorKind::VerificationFailed,
            message: "nope".to_string(),
        };
        assert!(!failed.is_success());
    }

    #[test]
    fn test_verification_policy_roundtrips_through_verification_config() {
        let policy = VerificationPolicy {
            skip: false,
            checksum_file: Some("SHA256SUMS".to_string()),
            hash_algorithm: "sha512".to_string(),
            digest: true,
        };
        let config: appimg_verify::VerificationConfig = (&policy).into();
        assert_eq!(config.hash_algorithm, Algorithm::Sha512);
        assert!(config.digest);

        let round_tripped: VerificationPolicy = (&config).into();
        assert_eq!(round_tripped.hash_algorithm, "sha512");
    }

    #[test]
    fn test_verification_policy_invalid_algorithm_falls_back_to_sha256() {
        let policy = VerificationPolicy {
            hash_algorithm: "crc32".to_string(),
            ..Default::default()
        };
        let config: appimg_verify::VerificationConfig = (&policy).into();
        assert_eq!(config.hash_algorithm, Algorithm::Sha256);
    }

    #[test]
    fn test_app_config_record_serializes_catalog_install_without_overrides() {
        let record = AppConfigRecord {
            config_version: CONFIG_VERSION.to_string(),
            source: InstallSource::Catalog,
            catalog_ref: Some("app1".to_string()),
            overrides: None,
            state: StateRecord {
                version: "1.0.0".to_string(),
                installed_date: "2026-01-01T00:00:00Z".to_string(),
                installed_path: "/home/user/.local/share/appimg/apps/app1.AppImage".to_string(),
                verification: VerificationRecord {
                    passed: true,
                    methods: Vec::new(),
                },
                icon: IconRecord {
                    installed: false,
                    method: None,
                    path: None,
                },
            },
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"overrides\""));
        assert!(json.contains("\"catalog_ref\":\"app1\""));
    }
}
