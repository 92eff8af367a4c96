//! Verification data model: per-app policy, per-method outcomes, and the aggregate result.

use std::collections::HashMap;

use appimg_utils::hash::Algorithm;

/// Per-app verification policy. Read from the catalog (or defaulted for URL installs) and
/// mutated in place to reflect what was actually detected/used during a run.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub skip: bool,
    /// Optional explicit checksum filename, possibly templated with `{version}`/`{asset_name}`.
    pub checksum_file: Option<String>,
    pub hash_algorithm: Algorithm,
    pub digest: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            skip: false,
            checksum_file: None,
            hash_algorithm: Algorithm::Sha256,
            digest: false,
        }
    }
}

/// The outcome of a single verification attempt (one digest check, or one checksum-file check).
#[derive(Debug, Clone)]
pub struct MethodResult {
    pub passed: bool,
    pub expected_hash: String,
    pub computed_hash: String,
    pub detail: String,
    /// Set only for checksum-file attempts.
    pub source_url: Option<String>,
    pub algorithm: Option<Algorithm>,
}

/// Aggregate outcome of running every available verification method against a file.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub passed: bool,
    pub methods: HashMap<String, MethodResult>,
    pub config: VerificationConfig,
    pub warning: Option<String>,
}
