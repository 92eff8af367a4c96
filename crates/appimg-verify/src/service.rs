//! Orchestration of the four verification phases: detection, skip decision, concurrent
//! execution of every available method, and aggregation into a single [`VerificationResult`].

use std::{collections::HashMap, path::Path, thread};

use appimg_dl::{
    checksum_detect::{
        detect_checksum_files, prioritize_checksum_files, resolve_manual_checksum_file,
        ChecksumFileInfo, ChecksumFormat,
    },
    github::Asset,
    http_client::SHARED_AGENT,
};
use appimg_utils::hash::{hash_bytes, hashes_match, Algorithm};
use tracing::{debug, warn};

use crate::{
    digest::verify_digest,
    error::VerificationError,
    types::{MethodResult, VerificationConfig, VerificationResult},
};

const NO_CHECKSUMS_WARNING: &str = "not verified - developer did not provide checksums";

/// Runs the full verification pipeline for a downloaded file against its originating asset.
#[allow(clippy::too_many_arguments)]
pub fn verify_file(
    file_path: &Path,
    asset: &Asset,
    config: &VerificationConfig,
    owner: &str,
    repo: &str,
    tag: &str,
    version: &str,
    all_assets: Option<&[Asset]>,
) -> Result<VerificationResult, VerificationError> {
    let target_filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&asset.name)
        .to_string();

    let (has_digest, checksum_files) =
        detect_available_methods(asset, config, all_assets, owner, repo, tag, version);

    if config.skip && !has_digest && checksum_files.is_empty() {
        return Ok(VerificationResult {
            passed: true,
            methods: HashMap::new(),
            config: config.clone(),
            warning: None,
        });
    }

    let mut effective_config = config.clone();
    if config.skip {
        effective_config.skip = false;
    }

    let prioritized = prioritize_checksum_files(checksum_files, &target_filename);

    let methods = run_methods_concurrently(file_path, asset, &prioritized, has_digest)?;

    aggregate(methods, effective_config, &target_filename, &prioritized)
}

/// Phase 1: determines which verification methods are available without running any of them.
fn detect_available_methods(
    asset: &Asset,
    config: &VerificationConfig,
    all_assets: Option<&[Asset]>,
    owner: &str,
    repo: &str,
    tag: &str,
    version: &str,
) -> (bool, Vec<ChecksumFileInfo>) {
    let has_digest = !asset.digest.trim().is_empty();

    if let Some(template) = config.checksum_file.as_deref().filter(|s| !s.trim().is_empty()) {
        let info = resolve_manual_checksum_file(template, owner, repo, tag, version, &asset.name);
        return (has_digest, vec![info]);
    }

    if has_digest && config.digest {
        debug!("skipping checksum-file auto-detection: digest verification explicitly enabled");
        return (has_digest, Vec::new());
    }

    match all_assets {
        Some(assets) => (has_digest, detect_checksum_files(assets)),
        None => (has_digest, Vec::new()),
    }
}

/// Phase 3: launches one digest task (if available) and one task per prioritized checksum
/// file, all against the same on-disk file, and collects every completion.
fn run_methods_concurrently(
    file_path: &Path,
    asset: &Asset,
    checksum_files: &[ChecksumFileInfo],
    has_digest: bool,
) -> Result<HashMap<String, MethodResult>, VerificationError> {
    thread::scope(|scope| {
        let mut handles = Vec::new();

        if has_digest {
            let digest = asset.digest.clone();
            handles.push((
                "digest".to_string(),
                scope.spawn(move || verify_digest(file_path, &digest)),
            ));
        }

        for info in checksum_files {
            let key = format!("checksum:{}", info.filename);
            handles.push((
                key,
                scope.spawn(|| verify_checksum_file(file_path, info)),
            ));
        }

        let mut methods = HashMap::new();
        for (name, handle) in handles {
            match handle.join() {
                Ok(Ok(result)) => {
                    methods.insert(name, result);
                }
                Ok(Err(e)) => {
                    warn!(method = %name, error = %e, "verification method errored");
                    // Record the attempt as a failure rather than dropping it: a method that was
                    // available but errored (network failure, hash not found, ...) must still
                    // count against `aggregate`'s any-passed check, or a transient error on the
                    // only available checksum file would be indistinguishable from no checksums
                    // having been published at all.
                    methods.insert(
                        name,
                        MethodResult {
                            passed: false,
                            expected_hash: String::new(),
                            computed_hash: String::new(),
                            detail: e.to_string(),
                            source_url: None,
                            algorithm: None,
                        },
                    );
                }
                Err(_) => {
                    warn!(method = %name, "verification method panicked");
                    methods.insert(
                        name,
                        MethodResult {
                            passed: false,
                            expected_hash: String::new(),
                            computed_hash: String::new(),
                            detail: "verification method panicked".to_string(),
                            source_url: None,
                            algorithm: None,
                        },
                    );
                }
            }
        }
        Ok(methods)
    })
}

fn verify_checksum_file(
    file_path: &Path,
    info: &ChecksumFileInfo,
) -> Result<MethodResult, VerificationError> {
    let mut resp = SHARED_AGENT
        .get(&info.url)
        .call()
        .map_err(appimg_dl::DownloadError::from)?;
    let content = resp.body_mut().read_to_string()?;

    let target_filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&info.filename);

    let algo = match info.format {
        ChecksumFormat::Structured => Algorithm::Sha512,
        ChecksumFormat::LineOriented => {
            Algorithm::from_filename_suffix(&info.filename).unwrap_or(Algorithm::Sha256)
        }
    };

    let expected = match info.format {
        ChecksumFormat::Structured => crate::checksum_file::parse_structured(&content, target_filename),
        ChecksumFormat::LineOriented => {
            crate::checksum_file::parse_line_oriented(&content, target_filename)
        }
    };

    let expected = expected.ok_or_else(|| VerificationError::HashNotFound {
        filename: target_filename.to_string(),
    })?;

    let file_bytes = std::fs::read(file_path)?;
    let computed = hash_bytes(algo, &file_bytes);
    let passed = hashes_match(&expected, &computed);

    Ok(MethodResult {
        passed,
        expected_hash: expected,
        computed_hash: computed,
        detail: if passed {
            format!("checksum file '{}' matched", info.filename)
        } else {
            format!("checksum file '{}' mismatch", info.filename)
        },
        source_url: Some(info.url.clone()),
        algorithm: Some(algo),
    })
}

/// Phase 4: aggregates method outcomes into a pass/fail verdict and optional warning, per the
/// precedence rules (digest primary, partial-failure warning, no-strong-method warning).
fn aggregate(
    methods: HashMap<String, MethodResult>,
    mut config: VerificationConfig,
    target_filename: &str,
    prioritized: &[ChecksumFileInfo],
) -> Result<VerificationResult, VerificationError> {
    if methods.is_empty() {
        return Ok(VerificationResult {
            passed: true,
            methods,
            config,
            warning: Some(NO_CHECKSUMS_WARNING.to_string()),
        });
    }

    let any_passed = methods.values().any(|m| m.passed);
    if !any_passed {
        return Err(VerificationError::Failed {
            file: target_filename.to_string(),
        });
    }

    let digest_passed = methods.get("digest").is_some_and(|m| m.passed);
    if digest_passed {
        config.digest = true;
    }
    // Select the first-in-priority-order passing checksum file, not the first the HashMap
    // happens to iterate: hash map order is unspecified, so iterating `methods` directly would
    // make the recorded `checksum_file` (and thus verification determinism) depend on hashing.
    if let Some(info) = prioritized
        .iter()
        .find(|info| methods.get(&format!("checksum:{}", info.filename)).is_some_and(|m| m.passed))
    {
        config.checksum_file = Some(info.filename.clone());
    }

    let failed_methods: Vec<&str> = methods
        .iter()
        .filter(|(_, m)| !m.passed)
        .map(|(name, _)| name.as_str())
        .collect();

    let warning = if failed_methods.is_empty() {
        None
    } else {
        Some(format!(
            "Partial verification: {} failed",
            failed_methods.join(", ")
        ))
    };

    Ok(VerificationResult {
        passed: true,
        methods,
        config,
        warning,
    })
}
