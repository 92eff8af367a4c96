//! Digest verification: `asset.digest` ("<algo>:<hex>") checked against a computed file hash.

use std::path::Path;

use appimg_utils::hash::{calculate_file_hash, hashes_match, parse_digest};

use crate::{error::VerificationError, types::MethodResult};

/// Verifies `file_path` against a GitHub asset digest string of the form `<algorithm>:<hex>`.
///
/// Returns `Err` only when the digest string itself is malformed or names an unsupported
/// algorithm — a hash mismatch is a normal, successfully-computed `MethodResult { passed: false }`.
pub fn verify_digest(file_path: &Path, digest: &str) -> Result<MethodResult, VerificationError> {
    let (algo, expected_hex) = parse_digest(digest)?;
    let computed = calculate_file_hash(algo, file_path)?;
    let passed = hashes_match(expected_hex, &computed);

    Ok(MethodResult {
        passed,
        expected_hash: expected_hex.to_string(),
        computed_hash: computed,
        detail: if passed {
            format!("{} digest matched", algo.as_str())
        } else {
            format!("{} digest mismatch", algo.as_str())
        },
        source_url: None,
        algorithm: Some(algo),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_verify_digest_pass() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();
        file.flush().unwrap();

        let result = verify_digest(
            file.path(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        )
        .unwrap();
        assert!(result.passed);
    }

    #[test]
    fn test_verify_digest_mismatch() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not empty").unwrap();
        file.flush().unwrap();

        let result = verify_digest(
            file.path(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        )
        .unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn test_verify_digest_unsupported_algorithm() {
        let file = NamedTempFile::new().unwrap();
        assert!(verify_digest(file.path(), "crc32:deadbeef").is_err());
    }

    #[test]
    fn test_verify_digest_malformed() {
        let file = NamedTempFile::new().unwrap();
        assert!(verify_digest(file.path(), "nocolonhere").is_err());
    }
}
