//! Streaming digest computation over the four algorithms GitHub release assets use.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::{HashError, HashResult};

const BUFFER_SIZE: usize = 64 * 1024;

/// A digest algorithm supported by the verification subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
    Md5,
}

impl Algorithm {
    /// Parses an algorithm name, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use appimg_utils::hash::Algorithm;
    ///
    /// assert_eq!(Algorithm::parse("SHA256").unwrap(), Algorithm::Sha256);
    /// assert!(Algorithm::parse("crc32").is_err());
    /// ```
    pub fn parse(name: &str) -> HashResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "md5" => Ok(Self::Md5),
            other => Err(HashError::UnsupportedAlgorithm {
                algo: other.to_string(),
            }),
        }
    }

    /// Detects an algorithm from a checksum filename's suffix (e.g. `app.sha256`).
    ///
    /// Returns `None` when the suffix doesn't name a known algorithm.
    pub fn from_filename_suffix(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        for (suffix, algo) in [
            (".sha256sum", Self::Sha256),
            (".sha512sum", Self::Sha512),
            (".sha1sum", Self::Sha1),
            (".md5sum", Self::Md5),
            (".sha256", Self::Sha256),
            (".sha512", Self::Sha512),
            (".sha1", Self::Sha1),
            (".md5", Self::Md5),
        ] {
            if lower.ends_with(suffix) {
                return Some(algo);
            }
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
        }
    }
}

/// Computes the digest of a byte slice already resident in memory.
pub fn hash_bytes(algo: Algorithm, bytes: &[u8]) -> String {
    match algo {
        Algorithm::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        Algorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        Algorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        Algorithm::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
    }
}

/// Computes the digest of a file on disk, streaming through a fixed-size buffer.
///
/// # Examples
///
/// ```no_run
/// use appimg_utils::hash::{calculate_file_hash, Algorithm};
///
/// let digest = calculate_file_hash(Algorithm::Sha256, "app.AppImage").unwrap();
/// println!("{digest}");
/// ```
pub fn calculate_file_hash<P: AsRef<Path>>(algo: Algorithm, path: P) -> HashResult<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| HashError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut buffer = [0u8; BUFFER_SIZE];

    macro_rules! stream {
        ($hasher:expr) => {{
            let mut hasher = $hasher;
            loop {
                let n = reader.read(&mut buffer).map_err(|source| HashError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            hex::encode(hasher.finalize())
        }};
    }

    let digest = match algo {
        Algorithm::Sha1 => stream!(Sha1::new()),
        Algorithm::Sha256 => stream!(Sha256::new()),
        Algorithm::Sha512 => stream!(Sha512::new()),
        Algorithm::Md5 => stream!(Md5::new()),
    };

    Ok(digest)
}

/// Case-insensitively compares two hex digest strings.
pub fn hashes_match(expected: &str, computed: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(computed.trim())
}

/// Parses an asset digest string of the form `<algorithm>:<hex>`.
///
/// # Examples
///
/// ```
/// use appimg_utils::hash::{parse_digest, Algorithm};
///
/// let (algo, hex) = parse_digest("sha256:deadbeef").unwrap();
/// assert_eq!(algo, Algorithm::Sha256);
/// assert_eq!(hex, "deadbeef");
/// ```
pub fn parse_digest(digest: &str) -> HashResult<(Algorithm, &str)> {
    let (algo, hex) = digest
        .split_once(':')
        .ok_or_else(|| HashError::MalformedDigest {
            digest: digest.to_string(),
        })?;
    let algo = Algorithm::parse(algo.trim())?;
    Ok((algo, hex.trim()))
}
