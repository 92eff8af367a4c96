//! Resume-checkpoint persistence via extended attributes.
//!
//! The download service stamps the in-progress destination file with a small JSON blob every
//! megabyte. A retried or resumed download reads this attribute back to avoid re-fetching bytes
//! that already landed on disk.

use std::path::Path;

use crate::types::ResumeInfo;

const XATTR_RESUME_KEY: &str = "user.appimg.resume";

/// Reads the resume checkpoint for `path`, if any.
///
/// Returns `None` when the attribute is absent, unreadable, or fails to deserialize — a missing
/// checkpoint simply means the next attempt starts from scratch.
pub fn read_resume<P: AsRef<Path>>(path: P) -> Option<ResumeInfo> {
    xattr::get(path, XATTR_RESUME_KEY)
        .ok()
        .flatten()
        .and_then(|v| serde_json::from_slice(&v).ok())
}

/// Persists a resume checkpoint for `path`.
pub fn write_resume<P: AsRef<Path>>(path: P, info: &ResumeInfo) -> std::io::Result<()> {
    xattr::set(path, XATTR_RESUME_KEY, &serde_json::to_vec(info)?)
}

/// Removes any resume checkpoint for `path`. Called once a download completes.
pub fn remove_resume<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    match xattr::remove(path, XATTR_RESUME_KEY) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_roundtrip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let info = ResumeInfo {
            downloaded: 1024,
            total: 4096,
            etag: Some("abc".to_string()),
        };
        write_resume(file.path(), &info).unwrap();

        let read = read_resume(file.path()).unwrap();
        assert_eq!(read.downloaded, 1024);
        assert_eq!(read.total, 4096);
        assert_eq!(read.etag.as_deref(), Some("abc"));

        remove_resume(file.path()).unwrap();
        assert!(read_resume(file.path()).is_none());
    }

    #[test]
    fn test_read_resume_missing_is_none() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(read_resume(file.path()).is_none());
    }
}
