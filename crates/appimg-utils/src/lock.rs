//! File-based locking mechanism guarding concurrent operations on the same install path.
//!
//! Two installer invocations racing to install, update, or remove the same AppImage must not
//! interleave their filesystem writes. This module provides an exclusive `flock`-backed lock
//! keyed by install path, held for the duration of a single operation.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::{
    error::{FileSystemError, IoContext, IoOperation, IoResultExt, LockError, LockResult},
    fs::ensure_dir_exists,
    path::xdg_cache_home,
};

/// An exclusive lock on a single install path.
///
/// The lock is released automatically when the `InstallLock` is dropped.
pub struct InstallLock {
    _file: nix::fcntl::Flock<File>,
    path: PathBuf,
}

impl InstallLock {
    /// Returns the directory lock files are kept in.
    ///
    /// Uses `$XDG_RUNTIME_DIR/appimg/locks` if set, otherwise `$XDG_CACHE_HOME/appimg/locks`.
    fn lock_dir() -> LockResult<PathBuf> {
        let base = std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| xdg_cache_home());

        let lock_dir = base.join("appimg").join("locks");
        ensure_dir_exists(&lock_dir).map_err(|source| LockError::LockDir { source })?;
        Ok(lock_dir)
    }

    /// Maps an install path to a stable lock-file name.
    fn lock_path(install_path: &Path) -> LockResult<PathBuf> {
        let lock_dir = Self::lock_dir()?;

        let sanitized: String = install_path
            .to_string_lossy()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Ok(lock_dir.join(format!("{sanitized}.lock")))
    }

    /// Acquires an exclusive lock on `install_path`, blocking until it is available.
    pub fn acquire(install_path: &Path) -> LockResult<Self> {
        let lock_path = Self::lock_path(install_path)?;
        let file = open_lock_file(&lock_path)?;

        let file = nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive)
            .map_err(|(_, source)| LockError::Acquire {
                name: lock_path.display().to_string(),
                source: std::io::Error::from(source),
            })?;

        Ok(Self {
            path: lock_path,
            _file: file,
        })
    }

    /// Attempts to acquire an exclusive lock on `install_path` without blocking.
    ///
    /// Returns `Ok(None)` if another operation currently holds the lock.
    pub fn try_acquire(install_path: &Path) -> LockResult<Option<Self>> {
        let lock_path = Self::lock_path(install_path)?;
        let file = open_lock_file(&lock_path)?;

        match nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusiveNonblock) {
            Ok(file) => Ok(Some(Self {
                path: lock_path,
                _file: file,
            })),
            Err((_, nix::errno::Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, source)) => Err(LockError::Acquire {
                name: lock_path.display().to_string(),
                source: std::io::Error::from(source),
            }),
        }
    }

    /// Returns the path of the backing lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(lock_path: &Path) -> LockResult<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .with_path(lock_path, IoOperation::CreateFile)
        .map_err(lock_io_error)
}

fn lock_io_error(source: FileSystemError) -> LockError {
    let io_source = match source {
        FileSystemError::CreateFile { source, .. } => source,
        other => std::io::Error::other(other.to_string()),
    };
    LockError::Acquire {
        name: "lock file".to_string(),
        source: io_source,
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_lock_path_sanitization() {
        let dir = tempdir().unwrap();
        let install_path = dir.path().join("apps/My App/app.AppImage");
        let path = InstallLock::lock_path(&install_path).unwrap();
        assert!(path.to_string_lossy().ends_with(".lock"));
        assert!(!path.to_string_lossy().contains(' '));
    }

    #[test]
    fn test_exclusive_lock() {
        let dir = tempdir().unwrap();
        let install_path = dir.path().join("app.AppImage");

        let lock1 = InstallLock::acquire(&install_path).unwrap();
        let lock2 = InstallLock::try_acquire(&install_path).unwrap();
        assert!(lock2.is_none());

        drop(lock1);

        let lock3 = InstallLock::try_acquire(&install_path).unwrap();
        assert!(lock3.is_some());
    }

    #[test]
    fn test_concurrent_locks_different_paths() {
        let dir = tempdir().unwrap();
        let lock1 = InstallLock::acquire(&dir.path().join("a.AppImage")).unwrap();
        let lock2 = InstallLock::acquire(&dir.path().join("b.AppImage")).unwrap();
        assert!(lock1.path() != lock2.path());
    }

    #[test]
    fn test_lock_blocks_until_released() {
        let dir = tempdir().unwrap();
        let install_path = dir.path().join("app.AppImage");

        let lock1 = InstallLock::acquire(&install_path).unwrap();
        let path = lock1.path().to_path_buf();
        let install_path_clone = install_path.clone();

        let handle = thread::spawn(move || {
            let lock2 = InstallLock::acquire(&install_path_clone).unwrap();
            assert_eq!(lock2.path(), &path);
        });

        thread::sleep(Duration::from_millis(100));
        drop(lock1);
        handle.join().unwrap();
    }
}
