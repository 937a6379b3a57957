//! # Locked File Reads
//!
//! Uses `fs2` for cross-platform advisory locking (flock on Unix, LockFile on
//! Windows). The lock is never waited on: a contended file is reported as
//! [`KeyFileError::Locked`] and the caller moves on.

use crate::domain::errors::KeyFileError;
use fs2::FileExt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Read a whole file while holding an exclusive advisory lock on it.
///
/// The lock is released on every exit path, including read failures.
pub fn read_locked(path: &Path) -> Result<Vec<u8>, KeyFileError> {
    let file = File::open(path).map_err(|source| KeyFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let _guard = FileLockGuard::try_acquire(&file, path)?;

    let mut bytes = Vec::new();
    (&file)
        .read_to_end(&mut bytes)
        .map_err(|source| KeyFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(bytes)
}

/// Exclusive lock on an open file, released on drop (RAII).
struct FileLockGuard<'a> {
    file: &'a File,
    path: PathBuf,
}

impl<'a> FileLockGuard<'a> {
    fn try_acquire(file: &'a File, path: &Path) -> Result<Self, KeyFileError> {
        match FileExt::try_lock_exclusive(file) {
            Ok(()) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(e) if is_contended(&e) => Err(KeyFileError::Locked {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(KeyFileError::LockFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release key file lock");
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn key_file(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.asc");
        File::create(&path).unwrap().write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_locked_returns_contents() {
        let (_dir, path) = key_file(b"key material");
        assert_eq!(read_locked(&path).unwrap(), b"key material");
    }

    #[test]
    fn test_contended_lock_fails_fast() {
        let (_dir, path) = key_file(b"key material");
        let holder = File::open(&path).unwrap();
        FileExt::try_lock_exclusive(&holder).unwrap();

        let err = read_locked(&path).unwrap_err();
        assert!(matches!(err, KeyFileError::Locked { .. }), "{err}");

        FileExt::unlock(&holder).unwrap();
        assert_eq!(read_locked(&path).unwrap(), b"key material");
    }

    #[test]
    fn test_lock_released_after_read() {
        let (_dir, path) = key_file(b"key material");
        read_locked(&path).unwrap();

        let other = File::open(&path).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
        FileExt::unlock(&other).unwrap();
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_locked(&dir.path().join("absent.asc")).unwrap_err();
        assert!(matches!(err, KeyFileError::Read { .. }));
    }
}
