//! # Filesystem Key Store
//!
//! Trusted keys live as plain files directly inside one directory:
//! - the directory is canonicalized before use, so `..` and symlinked
//!   roots resolve to a real absolute path
//! - only direct children are considered; subdirectories are skipped, never
//!   entered, and a symlink is accepted only when its target is a regular file
//! - a name must end in an accepted extension and the contents must pass
//!   the family's content sniff
//! - a file that is locked or unreadable during the scan is not a candidate

use super::lock::read_locked;
use crate::domain::detect::{has_accepted_extension, looks_like_key_file};
use crate::domain::entities::SignatureType;
use crate::domain::errors::KeyFileError;
use crate::ports::outbound::KeyStore;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key store backed by a local directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSystemKeyStore;

impl KeyStore for FileSystemKeyStore {
    fn resolve_dir(&self, dir: &Path) -> Result<PathBuf, String> {
        sanitize_key_dir(dir)
    }

    fn find_key_files(
        &self,
        dir: &Path,
        extensions: &[String],
        family: SignatureType,
    ) -> io::Result<Vec<PathBuf>> {
        scan_key_dir(dir, extensions, family)
    }

    fn read_key_file(&self, path: &Path) -> Result<Vec<u8>, KeyFileError> {
        read_locked(path)
    }
}

/// Resolve `dir` to an absolute path and require that it is a directory.
pub fn sanitize_key_dir(dir: &Path) -> Result<PathBuf, String> {
    if dir.as_os_str().is_empty() {
        return Err("empty path".to_string());
    }

    let resolved = fs::canonicalize(dir).map_err(|e| format!("{}: {e}", dir.display()))?;
    if !resolved.is_dir() {
        return Err(format!("{} is not a directory", resolved.display()));
    }

    Ok(resolved)
}

/// List the direct children of `dir` that look like `family` key files,
/// sorted by path.
pub fn scan_key_dir(
    dir: &Path,
    extensions: &[String],
    family: SignatureType,
) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();

        if !is_regular_file(&entry) {
            debug!(path = %path.display(), "Skipping non-regular entry in key directory");
            continue;
        }

        let name = entry.file_name();
        if !has_accepted_extension(&name.to_string_lossy(), extensions) {
            continue;
        }

        match read_locked(&path) {
            Ok(bytes) if looks_like_key_file(family, &bytes) => found.push(path),
            Ok(_) => {
                debug!(path = %path.display(), family = %family, "File does not look like a key");
            }
            Err(e) => {
                debug!(
                    path = %path.display(),
                    kind = %e.kind(),
                    error = %e,
                    "Skipping key file during scan"
                );
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Regular files, and symlinks whose target is a regular file.
fn is_regular_file(entry: &fs::DirEntry) -> bool {
    match entry.file_type() {
        Ok(file_type) if file_type.is_file() => true,
        Ok(file_type) if file_type.is_symlink() => fs::metadata(entry.path())
            .map(|metadata| metadata.is_file())
            .unwrap_or(false),
        Ok(_) => false,
        Err(e) => {
            debug!(path = %entry.path().display(), error = %e, "Cannot determine entry type");
            false
        }
    }
}
