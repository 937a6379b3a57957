//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits for the key store and clock the verifiers depend on, plus
//! in-memory implementations for tests.

use crate::domain::detect::{has_accepted_extension, looks_like_key_file};
use crate::domain::entities::SignatureType;
use crate::domain::errors::KeyFileError;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Source of trusted key files.
pub trait KeyStore: Send + Sync {
    /// Resolve a caller-supplied key directory to an absolute, existing
    /// directory, or explain why it cannot be used.
    fn resolve_dir(&self, dir: &Path) -> Result<PathBuf, String>;

    /// List candidate key files of `family` directly inside `dir`.
    ///
    /// Only direct children are considered. Candidates are tried in the
    /// returned order; an empty list is not an error.
    fn find_key_files(
        &self,
        dir: &Path,
        extensions: &[String],
        family: SignatureType,
    ) -> io::Result<Vec<PathBuf>>;

    /// Read one key file under an exclusive advisory lock.
    fn read_key_file(&self, path: &Path) -> Result<Vec<u8>, KeyFileError>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// Time source pinned to a single instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedTimeSource(pub SystemTime);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// In-memory key store for unit tests.
///
/// Files live in a flat map keyed by full path. A path can be marked locked
/// to simulate a concurrent writer.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    dirs: HashSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    locked: HashSet<PathBuf>,
    reverse_listing: bool,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty directory.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.insert(dir.into());
        self
    }

    /// Add a file, registering its parent directory.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.dirs.insert(parent.to_path_buf());
        }
        self.files.insert(path, contents.into());
        self
    }

    /// Mark a file as held by another process.
    pub fn with_locked(mut self, path: impl Into<PathBuf>) -> Self {
        self.locked.insert(path.into());
        self
    }

    /// List files in reverse order, to check results do not depend on it.
    pub fn with_reverse_listing(mut self) -> Self {
        self.reverse_listing = true;
        self
    }
}

impl KeyStore for InMemoryKeyStore {
    fn resolve_dir(&self, dir: &Path) -> Result<PathBuf, String> {
        if self.dirs.contains(dir) {
            Ok(dir.to_path_buf())
        } else {
            Err(format!("{} is not a directory", dir.display()))
        }
    }

    fn find_key_files(
        &self,
        dir: &Path,
        extensions: &[String],
        family: SignatureType,
    ) -> io::Result<Vec<PathBuf>> {
        let mut found: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter(|(path, _)| {
                path.file_name()
                    .is_some_and(|name| has_accepted_extension(&name.to_string_lossy(), extensions))
            })
            .filter(|(path, bytes)| !self.locked.contains(*path) && looks_like_key_file(family, bytes))
            .map(|(path, _)| path.clone())
            .collect();

        if self.reverse_listing {
            found.reverse();
        }
        Ok(found)
    }

    fn read_key_file(&self, path: &Path) -> Result<Vec<u8>, KeyFileError> {
        if self.locked.contains(path) {
            return Err(KeyFileError::Locked {
                path: path.to_path_buf(),
            });
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| KeyFileError::Read {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
    }
}
