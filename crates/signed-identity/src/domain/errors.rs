//! # Verification Errors
//!
//! Error types for commit signature verification.
//!
//! Terminal failures of a verification call are [`VerificationError`]s. Each
//! one maps onto a [`FailureKind`] so callers can branch on the category
//! without matching on message text. Failures tied to a single key file are
//! [`KeyFileError`]s; those are recovered locally by skipping the file.

use super::entities::SignatureType;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Empty signature, empty or unusable key directory, malformed wrapper
    InvalidInput,
    /// The key directory holds no admissible key files
    NoKeysFound,
    /// A key file could not be decoded (per-file, non-fatal)
    ParseFailure,
    /// A key file was locked by another process (per-file, non-fatal)
    LockContention,
    /// Every admissible candidate was tried and none matched
    Untrusted,
    /// The signature could not be classified and no default applies
    UnknownSignatureType,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidInput => "invalid input",
            FailureKind::NoKeysFound => "no keys found",
            FailureKind::ParseFailure => "parse failure",
            FailureKind::LockContention => "lock contention",
            FailureKind::Untrusted => "untrusted",
            FailureKind::UnknownSignatureType => "unknown signature type",
        };
        f.write_str(name)
    }
}

/// Terminal failure of one verification call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// No key directory was configured or passed in
    #[error("no key directory provided")]
    MissingKeyDirectory,

    /// The key directory does not resolve to an existing directory
    #[error("invalid key directory: {reason}")]
    InvalidKeyDirectory { path: PathBuf, reason: String },

    /// The commit carries no signature
    #[error("no signature provided")]
    MissingSignature,

    /// The signature wrapper could not be decoded
    #[error("invalid {signature_type} signature format: {reason}")]
    MalformedSignature {
        signature_type: SignatureType,
        reason: String,
    },

    /// Listing the key directory failed
    #[error("failed to find {family} keys: {reason}")]
    KeyDiscovery {
        family: SignatureType,
        dir: PathBuf,
        reason: String,
    },

    /// The key directory holds no candidate key files for this family
    #[error("no {family} key files found in {}", dir.display())]
    NoKeysFound { family: SignatureType, dir: PathBuf },

    /// No admissible key verified the signature
    #[error("{family} signature not verified with any trusted key")]
    Untrusted {
        family: SignatureType,
        candidates_tried: usize,
    },

    /// The signature matched no known structure and no default is configured
    #[error("unknown signature type")]
    UnknownSignatureType,
}

impl VerificationError {
    /// Failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            VerificationError::MissingKeyDirectory
            | VerificationError::InvalidKeyDirectory { .. }
            | VerificationError::MissingSignature
            | VerificationError::MalformedSignature { .. }
            | VerificationError::KeyDiscovery { .. } => FailureKind::InvalidInput,
            VerificationError::NoKeysFound { .. } => FailureKind::NoKeysFound,
            VerificationError::Untrusted { .. } => FailureKind::Untrusted,
            VerificationError::UnknownSignatureType => FailureKind::UnknownSignatureType,
        }
    }
}

/// Failure reading or decoding a single key file.
///
/// Never terminal: the verifier logs it and moves on to the next file.
#[derive(Debug, Error)]
pub enum KeyFileError {
    /// Another process holds the advisory lock
    #[error("file {} is currently locked by another process", path.display())]
    Locked { path: PathBuf },

    /// The advisory lock could not be taken for a reason other than contention
    #[error("failed to lock file {}: {source}", path.display())]
    LockFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be opened or read
    #[error("file {} could not be read: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file contents did not decode into any key
    #[error("file {} could not be parsed: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

impl KeyFileError {
    /// Failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            KeyFileError::Locked { .. } | KeyFileError::LockFailed { .. } => {
                FailureKind::LockContention
            }
            KeyFileError::Read { .. } | KeyFileError::Parse { .. } => FailureKind::ParseFailure,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A minimum bit length of zero would admit any key
    #[error("minimum {family} bit length must be greater than zero")]
    ZeroStrengthFloor { family: &'static str },

    /// A key family has no file extensions to scan for
    #[error("no file extensions configured for {family} keys")]
    NoExtensions { family: SignatureType },

    /// The SSH signature namespace is empty
    #[error("SSH signature namespace must not be empty")]
    EmptyNamespace,
}
