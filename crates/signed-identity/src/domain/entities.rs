//! # Domain Entities
//!
//! Core data structures for commit signature verification.

use super::errors::VerificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// =============================================================================
// Signature Types
// =============================================================================

/// Signature format, also used as the key family tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignatureType {
    /// OpenPGP detached signature
    Gpg,
    /// SSH signature
    Ssh,
}

impl SignatureType {
    /// Tag as reported to the rule engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureType::Gpg => "GPG",
            SignatureType::Ssh => "SSH",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw structural classification of a signature blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectedType {
    Gpg,
    Ssh,
    /// No structural marker matched
    Unknown,
}

impl DetectedType {
    /// Resolve to a concrete type, falling back to `default` for `Unknown`.
    pub fn or_default(self, default: Option<SignatureType>) -> Option<SignatureType> {
        match self {
            DetectedType::Gpg => Some(SignatureType::Gpg),
            DetectedType::Ssh => Some(SignatureType::Ssh),
            DetectedType::Unknown => default,
        }
    }
}

/// A signature as stored on the commit, classified once on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureEnvelope {
    raw: String,
    detected_type: DetectedType,
}

impl SignatureEnvelope {
    /// Wrap a signature and classify it by its structural markers.
    pub fn new(signature: impl Into<String>) -> Self {
        let raw = signature.into();
        let detected_type = super::detect::classify(&raw);
        Self { raw, detected_type }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn detected_type(&self) -> DetectedType {
        self.detected_type
    }

    /// True when the signature holds nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

// =============================================================================
// Key Candidates
// =============================================================================

/// Public key algorithm of a candidate's primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
    ElGamal,
    Ecdsa,
    EdDsa,
    Ecdh,
    Unknown,
}

/// Strength class an algorithm is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmFamily {
    Rsa,
    EllipticCurve,
    Other,
}

impl KeyAlgorithm {
    pub fn family(&self) -> AlgorithmFamily {
        match self {
            KeyAlgorithm::Rsa => AlgorithmFamily::Rsa,
            KeyAlgorithm::Ecdsa | KeyAlgorithm::EdDsa | KeyAlgorithm::Ecdh => {
                AlgorithmFamily::EllipticCurve
            }
            KeyAlgorithm::Dsa | KeyAlgorithm::ElGamal | KeyAlgorithm::Unknown => {
                AlgorithmFamily::Other
            }
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Dsa => "DSA",
            KeyAlgorithm::ElGamal => "ElGamal",
            KeyAlgorithm::Ecdsa => "ECDSA",
            KeyAlgorithm::EdDsa => "EdDSA",
            KeyAlgorithm::Ecdh => "ECDH",
            KeyAlgorithm::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Validity of one subkey bound to a primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubkeyValidity {
    /// `None` means the subkey never expires
    pub expires_at: Option<SystemTime>,
    /// Whether the binding flags the subkey as signing-capable
    pub can_sign: bool,
}

/// Attributes of one parsed key entity that admissibility is decided on.
///
/// A keyring file may produce several of these. They are never mutated
/// after parsing and never outlive the verification pass that made them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCandidate {
    /// File the entity was read from
    pub source_path: PathBuf,
    /// Identity bindings, primary identity first
    pub identities: Vec<String>,
    pub algorithm: KeyAlgorithm,
    /// `None` when the bit length could not be determined
    pub bit_strength: Option<u32>,
    pub created_at: SystemTime,
    /// Expiry derived from the primary key's self-signature
    pub primary_expiry: Option<SystemTime>,
    /// Whether the primary key itself may make signatures
    pub primary_can_sign: bool,
    /// Subkeys in binding order
    pub subkeys: Vec<SubkeyValidity>,
    pub revoked: bool,
}

impl KeyCandidate {
    /// Identity reported on a successful match.
    ///
    /// The primary identity binding, or the source file's base name when the
    /// entity carries no identity at all.
    pub fn identity(&self) -> String {
        self.identities
            .first()
            .cloned()
            .unwrap_or_else(|| file_base_name(&self.source_path))
    }
}

pub(crate) fn file_base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A candidate together with the public material used to check signatures.
#[derive(Clone, Debug)]
pub struct TrustedKey<M> {
    pub candidate: KeyCandidate,
    pub material: M,
}

// =============================================================================
// Verification Results
// =============================================================================

/// A signature that verified against a trusted key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSignature {
    pub identity: String,
    pub signature_type: SignatureType,
    /// Key file holding the matching key
    pub source_path: PathBuf,
}

/// Terminal result of one verification call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified {
        identity: String,
        signature_type: SignatureType,
    },
    Failed {
        reason: VerificationError,
    },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }

    /// The failure, if verification did not succeed.
    pub fn failure(&self) -> Option<&VerificationError> {
        match self {
            VerificationOutcome::Verified { .. } => None,
            VerificationOutcome::Failed { reason } => Some(reason),
        }
    }
}

impl From<Result<VerifiedSignature, VerificationError>> for VerificationOutcome {
    fn from(result: Result<VerifiedSignature, VerificationError>) -> Self {
        match result {
            Ok(verified) => VerificationOutcome::Verified {
                identity: verified.identity,
                signature_type: verified.signature_type,
            },
            Err(reason) => VerificationOutcome::Failed { reason },
        }
    }
}

/// Signed identity report handed to the rule engine.
///
/// Either a signer identity plus signature type, or a list of errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignedIdentity {
    identity: Option<String>,
    signature_type: Option<SignatureType>,
    errors: Vec<VerificationError>,
}

impl SignedIdentity {
    pub const NAME: &'static str = "SignedIdentityRule";

    /// Rule identifier.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Human-readable result: the first error, or who signed and how.
    pub fn result(&self) -> String {
        if let Some(error) = self.errors.first() {
            return error.to_string();
        }

        match (&self.identity, self.signature_type) {
            (Some(identity), Some(signature_type)) => {
                format!("Signed by {identity:?} using {signature_type}")
            }
            _ => "No signature verified".to_string(),
        }
    }

    pub fn errors(&self) -> &[VerificationError] {
        &self.errors
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn signature_type(&self) -> Option<SignatureType> {
        self.signature_type
    }
}

impl From<VerificationOutcome> for SignedIdentity {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Verified {
                identity,
                signature_type,
            } => Self {
                identity: Some(identity),
                signature_type: Some(signature_type),
                errors: Vec::new(),
            },
            VerificationOutcome::Failed { reason } => Self {
                identity: None,
                signature_type: None,
                errors: vec![reason],
            },
        }
    }
}
