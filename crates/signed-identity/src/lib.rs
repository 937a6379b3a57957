//! # Signed Identity
//!
//! Commit signature trust verification: given a commit's canonical bytes, its
//! signature and a directory of trusted keys, decide whether the signature is
//! valid and made by an admissible key, and report who made it.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Signature detection, key parsing,
//!   admissibility and cryptographic checks, no I/O
//! - **Ports Layer** (`ports/`): The rule-engine API and the key store / clock
//!   the service depends on
//! - **Adapters Layer** (`adapters/`): Filesystem key store and system clock
//! - **Verifiers** (`verifier/`): One strategy per signature type
//! - **Service Layer** (`service.rs`): Validates input and dispatches
//!
//! ## Trust Rules
//!
//! - Only direct children of the key directory are read, each under an
//!   exclusive advisory lock that is never waited on
//! - Revoked keys, keys whose primary key has expired and keys below the
//!   configured strength floors are never tried
//! - The first admissible key that verifies wins

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod verifier;

// Re-export public API
pub use adapters::{FileSystemKeyStore, SystemTimeSource};
pub use config::VerifierConfig;
pub use domain::admission::KeyPolicy;
pub use domain::detect::detect_signature_type;
pub use domain::entities::{
    DetectedType, KeyAlgorithm, KeyCandidate, SignatureEnvelope, SignatureType, SignedIdentity,
    VerificationOutcome, VerifiedSignature,
};
pub use domain::errors::{ConfigError, FailureKind, KeyFileError, VerificationError};
pub use ports::inbound::SignedIdentityApi;
pub use ports::outbound::{KeyStore, TimeSource};
pub use service::SignedIdentityService;
pub use verifier::SignatureVerifier;
