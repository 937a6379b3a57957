//! # Key Admissibility
//!
//! Decides whether a parsed key may be used to attempt verification.
//!
//! Three independent gates, all of which must pass:
//! - **Not revoked**: any revocation on the primary key or on an identity
//!   binding disqualifies the whole entity
//! - **Not expired**: the primary key must be alive, and either the primary
//!   key signs or some signing-capable subkey is alive
//! - **Minimum strength**: RSA against the RSA floor, elliptic curves against
//!   the EC floor, everything else rejected

use super::entities::{AlgorithmFamily, KeyAlgorithm, KeyCandidate};
use std::time::SystemTime;
use thiserror::Error;

/// Default RSA floor in bits.
pub const DEFAULT_MIN_RSA_BITS: u32 = 2048;

/// Default elliptic-curve floor in bits.
pub const DEFAULT_MIN_EC_BITS: u32 = 256;

/// Strength assumed for Ed25519 when the key cannot report its size.
pub const ED25519_BITS: u32 = 256;

/// Why a candidate was not admitted.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Inadmissible {
    #[error("key is revoked")]
    Revoked,

    #[error("primary key is expired")]
    Expired,

    #[error("no unexpired signing-capable key")]
    NoSigningKey,

    #[error("{algorithm} key below minimum strength ({bits:?} bits)")]
    TooWeak {
        algorithm: KeyAlgorithm,
        bits: Option<u32>,
    },
}

/// Strength floors applied to every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub min_rsa_bits: u32,
    pub min_ec_bits: u32,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            min_rsa_bits: DEFAULT_MIN_RSA_BITS,
            min_ec_bits: DEFAULT_MIN_EC_BITS,
        }
    }
}

impl KeyPolicy {
    pub fn new(min_rsa_bits: u32, min_ec_bits: u32) -> Self {
        Self {
            min_rsa_bits,
            min_ec_bits,
        }
    }

    /// Run all three gates, reporting the first that fails.
    pub fn admit(&self, candidate: &KeyCandidate, now: SystemTime) -> Result<(), Inadmissible> {
        if is_revoked(candidate) {
            return Err(Inadmissible::Revoked);
        }

        if is_primary_expired(candidate, now) {
            return Err(Inadmissible::Expired);
        }

        if !has_live_signing_key(candidate, now) {
            return Err(Inadmissible::NoSigningKey);
        }

        if !self.has_minimum_strength(candidate) {
            return Err(Inadmissible::TooWeak {
                algorithm: candidate.algorithm,
                bits: candidate.bit_strength,
            });
        }

        Ok(())
    }

    pub fn is_admissible(&self, candidate: &KeyCandidate, now: SystemTime) -> bool {
        self.admit(candidate, now).is_ok()
    }

    /// Check the primary key's algorithm and size against the floors.
    ///
    /// An RSA key whose size cannot be determined is rejected. An EC key
    /// whose size cannot be determined only passes if it is EdDSA, which is
    /// taken to be Ed25519.
    pub fn has_minimum_strength(&self, candidate: &KeyCandidate) -> bool {
        match candidate.algorithm.family() {
            AlgorithmFamily::Rsa => candidate
                .bit_strength
                .is_some_and(|bits| bits >= self.min_rsa_bits),
            AlgorithmFamily::EllipticCurve => match candidate.bit_strength {
                Some(bits) => bits >= self.min_ec_bits,
                None if candidate.algorithm == KeyAlgorithm::EdDsa => {
                    ED25519_BITS >= self.min_ec_bits
                }
                None => false,
            },
            AlgorithmFamily::Other => false,
        }
    }
}

/// Whether the entity carries any revocation.
pub fn is_revoked(candidate: &KeyCandidate) -> bool {
    candidate.revoked
}

/// Whether the primary key, or every signing path of the entity, has expired.
///
/// Primary expiry is decisive: a live signing subkey does not rescue an
/// expired primary key.
pub fn is_expired(candidate: &KeyCandidate, now: SystemTime) -> bool {
    is_primary_expired(candidate, now) || !has_live_signing_key(candidate, now)
}

fn is_primary_expired(candidate: &KeyCandidate, now: SystemTime) -> bool {
    candidate
        .primary_expiry
        .is_some_and(|expiry| now > expiry)
}

fn has_live_signing_key(candidate: &KeyCandidate, now: SystemTime) -> bool {
    candidate.primary_can_sign
        || candidate
            .subkeys
            .iter()
            .filter(|subkey| subkey.can_sign)
            .any(|subkey| subkey.expires_at.map_or(true, |expiry| now <= expiry))
}
