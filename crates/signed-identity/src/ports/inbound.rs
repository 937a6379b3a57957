//! # Inbound Ports (Driving Ports / API)
//!
//! The API exposed to the rule-aggregation engine.

use crate::domain::entities::{SignedIdentity, VerificationOutcome};
use std::path::Path;

/// Commit signature verification API.
///
/// Every call is self-contained: keys are discovered and parsed afresh, and
/// nothing is cached between calls. Implementations must be `Send + Sync`.
pub trait SignedIdentityApi: Send + Sync {
    /// Verify `signature` over the canonical `commit` bytes against the keys
    /// held directly in `key_dir`.
    ///
    /// # Failures
    /// * `InvalidInput` - empty or unusable key directory, empty signature,
    ///   malformed SSH wrapper
    /// * `NoKeysFound` - no candidate key files for the detected family
    /// * `Untrusted` - no admissible key verified the signature
    /// * `UnknownSignatureType` - unclassifiable signature with no default
    fn verify_commit_signature(
        &self,
        commit: &[u8],
        signature: &str,
        key_dir: &Path,
    ) -> VerificationOutcome;

    /// Same as [`verify_commit_signature`](Self::verify_commit_signature),
    /// shaped as the rule report.
    fn signed_identity(&self, commit: &[u8], signature: &str, key_dir: &Path) -> SignedIdentity {
        self.verify_commit_signature(commit, signature, key_dir)
            .into()
    }
}
