//! # Verification Strategies
//!
//! One strategy per signature type behind [`SignatureVerifier`]. Both share
//! the candidate loop in [`first_match`]:
//!
//! 1. discover candidate files; none at all is `NoKeysFound`
//! 2. read and parse each file, skipping files that are locked or malformed
//! 3. skip keys that are not admissible right now
//! 4. return the first key whose signature check passes
//!
//! Exhausting every candidate is `Untrusted`.

mod gpg;
mod ssh;

pub use gpg::GpgVerifier;
pub use ssh::SshVerifier;

use crate::domain::admission::KeyPolicy;
use crate::domain::entities::{SignatureType, TrustedKey, VerifiedSignature};
use crate::domain::errors::{KeyFileError, VerificationError};
use crate::ports::outbound::KeyStore;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};

/// Verification strategy for one signature type.
pub trait SignatureVerifier: Send + Sync {
    fn signature_type(&self) -> SignatureType;

    /// Verify `signature` over `commit` against the keys in the already
    /// resolved `key_dir`.
    fn verify(
        &self,
        commit: &[u8],
        signature: &str,
        key_dir: &Path,
    ) -> Result<VerifiedSignature, VerificationError>;
}

/// Fixed inputs of one candidate search.
pub(crate) struct SearchScope<'a> {
    pub family: SignatureType,
    pub extensions: &'a [String],
    pub policy: KeyPolicy,
    pub now: SystemTime,
}

/// Try every admissible key in discovery order and return the first match.
pub(crate) fn first_match<S, M, P, C>(
    store: &S,
    scope: &SearchScope<'_>,
    key_dir: &Path,
    mut parse: P,
    mut check: C,
) -> Result<VerifiedSignature, VerificationError>
where
    S: KeyStore + ?Sized,
    P: FnMut(&[u8], &Path) -> Result<Vec<TrustedKey<M>>, KeyFileError>,
    C: FnMut(&TrustedKey<M>) -> Result<(), String>,
{
    let family = scope.family;

    let files = store
        .find_key_files(key_dir, scope.extensions, family)
        .map_err(|e| VerificationError::KeyDiscovery {
            family,
            dir: key_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

    if files.is_empty() {
        return Err(VerificationError::NoKeysFound {
            family,
            dir: key_dir.to_path_buf(),
        });
    }

    let mut candidates_tried = 0;

    for path in &files {
        let keys = match store
            .read_key_file(path)
            .and_then(|bytes| parse(bytes.as_slice(), path.as_path()))
        {
            Ok(keys) => keys,
            Err(e) => {
                debug!(
                    path = %path.display(),
                    kind = %e.kind(),
                    error = %e,
                    "Skipping key file"
                );
                continue;
            }
        };

        for key in &keys {
            if let Err(reason) = scope.policy.admit(&key.candidate, scope.now) {
                debug!(
                    path = %path.display(),
                    identity = %key.candidate.identity(),
                    reason = %reason,
                    "Skipping inadmissible key"
                );
                continue;
            }

            candidates_tried += 1;
            match check(key) {
                Ok(()) => {
                    let identity = key.candidate.identity();
                    info!(
                        identity = %identity,
                        signature_type = %family,
                        path = %path.display(),
                        "Commit signature verified"
                    );
                    return Ok(VerifiedSignature {
                        identity,
                        signature_type: family,
                        source_path: path.clone(),
                    });
                }
                Err(reason) => {
                    debug!(
                        path = %path.display(),
                        identity = %key.candidate.identity(),
                        reason = %reason,
                        "Key did not verify signature"
                    );
                }
            }
        }
    }

    Err(VerificationError::Untrusted {
        family,
        candidates_tried,
    })
}
