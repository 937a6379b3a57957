//! OpenPGP detached signatures.

use super::{first_match, SearchScope, SignatureVerifier};
use crate::domain::admission::KeyPolicy;
use crate::domain::entities::{SignatureType, VerifiedSignature};
use crate::domain::errors::VerificationError;
use crate::domain::gpg::{parse_gpg_keys, verify_detached, GpgKey};
use crate::ports::outbound::{KeyStore, TimeSource};
use sequoia_openpgp::policy::StandardPolicy;
use std::path::Path;
use std::sync::Arc;

/// Verifies armored OpenPGP detached signatures against `.gpg`/`.asc`/`.pub`
/// keyrings.
///
/// Keys and signatures are additionally held to sequoia's standard policy,
/// which rejects broken hash algorithms such as MD5 and SHA-1.
pub struct GpgVerifier<S, T> {
    store: Arc<S>,
    clock: Arc<T>,
    policy: KeyPolicy,
    extensions: Vec<String>,
}

impl<S: KeyStore, T: TimeSource> GpgVerifier<S, T> {
    pub fn new(store: Arc<S>, clock: Arc<T>, policy: KeyPolicy, extensions: Vec<String>) -> Self {
        Self {
            store,
            clock,
            policy,
            extensions,
        }
    }
}

impl<S: KeyStore, T: TimeSource> SignatureVerifier for GpgVerifier<S, T> {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Gpg
    }

    fn verify(
        &self,
        commit: &[u8],
        signature: &str,
        key_dir: &Path,
    ) -> Result<VerifiedSignature, VerificationError> {
        let openpgp_policy = StandardPolicy::new();
        let now = self.clock.now();
        let scope = SearchScope {
            family: self.signature_type(),
            extensions: &self.extensions,
            policy: self.policy,
            now,
        };

        first_match(
            self.store.as_ref(),
            &scope,
            key_dir,
            |bytes, path| parse_gpg_keys(bytes, path, &openpgp_policy, now),
            |key: &GpgKey| {
                verify_detached(
                    &key.material,
                    commit,
                    signature.as_bytes(),
                    &openpgp_policy,
                    now,
                )
            },
        )
    }
}
