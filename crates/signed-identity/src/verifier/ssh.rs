//! SSH signatures against `authorized_keys` / `allowed_signers` style files.

use super::{first_match, SearchScope, SignatureVerifier};
use crate::domain::admission::KeyPolicy;
use crate::domain::entities::{SignatureType, VerifiedSignature};
use crate::domain::errors::VerificationError;
use crate::domain::ssh::{parse_ssh_keys, parse_ssh_signature, SshKey};
use crate::ports::outbound::{KeyStore, TimeSource};
use std::path::Path;
use std::sync::Arc;

pub struct SshVerifier<S, T> {
    store: Arc<S>,
    clock: Arc<T>,
    policy: KeyPolicy,
    extensions: Vec<String>,
    namespace: String,
}

impl<S: KeyStore, T: TimeSource> SshVerifier<S, T> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<T>,
        policy: KeyPolicy,
        extensions: Vec<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            extensions,
            namespace: namespace.into(),
        }
    }
}

impl<S: KeyStore, T: TimeSource> SignatureVerifier for SshVerifier<S, T> {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Ssh
    }

    /// The signature wrapper is decoded before any key is read, so a
    /// malformed wrapper fails as invalid input rather than as untrusted.
    fn verify(
        &self,
        commit: &[u8],
        signature: &str,
        key_dir: &Path,
    ) -> Result<VerifiedSignature, VerificationError> {
        let parsed =
            parse_ssh_signature(signature).map_err(|e| VerificationError::MalformedSignature {
                signature_type: SignatureType::Ssh,
                reason: e.to_string(),
            })?;

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
            parse_ssh_keys,
            |key: &SshKey| {
                if key.candidate.created_at > now {
                    return Err("key is not yet valid".to_string());
                }
                parsed
                    .verify(&key.material, commit, &self.namespace)
                    .map_err(|e| e.to_string())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ssh::test_helpers::*;
    use crate::ports::outbound::{FixedTimeSource, InMemoryKeyStore};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const COMMIT: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\nInitial commit\n";

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn verifier(store: InMemoryKeyStore) -> SshVerifier<InMemoryKeyStore, FixedTimeSource> {
        SshVerifier::new(
            Arc::new(store),
            Arc::new(FixedTimeSource(now())),
            KeyPolicy::default(),
            vec![".pub".into(), "allowed_signers".into()],
            "git",
        )
    }

    #[test]
    fn test_raw_signature_with_comment_identity() {
        let key = ed25519_signing_key();
        let store = InMemoryKeyStore::new()
            .with_file("/keys/id_ed25519.pub", ed25519_key_line(&key, "ssh-key-user"));

        let verified = verifier(store)
            .verify(COMMIT, &ed25519_raw_signature(&key, COMMIT), Path::new("/keys"))
            .unwrap();
        assert_eq!(verified.identity, "ssh-key-user");
        assert_eq!(verified.signature_type, SignatureType::Ssh);
    }

    #[test]
    fn test_armored_sshsig_with_principal_identity() {
        let key = ed25519_signing_key();
        let other = ed25519_signing_key();
        let signers = format!(
            "bob@example.com {}\nalice@example.com {}\n",
            ed25519_key_line(&other, ""),
            ed25519_key_line(&key, "")
        );
        let store = InMemoryKeyStore::new().with_file("/keys/allowed_signers", signers);
        let signature = armor_sshsig(&ed25519_sshsig_blob(&key, COMMIT, "git"));

        let verified = verifier(store)
            .verify(COMMIT, &signature, Path::new("/keys"))
            .unwrap();
        assert_eq!(verified.identity, "alice@example.com");
    }

    #[test]
    fn test_wrong_namespace_is_untrusted() {
        let key = ed25519_signing_key();
        let store = InMemoryKeyStore::new()
            .with_file("/keys/id_ed25519.pub", ed25519_key_line(&key, "user"));
        let signature = armor_sshsig(&ed25519_sshsig_blob(&key, COMMIT, "file"));

        let err = verifier(store)
            .verify(COMMIT, &signature, Path::new("/keys"))
            .unwrap_err();
        assert!(matches!(err, VerificationError::Untrusted { .. }));
    }

    #[test]
    fn test_expired_key_not_tried() {
        let key = ed25519_signing_key();
        let line = format!(
            "valid-before=\"20200101\" {}",
            ed25519_key_line(&key, "expired")
        );
        let store = InMemoryKeyStore::new().with_file("/keys/id_ed25519.pub", line);

        let err = verifier(store)
            .verify(COMMIT, &ed25519_raw_signature(&key, COMMIT), Path::new("/keys"))
            .unwrap_err();
        assert_eq!(
            err,
            VerificationError::Untrusted {
                family: SignatureType::Ssh,
                candidates_tried: 0,
            }
        );
    }

    #[test]
    fn test_not_yet_valid_key_rejected() {
        let key = ed25519_signing_key();
        let line = format!(
            "valid-after=\"20400101\" {}",
            ed25519_key_line(&key, "future")
        );
        let store = InMemoryKeyStore::new().with_file("/keys/id_ed25519.pub", line);

        let err = verifier(store)
            .verify(COMMIT, &ed25519_raw_signature(&key, COMMIT), Path::new("/keys"))
            .unwrap_err();
        assert!(matches!(err, VerificationError::Untrusted { .. }));
    }

    #[test]
    fn test_malformed_wrapper_is_invalid_input() {
        let store = InMemoryKeyStore::new().with_dir("/keys");
        let err = verifier(store)
            .verify(COMMIT, "ssh-ed25519:!!!", Path::new("/keys"))
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::MalformedSignature {
                signature_type: SignatureType::Ssh,
                ..
            }
        ));
    }
}
