//! # Signed Identity Service
//!
//! Application service implementing [`SignedIdentityApi`].
//!
//! ## Flow
//!
//! 1. reject an empty key directory, then resolve it through the key store
//! 2. reject an empty signature
//! 3. classify the signature, applying the configured default for
//!    unrecognised structures
//! 4. dispatch to the GPG or SSH verifier
//!
//! Every failure is terminal and reported once; nothing is cached between
//! calls.

use crate::adapters::{FileSystemKeyStore, SystemTimeSource};
use crate::config::VerifierConfig;
use crate::domain::entities::{
    SignatureEnvelope, SignatureType, VerificationOutcome, VerifiedSignature,
};
use crate::domain::errors::{ConfigError, VerificationError};
use crate::ports::inbound::SignedIdentityApi;
use crate::ports::outbound::{KeyStore, TimeSource};
use crate::verifier::{GpgVerifier, SignatureVerifier, SshVerifier};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Commit signature verification service.
pub struct SignedIdentityService<S, T> {
    config: VerifierConfig,
    store: Arc<S>,
    gpg: GpgVerifier<S, T>,
    ssh: SshVerifier<S, T>,
}

impl SignedIdentityService<FileSystemKeyStore, SystemTimeSource> {
    /// Service reading keys from disk and checking validity against the
    /// system clock.
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        Self::with_adapters(config, FileSystemKeyStore, SystemTimeSource)
    }
}

impl<S: KeyStore, T: TimeSource> SignedIdentityService<S, T> {
    pub fn with_adapters(config: VerifierConfig, store: S, clock: T) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = Arc::new(store);
        let clock = Arc::new(clock);
        let policy = config.key_policy();

        let gpg = GpgVerifier::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            policy,
            config.extensions_for(SignatureType::Gpg).to_vec(),
        );
        let ssh = SshVerifier::new(
            Arc::clone(&store),
            clock,
            policy,
            config.extensions_for(SignatureType::Ssh).to_vec(),
            config.ssh_namespace.clone(),
        );

        Ok(Self {
            config,
            store,
            gpg,
            ssh,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify and return the full match, including the key file it came from.
    pub fn verify(
        &self,
        commit: &[u8],
        signature: &str,
        key_dir: &Path,
    ) -> Result<VerifiedSignature, VerificationError> {
        if key_dir.as_os_str().is_empty() {
            return Err(VerificationError::MissingKeyDirectory);
        }
        let key_dir = self.store.resolve_dir(key_dir).map_err(|reason| {
            VerificationError::InvalidKeyDirectory {
                path: key_dir.to_path_buf(),
                reason,
            }
        })?;

        let envelope = SignatureEnvelope::new(signature);
        if envelope.is_empty() {
            return Err(VerificationError::MissingSignature);
        }

        let signature_type = envelope
            .detected_type()
            .or_default(self.config.default_signature_type)
            .ok_or(VerificationError::UnknownSignatureType)?;

        let verifier = self.verifier(signature_type);
        debug!(
            detected = ?envelope.detected_type(),
            signature_type = %verifier.signature_type(),
            key_dir = %key_dir.display(),
            "Dispatching commit signature"
        );
        verifier.verify(commit, envelope.as_str(), &key_dir)
    }

    /// Verify against the configured `key_dir`.
    pub fn verify_with_configured_dir(&self, commit: &[u8], signature: &str) -> VerificationOutcome {
        match &self.config().key_dir {
            Some(dir) => self.verify_commit_signature(commit, signature, dir),
            None => report(Err(VerificationError::MissingKeyDirectory)),
        }
    }

    fn verifier(&self, signature_type: SignatureType) -> &dyn SignatureVerifier {
        match signature_type {
            SignatureType::Gpg => &self.gpg,
            SignatureType::Ssh => &self.ssh,
        }
    }
}

impl<S: KeyStore, T: TimeSource> SignedIdentityApi for SignedIdentityService<S, T> {
    fn verify_commit_signature(
        &self,
        commit: &[u8],
        signature: &str,
        key_dir: &Path,
    ) -> VerificationOutcome {
        report(self.verify(commit, signature, key_dir))
    }
}

fn report(result: Result<VerifiedSignature, VerificationError>) -> VerificationOutcome {
    if let Err(e) = &result {
        warn!(kind = %e.kind(), error = %e, "Commit signature verification failed");
    }
    result.into()
}
