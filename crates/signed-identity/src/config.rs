//! Verifier configuration.
//!
//! Strength floors, key file extensions, the SSH signature namespace and the
//! default key directory. Values are fixed when the service is built and
//! threaded into each verifier; there is no process-wide state.
//!
//! # Example
//!
//! ```ignore
//! let config = VerifierConfig::default()
//!     .with_min_rsa_bits(3072)
//!     .with_key_dir("/etc/commit-keys");
//! config.validate()?;
//! ```

use crate::domain::admission::{KeyPolicy, DEFAULT_MIN_EC_BITS, DEFAULT_MIN_RSA_BITS};
use crate::domain::entities::SignatureType;
use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SSH_NAMESPACE: &str = "git";

/// Configuration for [`SignedIdentityService`](crate::SignedIdentityService).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Minimum RSA modulus length in bits (inclusive)
    pub min_rsa_bits: u32,
    /// Minimum elliptic-curve key size in bits (inclusive)
    pub min_ec_bits: u32,
    /// Key directory used by `verify_with_configured_dir`
    pub key_dir: Option<PathBuf>,
    /// File name suffixes scanned for OpenPGP keys
    pub gpg_extensions: Vec<String>,
    /// File name suffixes scanned for SSH keys
    pub ssh_extensions: Vec<String>,
    /// Namespace SSHSIG envelopes must carry
    pub ssh_namespace: String,
    /// Type assumed for signatures without a recognisable marker.
    /// `None` makes those fail with `UnknownSignatureType`.
    pub default_signature_type: Option<SignatureType>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            min_rsa_bits: DEFAULT_MIN_RSA_BITS,
            min_ec_bits: DEFAULT_MIN_EC_BITS,
            key_dir: None,
            gpg_extensions: vec![".gpg".into(), ".pub".into(), ".asc".into()],
            ssh_extensions: vec![".pub".into(), ".keys".into(), "allowed_signers".into()],
            ssh_namespace: DEFAULT_SSH_NAMESPACE.to_string(),
            default_signature_type: Some(SignatureType::Gpg),
        }
    }
}

impl VerifierConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SIGNED_IDENTITY_MIN_RSA_BITS`: RSA floor (default: 2048)
    /// - `SIGNED_IDENTITY_MIN_EC_BITS`: EC floor (default: 256)
    /// - `SIGNED_IDENTITY_KEY_DIR`: default key directory (default: none)
    /// - `SIGNED_IDENTITY_SSH_NAMESPACE`: SSHSIG namespace (default: git)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_rsa_bits: env::var("SIGNED_IDENTITY_MIN_RSA_BITS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.min_rsa_bits),

            min_ec_bits: env::var("SIGNED_IDENTITY_MIN_EC_BITS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.min_ec_bits),

            key_dir: env::var_os("SIGNED_IDENTITY_KEY_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),

            ssh_namespace: env::var("SIGNED_IDENTITY_SSH_NAMESPACE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.ssh_namespace),

            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_rsa_bits == 0 {
            return Err(ConfigError::ZeroStrengthFloor { family: "RSA" });
        }
        if self.min_ec_bits == 0 {
            return Err(ConfigError::ZeroStrengthFloor { family: "EC" });
        }

        if self.gpg_extensions.iter().all(|ext| ext.is_empty()) {
            return Err(ConfigError::NoExtensions {
                family: SignatureType::Gpg,
            });
        }
        if self.ssh_extensions.iter().all(|ext| ext.is_empty()) {
            return Err(ConfigError::NoExtensions {
                family: SignatureType::Ssh,
            });
        }

        if self.ssh_namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }

        Ok(())
    }

    /// Strength floors as a key policy.
    pub fn key_policy(&self) -> KeyPolicy {
        KeyPolicy::new(self.min_rsa_bits, self.min_ec_bits)
    }

    /// Extensions scanned for `family`.
    pub fn extensions_for(&self, family: SignatureType) -> &[String] {
        match family {
            SignatureType::Gpg => &self.gpg_extensions,
            SignatureType::Ssh => &self.ssh_extensions,
        }
    }

    pub fn with_min_rsa_bits(mut self, bits: u32) -> Self {
        self.min_rsa_bits = bits;
        self
    }

    pub fn with_min_ec_bits(mut self, bits: u32) -> Self {
        self.min_ec_bits = bits;
        self
    }

    pub fn with_key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(dir.into());
        self
    }

    pub fn with_gpg_extensions(mut self, extensions: Vec<String>) -> Self {
        self.gpg_extensions = extensions;
        self
    }

    pub fn with_ssh_extensions(mut self, extensions: Vec<String>) -> Self {
        self.ssh_extensions = extensions;
        self
    }

    pub fn with_ssh_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.ssh_namespace = namespace.into();
        self
    }

    pub fn with_default_signature_type(mut self, default: Option<SignatureType>) -> Self {
        self.default_signature_type = default;
        self
    }
}
