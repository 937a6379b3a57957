//! # SSH Keys and Signatures
//!
//! SSH public keys as found in `authorized_keys`, `.pub` and
//! `allowed_signers` files, and SSH commit signatures in either the
//! `<algorithm>:<base64>` form or as an armored SSHSIG block.
//!
//! Supported algorithms:
//! - `ssh-ed25519` (Ed25519)
//! - `ecdsa-sha2-nistp256` (P-256 with SHA-256)
//! - `ssh-rsa` keys with `rsa-sha2-256` / `rsa-sha2-512` signatures
//!
//! SHA-1 `ssh-rsa` signatures are refused.

mod keys;
mod signature;
pub(crate) mod wire;

pub use keys::{looks_like_ssh_key, parse_ssh_keys, SshKey, SshKeyMaterial};
pub use signature::{
    parse_ssh_signature, RawSignature, SshHashAlgorithm, SshPayload, SshSigEnvelope,
    SshSignature,
};

use super::entities::KeyAlgorithm;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use thiserror::Error;
use wire::WireReader;

pub const SSH_ED25519: &str = "ssh-ed25519";
pub const SSH_RSA: &str = "ssh-rsa";
pub const ECDSA_NISTP256: &str = "ecdsa-sha2-nistp256";
pub const RSA_SHA2_256: &str = "rsa-sha2-256";
pub const RSA_SHA2_512: &str = "rsa-sha2-512";

/// Key types recognised in key files, supported or not.
pub const KEY_TYPES: [&str; 8] = [
    SSH_ED25519,
    SSH_RSA,
    ECDSA_NISTP256,
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "ssh-dss",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

/// Largest RSA modulus accepted from a key file.
const MAX_RSA_BITS: usize = 16_384;

/// Errors decoding or checking SSH material.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SshError {
    #[error("truncated SSH wire data")]
    Truncated,

    #[error("malformed SSH data: {0}")]
    Malformed(String),

    #[error("unsupported SSH algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature algorithm {signature} cannot be checked with a {key} key")]
    AlgorithmMismatch {
        signature: String,
        key: &'static str,
    },

    #[error("SHA-1 ssh-rsa signatures are not accepted")]
    WeakHash,

    #[error("signature was made by a different key")]
    KeyMismatch,

    #[error("signature namespace {found:?} does not match {expected:?}")]
    NamespaceMismatch { expected: String, found: String },

    #[error("key is not allowed to sign in namespace {0:?}")]
    NamespaceNotAllowed(String),

    #[error("signature does not verify")]
    BadSignature,
}

/// Key type a signature algorithm is checked with.
pub fn key_type_for_signature(algorithm: &str) -> &str {
    match algorithm {
        RSA_SHA2_256 | RSA_SHA2_512 => SSH_RSA,
        other => other,
    }
}

/// Whether `tag` names an SSH key type or signature algorithm.
pub fn is_known_algorithm(tag: &str) -> bool {
    KEY_TYPES.contains(&tag) || tag == RSA_SHA2_256 || tag == RSA_SHA2_512
}

/// Decoded SSH public key.
#[derive(Clone, Debug)]
pub enum SshPublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
    Rsa(RsaPublicKey),
}

impl SshPublicKey {
    /// Decode a wire-format public key blob.
    pub fn from_blob(blob: &[u8]) -> Result<Self, SshError> {
        let mut reader = WireReader::new(blob);
        let key_type = reader.read_str()?;

        let key = match key_type {
            SSH_ED25519 => {
                let bytes: [u8; 32] = reader
                    .read_string()?
                    .try_into()
                    .map_err(|_| SshError::Malformed("ed25519 key must be 32 bytes".into()))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map_err(|_| SshError::Malformed("invalid ed25519 point".into()))?;
                SshPublicKey::Ed25519(key)
            }
            ECDSA_NISTP256 => {
                let curve = reader.read_str()?;
                if curve != "nistp256" {
                    return Err(SshError::Malformed(format!(
                        "curve {curve} does not match {ECDSA_NISTP256}"
                    )));
                }
                let point = reader.read_string()?;
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                    .map_err(|_| SshError::Malformed("invalid nistp256 point".into()))?;
                SshPublicKey::EcdsaP256(key)
            }
            SSH_RSA => {
                let e = reader.read_mpint()?;
                let n = reader.read_mpint()?;
                let key = RsaPublicKey::new_with_max_size(
                    BigUint::from_bytes_be(n),
                    BigUint::from_bytes_be(e),
                    MAX_RSA_BITS,
                )
                .map_err(|e| SshError::Malformed(format!("invalid RSA key: {e}")))?;
                SshPublicKey::Rsa(key)
            }
            other => return Err(SshError::UnsupportedAlgorithm(other.to_string())),
        };

        reader.finish()?;
        Ok(key)
    }

    pub fn key_type(&self) -> &'static str {
        match self {
            SshPublicKey::Ed25519(_) => SSH_ED25519,
            SshPublicKey::EcdsaP256(_) => ECDSA_NISTP256,
            SshPublicKey::Rsa(_) => SSH_RSA,
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            SshPublicKey::Ed25519(_) => KeyAlgorithm::EdDsa,
            SshPublicKey::EcdsaP256(_) => KeyAlgorithm::Ecdsa,
            SshPublicKey::Rsa(_) => KeyAlgorithm::Rsa,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            SshPublicKey::Ed25519(_) | SshPublicKey::EcdsaP256(_) => 256,
            SshPublicKey::Rsa(key) => key.n().bits() as u32,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::wire::{put_mpint, put_string};
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use ed25519_dalek::Signer as _;
    use rand::rngs::OsRng;
    use sha2::{Digest, Sha512};

    pub fn ed25519_signing_key() -> ed25519_dalek::SigningKey {
        ed25519_dalek::SigningKey::generate(&mut OsRng)
    }

    pub fn ed25519_public_blob(key: &ed25519_dalek::SigningKey) -> Vec<u8> {
        let mut blob = Vec::new();
        put_string(&mut blob, SSH_ED25519.as_bytes());
        put_string(&mut blob, key.verifying_key().as_bytes());
        blob
    }

    /// `authorized_keys` style line for `key`.
    pub fn ed25519_key_line(key: &ed25519_dalek::SigningKey, comment: &str) -> String {
        format!(
            "{SSH_ED25519} {} {comment}",
            STANDARD.encode(ed25519_public_blob(key))
        )
    }

    pub fn raw_signature_blob(algorithm: &str, signature: &[u8]) -> Vec<u8> {
        let mut blob = Vec::new();
        put_string(&mut blob, algorithm.as_bytes());
        put_string(&mut blob, signature);
        blob
    }

    /// Raw Ed25519 signature over `message`, in `<algorithm>:<base64>` form.
    pub fn ed25519_raw_signature(key: &ed25519_dalek::SigningKey, message: &[u8]) -> String {
        let signature = key.sign(message);
        let blob = raw_signature_blob(SSH_ED25519, &signature.to_bytes());
        format!("{SSH_ED25519}:{}", STANDARD.encode(blob))
    }

    /// SSHSIG envelope over `message`, signed with SHA-512 like `ssh-keygen -Y sign`.
    pub fn ed25519_sshsig_blob(
        key: &ed25519_dalek::SigningKey,
        message: &[u8],
        namespace: &str,
    ) -> Vec<u8> {
        let digest = Sha512::digest(message);
        let mut preimage = Vec::new();
        preimage.extend_from_slice(b"SSHSIG");
        put_string(&mut preimage, namespace.as_bytes());
        put_string(&mut preimage, b"");
        put_string(&mut preimage, b"sha512");
        put_string(&mut preimage, &digest);

        let signature = key.sign(&preimage);

        let mut blob = Vec::new();
        blob.extend_from_slice(b"SSHSIG");
        blob.extend_from_slice(&1u32.to_be_bytes());
        put_string(&mut blob, &ed25519_public_blob(key));
        put_string(&mut blob, namespace.as_bytes());
        put_string(&mut blob, b"");
        put_string(&mut blob, b"sha512");
        put_string(
            &mut blob,
            &raw_signature_blob(SSH_ED25519, &signature.to_bytes()),
        );
        blob
    }

    /// Armored SSHSIG block as git stores it.
    pub fn armor_sshsig(blob: &[u8]) -> String {
        let encoded = STANDARD.encode(blob);
        let mut armored = String::from("-----BEGIN SSH SIGNATURE-----\n");
        for chunk in encoded.as_bytes().chunks(70) {
            armored.push_str(std::str::from_utf8(chunk).unwrap());
            armored.push('\n');
        }
        armored.push_str("-----END SSH SIGNATURE-----\n");
        armored
    }

    pub fn rsa_public_blob(key: &rsa::RsaPublicKey) -> Vec<u8> {
        let mut blob = Vec::new();
        put_string(&mut blob, SSH_RSA.as_bytes());
        put_mpint(&mut blob, &key.e().to_bytes_be());
        put_mpint(&mut blob, &key.n().to_bytes_be());
        blob
    }

    pub fn p256_public_blob(key: &p256::ecdsa::VerifyingKey) -> Vec<u8> {
        let mut blob = Vec::new();
        put_string(&mut blob, ECDSA_NISTP256.as_bytes());
        put_string(&mut blob, b"nistp256");
        put_string(&mut blob, key.to_encoded_point(false).as_bytes());
        blob
    }

    pub fn p256_signature_blob(signature: &p256::ecdsa::Signature) -> Vec<u8> {
        let (r, s) = signature.split_bytes();
        let mut inner = Vec::new();
        put_mpint(&mut inner, &r);
        put_mpint(&mut inner, &s);
        raw_signature_blob(ECDSA_NISTP256, &inner)
    }
}
