//! SSH signature wrappers and verification.
//!
//! Two wrapper forms are accepted:
//! - `<algorithm>:<base64>`, where the payload is either an SSHSIG envelope
//!   or a bare `string algorithm || string signature` blob
//! - an armored `-----BEGIN SSH SIGNATURE-----` block holding an SSHSIG envelope
//!
//! Bare blobs are checked over the commit bytes directly. Envelopes are
//! checked over the SSHSIG preimage and must name the expected namespace.

use super::keys::SshKeyMaterial;
use super::wire::{put_string, WireReader};
use super::{
    is_known_algorithm, key_type_for_signature, SshError, SshPublicKey, ECDSA_NISTP256,
    RSA_SHA2_256, RSA_SHA2_512, SSH_ED25519, SSH_RSA,
};
use crate::domain::detect::SSH_SIGNATURE_MARKER;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use rsa::signature::Verifier;
use sha2::{Digest, Sha256, Sha512};

const SSHSIG_MAGIC: &[u8; 6] = b"SSHSIG";
const SSHSIG_VERSION: u32 = 1;
const SSH_SIGNATURE_END: &str = "-----END SSH SIGNATURE-----";

/// Digest applied to the message inside an SSHSIG envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SshHashAlgorithm {
    Sha256,
    Sha512,
}

impl SshHashAlgorithm {
    fn parse(name: &str) -> Result<Self, SshError> {
        match name {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(SshError::UnsupportedAlgorithm(format!("hash {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn digest(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(message).to_vec(),
            Self::Sha512 => Sha512::digest(message).to_vec(),
        }
    }
}

/// `string algorithm || string signature`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSignature {
    pub algorithm: String,
    pub blob: Vec<u8>,
}

impl RawSignature {
    fn from_blob(bytes: &[u8]) -> Result<Self, SshError> {
        let mut reader = WireReader::new(bytes);
        let algorithm = reader.read_str()?.to_string();
        let blob = reader.read_string()?.to_vec();
        reader.finish()?;
        Ok(Self { algorithm, blob })
    }
}

/// Decoded SSHSIG envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshSigEnvelope {
    pub public_key: Vec<u8>,
    pub namespace: String,
    pub reserved: Vec<u8>,
    pub hash_algorithm: SshHashAlgorithm,
    pub signature: RawSignature,
}

impl SshSigEnvelope {
    fn from_blob(bytes: &[u8]) -> Result<Self, SshError> {
        let mut reader = WireReader::new(bytes);
        if reader.read_bytes(SSHSIG_MAGIC.len())? != SSHSIG_MAGIC {
            return Err(SshError::Malformed("missing SSHSIG magic".into()));
        }

        let version = reader.read_u32()?;
        if version != SSHSIG_VERSION {
            return Err(SshError::UnsupportedAlgorithm(format!(
                "SSHSIG version {version}"
            )));
        }

        let public_key = reader.read_string()?.to_vec();
        let namespace = reader.read_str()?.to_string();
        let reserved = reader.read_string()?.to_vec();
        let hash_algorithm = SshHashAlgorithm::parse(reader.read_str()?)?;
        let signature = RawSignature::from_blob(reader.read_string()?)?;
        reader.finish()?;

        Ok(Self {
            public_key,
            namespace,
            reserved,
            hash_algorithm,
            signature,
        })
    }

    /// Bytes the signer actually signed.
    fn signed_data(&self, message: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(SSHSIG_MAGIC);
        put_string(&mut data, self.namespace.as_bytes());
        put_string(&mut data, &self.reserved);
        put_string(&mut data, self.hash_algorithm.as_str().as_bytes());
        put_string(&mut data, &self.hash_algorithm.digest(message));
        data
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SshPayload {
    Envelope(SshSigEnvelope),
    Raw(RawSignature),
}

impl SshPayload {
    fn raw_signature(&self) -> &RawSignature {
        match self {
            SshPayload::Envelope(envelope) => &envelope.signature,
            SshPayload::Raw(raw) => raw,
        }
    }
}

/// A decoded SSH commit signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshSignature {
    /// Algorithm tag from the wrapper
    pub algorithm: String,
    pub payload: SshPayload,
}

impl SshSignature {
    /// Check this signature over `message` with `key`.
    ///
    /// For envelopes, `namespace` must equal the envelope's namespace and be
    /// allowed by the key's `namespaces` option.
    pub fn verify(
        &self,
        key: &SshKeyMaterial,
        message: &[u8],
        namespace: &str,
    ) -> Result<(), SshError> {
        match &self.payload {
            SshPayload::Raw(raw) => verify_raw(&key.key, raw, message),
            SshPayload::Envelope(envelope) => {
                if envelope.public_key != key.blob {
                    return Err(SshError::KeyMismatch);
                }
                if envelope.namespace != namespace {
                    return Err(SshError::NamespaceMismatch {
                        expected: namespace.to_string(),
                        found: envelope.namespace.clone(),
                    });
                }
                if let Some(allowed) = &key.namespaces {
                    if !allowed.iter().any(|ns| ns == &envelope.namespace) {
                        return Err(SshError::NamespaceNotAllowed(envelope.namespace.clone()));
                    }
                }
                verify_raw(&key.key, &envelope.signature, &envelope.signed_data(message))
            }
        }
    }
}

/// Decode an SSH signature in either wrapper form.
pub fn parse_ssh_signature(text: &str) -> Result<SshSignature, SshError> {
    let text = text.trim();

    if text.contains(SSH_SIGNATURE_MARKER) {
        let envelope = SshSigEnvelope::from_blob(&dearmor(text)?)?;
        return Ok(SshSignature {
            algorithm: envelope.signature.algorithm.clone(),
            payload: SshPayload::Envelope(envelope),
        });
    }

    let (algorithm, encoded) = text
        .split_once(':')
        .ok_or_else(|| SshError::Malformed("expected <algorithm>:<payload>".into()))?;
    let algorithm = algorithm.trim();
    if !is_known_algorithm(algorithm) {
        return Err(SshError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(SshError::Malformed("empty signature payload".into()));
    }

    let blob = decode_base64(&compact)?;
    let payload = if blob.starts_with(SSHSIG_MAGIC) {
        SshPayload::Envelope(SshSigEnvelope::from_blob(&blob)?)
    } else {
        SshPayload::Raw(RawSignature::from_blob(&blob)?)
    };

    let inner = &payload.raw_signature().algorithm;
    if key_type_for_signature(inner) != key_type_for_signature(algorithm) {
        return Err(SshError::Malformed(format!(
            "algorithm tag {algorithm} does not match signature algorithm {inner}"
        )));
    }

    Ok(SshSignature {
        algorithm: algorithm.to_string(),
        payload,
    })
}

fn dearmor(text: &str) -> Result<Vec<u8>, SshError> {
    let start = text
        .find(SSH_SIGNATURE_MARKER)
        .map(|i| i + SSH_SIGNATURE_MARKER.len())
        .ok_or_else(|| SshError::Malformed("missing armor header".into()))?;
    let end = text[start..]
        .find(SSH_SIGNATURE_END)
        .ok_or_else(|| SshError::Malformed("missing armor footer".into()))?;

    let body: String = text[start..start + end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    decode_base64(&body)
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, SshError> {
    STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .map_err(|e| SshError::Malformed(format!("invalid base64: {e}")))
}

fn verify_raw(key: &SshPublicKey, raw: &RawSignature, data: &[u8]) -> Result<(), SshError> {
    let mismatch = || SshError::AlgorithmMismatch {
        signature: raw.algorithm.clone(),
        key: key.key_type(),
    };

    match key {
        SshPublicKey::Ed25519(verifying_key) => {
            if raw.algorithm != SSH_ED25519 {
                return Err(mismatch());
            }
            let bytes: [u8; 64] = raw
                .blob
                .as_slice()
                .try_into()
                .map_err(|_| SshError::Malformed("ed25519 signature must be 64 bytes".into()))?;
            let signature = ed25519_dalek::Signature::from_bytes(&bytes);
            verifying_key
                .verify_strict(data, &signature)
                .map_err(|_| SshError::BadSignature)
        }
        SshPublicKey::EcdsaP256(verifying_key) => {
            if raw.algorithm != ECDSA_NISTP256 {
                return Err(mismatch());
            }
            let mut reader = WireReader::new(&raw.blob);
            let r = reader.read_mpint()?;
            let s = reader.read_mpint()?;
            reader.finish()?;
            if r.len() > 32 || s.len() > 32 {
                return Err(SshError::Malformed("nistp256 scalar too large".into()));
            }

            let mut rs = [0u8; 64];
            rs[32 - r.len()..32].copy_from_slice(r);
            rs[64 - s.len()..].copy_from_slice(s);
            let signature = p256::ecdsa::Signature::from_slice(&rs)
                .map_err(|_| SshError::Malformed("invalid nistp256 signature".into()))?;
            verifying_key
                .verify(data, &signature)
                .map_err(|_| SshError::BadSignature)
        }
        SshPublicKey::Rsa(public_key) => {
            let signature = rsa::pkcs1v15::Signature::try_from(raw.blob.as_slice())
                .map_err(|_| SshError::Malformed("invalid RSA signature".into()))?;
            let result = match raw.algorithm.as_str() {
                RSA_SHA2_256 => rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public_key.clone())
                    .verify(data, &signature),
                RSA_SHA2_512 => rsa::pkcs1v15::VerifyingKey::<Sha512>::new(public_key.clone())
                    .verify(data, &signature),
                SSH_RSA => return Err(SshError::WeakHash),
                _ => return Err(mismatch()),
            };
            result.map_err(|_| SshError::BadSignature)
        }
    }
}
