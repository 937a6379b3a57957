//! # OpenPGP Keys and Signatures
//!
//! Keyring decoding and detached signature checks, built on `sequoia-openpgp`.
//!
//! Decoding tries the armored form first and falls back to a binary keyring.
//! Every entity in a keyring becomes its own [`GpgKey`].

use super::entities::{KeyAlgorithm, KeyCandidate, SubkeyValidity, TrustedKey};
use super::errors::KeyFileError;
use sequoia_openpgp as openpgp;
use openpgp::armor;
use openpgp::cert::prelude::*;
use openpgp::cert::CertParser;
use openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper,
};
use openpgp::parse::Parse;
use openpgp::policy::Policy;
use openpgp::types::{PublicKeyAlgorithm, RevocationStatus};
use openpgp::{Cert, KeyHandle};
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

/// An OpenPGP entity eligible for admissibility checks.
pub type GpgKey = TrustedKey<Cert>;

const ARMOR_PREFIX: &[u8] = b"-----BEGIN PGP";

/// Decode every entity held in `bytes`.
///
/// Armored input is dearmored first. When that yields nothing the raw bytes
/// are decoded as a binary keyring.
pub fn decode_keyring(bytes: &[u8]) -> Result<Vec<Cert>, String> {
    if contains(bytes, ARMOR_PREFIX) {
        if let Ok(certs) = read_armored_keyring(bytes) {
            if !certs.is_empty() {
                return Ok(certs);
            }
        }
    }

    read_binary_keyring(bytes)
}

fn read_armored_keyring(bytes: &[u8]) -> Result<Vec<Cert>, String> {
    let mut reader = armor::Reader::from_bytes(bytes, armor::ReaderMode::Tolerant(None));
    let mut dearmored = Vec::new();
    reader
        .read_to_end(&mut dearmored)
        .map_err(|e| format!("armor decode failed: {e}"))?;
    read_binary_keyring(&dearmored)
}

fn read_binary_keyring(bytes: &[u8]) -> Result<Vec<Cert>, String> {
    let parser = CertParser::from_bytes(bytes).map_err(|e| e.to_string())?;

    let mut certs = Vec::new();
    let mut last_error = None;
    for result in parser {
        match result {
            Ok(cert) => certs.push(cert),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    match (certs.is_empty(), last_error) {
        (true, Some(reason)) => Err(reason),
        (true, None) => Err("no OpenPGP keys found".to_string()),
        (false, _) => Ok(certs),
    }
}

/// Decode a key file into candidates.
///
/// Entities without a valid self-signature under `policy` contribute nothing;
/// a file where no entity survives is a parse failure.
pub fn parse_gpg_keys(
    bytes: &[u8],
    source: &Path,
    policy: &dyn Policy,
    now: SystemTime,
) -> Result<Vec<GpgKey>, KeyFileError> {
    let certs = decode_keyring(bytes).map_err(|reason| KeyFileError::Parse {
        path: source.to_path_buf(),
        reason,
    })?;

    let mut keys = Vec::with_capacity(certs.len());
    let mut last_error = None;
    for cert in certs {
        match candidate_from_cert(&cert, source, policy, now) {
            Ok(candidate) => keys.push(GpgKey {
                candidate,
                material: cert,
            }),
            Err(reason) => {
                tracing::debug!(
                    path = %source.display(),
                    fingerprint = %cert.fingerprint(),
                    reason = %reason,
                    "Skipping OpenPGP entity without a valid self-signature"
                );
                last_error = Some(reason);
            }
        }
    }

    if keys.is_empty() {
        return Err(KeyFileError::Parse {
            path: source.to_path_buf(),
            reason: last_error.unwrap_or_else(|| "no usable OpenPGP keys".to_string()),
        });
    }

    Ok(keys)
}

/// Extract the admissibility attributes of one entity.
pub fn candidate_from_cert(
    cert: &Cert,
    source: &Path,
    policy: &dyn Policy,
    now: SystemTime,
) -> Result<KeyCandidate, String> {
    let valid = cert.with_policy(policy, now).map_err(|e| e.to_string())?;
    let primary = valid.primary_key();
    let key = primary.key();

    let mut identities = Vec::new();
    if let Ok(userid) = valid.primary_userid() {
        identities.push(String::from_utf8_lossy(userid.userid().value()).into_owned());
    }
    for userid in cert.userids() {
        let name = String::from_utf8_lossy(userid.userid().value()).into_owned();
        if !identities.contains(&name) {
            identities.push(name);
        }
    }

    let key_revoked = matches!(valid.revocation_status(), RevocationStatus::Revoked(_));
    let userid_revoked = valid
        .userids()
        .any(|userid| matches!(userid.revocation_status(), RevocationStatus::Revoked(_)));

    let subkeys = valid
        .keys()
        .subkeys()
        .map(|subkey| SubkeyValidity {
            expires_at: subkey.binding_signature().key_expiration_time(subkey.key()),
            can_sign: subkey.for_signing(),
        })
        .collect();

    Ok(KeyCandidate {
        source_path: source.to_path_buf(),
        identities,
        algorithm: key_algorithm(key.pk_algo()),
        bit_strength: key.mpis().bits().and_then(|bits| u32::try_from(bits).ok()),
        created_at: key.creation_time(),
        primary_expiry: primary.binding_signature().key_expiration_time(key),
        primary_can_sign: primary.for_signing(),
        subkeys,
        revoked: key_revoked || userid_revoked,
    })
}

#[allow(deprecated)]
fn key_algorithm(algo: PublicKeyAlgorithm) -> KeyAlgorithm {
    match algo {
        PublicKeyAlgorithm::RSAEncryptSign
        | PublicKeyAlgorithm::RSAEncrypt
        | PublicKeyAlgorithm::RSASign => KeyAlgorithm::Rsa,
        PublicKeyAlgorithm::DSA => KeyAlgorithm::Dsa,
        PublicKeyAlgorithm::ElGamalEncrypt | PublicKeyAlgorithm::ElGamalEncryptSign => {
            KeyAlgorithm::ElGamal
        }
        PublicKeyAlgorithm::ECDSA => KeyAlgorithm::Ecdsa,
        PublicKeyAlgorithm::EdDSA => KeyAlgorithm::EdDsa,
        PublicKeyAlgorithm::ECDH => KeyAlgorithm::Ecdh,
        _ => KeyAlgorithm::Unknown,
    }
}

// =============================================================================
// DETACHED SIGNATURE CHECK
// =============================================================================

/// Check a detached signature over `data` using only `cert`'s keys.
pub fn verify_detached(
    cert: &Cert,
    data: &[u8],
    signature: &[u8],
    policy: &dyn Policy,
    now: SystemTime,
) -> Result<(), String> {
    let helper = SingleCertHelper { cert };
    let mut verifier = DetachedVerifierBuilder::from_bytes(signature)
        .map_err(|e| e.to_string())?
        .with_policy(policy, now, helper)
        .map_err(|e| e.to_string())?;
    verifier.verify_bytes(data).map_err(|e| e.to_string())
}

/// Supplies exactly one certificate, so a match can only come from it.
struct SingleCertHelper<'a> {
    cert: &'a Cert,
}

impl VerificationHelper for SingleCertHelper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(vec![self.cert.clone()])
    }

    fn check(&mut self, structure: MessageStructure) -> openpgp::Result<()> {
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                if results.iter().any(|result| result.is_ok()) {
                    return Ok(());
                }
            }
        }

        Err(openpgp::Error::BadSignature("no valid signature from trusted key".into()).into())
    }
}

// =============================================================================
// CONTENT SNIFF
// =============================================================================

/// Cheap check that a file plausibly holds OpenPGP key material.
///
/// Accepts public or private key armor headers, or a binary stream opening
/// with a public or secret key packet.
pub fn looks_like_gpg_key(bytes: &[u8]) -> bool {
    if contains(bytes, b"BEGIN PGP PUBLIC KEY BLOCK")
        || contains(bytes, b"BEGIN PGP PRIVATE KEY BLOCK")
    {
        return true;
    }

    match bytes.first() {
        Some(&ctb) if ctb & 0x80 != 0 => {
            let tag = if ctb & 0x40 != 0 {
                ctb & 0x3f
            } else {
                (ctb >> 2) & 0x0f
            };
            // 5 = secret key, 6 = public key
            tag == 5 || tag == 6
        }
        _ => false,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use openpgp::packet::signature::SignatureBuilder;
    use openpgp::policy::StandardPolicy;
    use openpgp::serialize::{Serialize, SerializeInto};
    use openpgp::types::SignatureType;
    use std::time::Duration;

    /// Generate an Ed25519 certificate with a signing subkey.
    pub fn generate_cert(userid: Option<&str>) -> Cert {
        generate_cert_with(CipherSuite::Cv25519, userid)
    }

    /// Generate a certificate with a signing subkey using `suite`.
    pub fn generate_cert_with(suite: CipherSuite, userid: Option<&str>) -> Cert {
        let mut builder = CertBuilder::new()
            .set_cipher_suite(suite)
            .add_signing_subkey();
        if let Some(userid) = userid {
            builder = builder.add_userid(userid);
        }
        let (cert, _revocation) = builder.generate().unwrap();
        cert
    }

    /// Generate a certificate whose primary key expired a day ago.
    pub fn generate_expired_cert(userid: &str) -> Cert {
        let created = SystemTime::now() - Duration::from_secs(3 * 86_400);
        let (cert, _revocation) = CertBuilder::new()
            .set_cipher_suite(CipherSuite::Cv25519)
            .set_creation_time(created)
            .set_validity_period(Duration::from_secs(2 * 86_400))
            .add_userid(userid)
            .add_signing_subkey()
            .generate()
            .unwrap();
        cert
    }

    /// Generate a certificate carrying its own revocation certificate.
    pub fn generate_revoked_cert(userid: &str) -> Cert {
        let (cert, revocation) = CertBuilder::new()
            .set_cipher_suite(CipherSuite::Cv25519)
            .add_userid(userid)
            .add_signing_subkey()
            .generate()
            .unwrap();
        cert.insert_packets(vec![openpgp::Packet::from(revocation)])
            .unwrap()
    }

    /// Produce an armored detached signature over `data`.
    pub fn sign_detached(cert: &Cert, data: &[u8]) -> String {
        let policy = StandardPolicy::new();
        let mut keypair = cert
            .keys()
            .unencrypted_secret()
            .with_policy(&policy, None)
            .alive()
            .for_signing()
            .next()
            .unwrap()
            .key()
            .clone()
            .into_keypair()
            .unwrap();

        let signature = SignatureBuilder::new(SignatureType::Binary)
            .sign_message(&mut keypair, data)
            .unwrap();

        let mut writer = armor::Writer::new(Vec::new(), armor::Kind::Signature).unwrap();
        openpgp::Packet::from(signature)
            .serialize(&mut writer)
            .unwrap();
        String::from_utf8(writer.finalize().unwrap()).unwrap()
    }

    /// Armored public certificate.
    pub fn armored_public(cert: &Cert) -> Vec<u8> {
        cert.armored().to_vec().unwrap()
    }

    /// Binary public certificate.
    pub fn binary_public(cert: &Cert) -> Vec<u8> {
        cert.to_vec().unwrap()
    }
}
