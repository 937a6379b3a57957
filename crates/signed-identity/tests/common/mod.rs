//! Key and signature fixtures for the integration tests.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::Signer;
use rand::rngs::OsRng;
use sequoia_openpgp as openpgp;
use openpgp::cert::prelude::*;
use openpgp::packet::signature::SignatureBuilder;
use openpgp::policy::StandardPolicy;
use openpgp::serialize::{Serialize, SerializeInto};
use openpgp::types::SignatureType;
use openpgp::{armor, Cert, Packet};
use sha2::{Digest, Sha512};
use std::fs;
use std::path::{Path, PathBuf};

pub const COMMIT: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
parent 8d2a6d1b2f0c3f7e6a1c0b9e2d4f5a6b7c8d9e0f\n\
author Test User <test@example.com> 1700000000 +0000\n\
committer Test User <test@example.com> 1700000000 +0000\n\
\n\
Add signed identity rule\n";

pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

// =============================================================================
// OpenPGP
// =============================================================================

pub fn gpg_cert(userid: Option<&str>) -> Cert {
    let mut builder = CertBuilder::new()
        .set_cipher_suite(CipherSuite::Cv25519)
        .add_signing_subkey();
    if let Some(userid) = userid {
        builder = builder.add_userid(userid);
    }
    builder.generate().unwrap().0
}

pub fn gpg_revoked_cert(userid: &str) -> Cert {
    let (cert, revocation) = CertBuilder::new()
        .set_cipher_suite(CipherSuite::Cv25519)
        .add_userid(userid)
        .add_signing_subkey()
        .generate()
        .unwrap();
    cert.insert_packets(vec![Packet::from(revocation)]).unwrap()
}

pub fn gpg_sign(cert: &Cert, data: &[u8]) -> String {
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
    Packet::from(signature).serialize(&mut writer).unwrap();
    String::from_utf8(writer.finalize().unwrap()).unwrap()
}

pub fn gpg_armored(cert: &Cert) -> Vec<u8> {
    cert.armored().to_vec().unwrap()
}

pub fn gpg_binary(cert: &Cert) -> Vec<u8> {
    cert.to_vec().unwrap()
}

/// Flip one base64 character in the body of an armored signature.
pub fn tamper(armored: &str) -> String {
    let lines: Vec<&str> = armored.lines().collect();
    let body = lines
        .iter()
        .position(|line| line.is_empty())
        .map(|blank| blank + 1)
        .unwrap_or(1);

    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == body {
            let mut chars: Vec<char> = line.chars().collect();
            let middle = chars.len() / 2;
            chars[middle] = if chars[middle] == 'A' { 'B' } else { 'A' };
            out.push(chars.into_iter().collect::<String>());
        } else {
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

// =============================================================================
// SSH
// =============================================================================

fn put_string(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

pub fn ssh_key() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::generate(&mut OsRng)
}

pub fn ssh_public_blob(key: &ed25519_dalek::SigningKey) -> Vec<u8> {
    let mut blob = Vec::new();
    put_string(&mut blob, b"ssh-ed25519");
    put_string(&mut blob, key.verifying_key().as_bytes());
    blob
}

pub fn ssh_key_line(key: &ed25519_dalek::SigningKey, comment: &str) -> String {
    format!(
        "ssh-ed25519 {} {comment}\n",
        STANDARD.encode(ssh_public_blob(key))
    )
}

pub fn ssh_raw_signature(key: &ed25519_dalek::SigningKey, data: &[u8]) -> String {
    let mut blob = Vec::new();
    put_string(&mut blob, b"ssh-ed25519");
    put_string(&mut blob, &key.sign(data).to_bytes());
    format!("ssh-ed25519:{}", STANDARD.encode(blob))
}

/// Armored SSHSIG block, as `ssh-keygen -Y sign -n <namespace>` writes it.
pub fn ssh_armored_signature(
    key: &ed25519_dalek::SigningKey,
    data: &[u8],
    namespace: &str,
) -> String {
    let mut preimage = b"SSHSIG".to_vec();
    put_string(&mut preimage, namespace.as_bytes());
    put_string(&mut preimage, b"");
    put_string(&mut preimage, b"sha512");
    put_string(&mut preimage, &Sha512::digest(data));

    let mut inner = Vec::new();
    put_string(&mut inner, b"ssh-ed25519");
    put_string(&mut inner, &key.sign(&preimage).to_bytes());

    let mut blob = b"SSHSIG".to_vec();
    blob.extend_from_slice(&1u32.to_be_bytes());
    put_string(&mut blob, &ssh_public_blob(key));
    put_string(&mut blob, namespace.as_bytes());
    put_string(&mut blob, b"");
    put_string(&mut blob, b"sha512");
    put_string(&mut blob, &inner);

    let encoded = STANDARD.encode(blob);
    let mut armored = String::from("-----BEGIN SSH SIGNATURE-----\n");
    for chunk in encoded.as_bytes().chunks(70) {
        armored.push_str(std::str::from_utf8(chunk).unwrap());
        armored.push('\n');
    }
    armored.push_str("-----END SSH SIGNATURE-----\n");
    armored
}
