//! Fuzz target for SSH key files and public key blobs.
//!
//! `authorized_keys` / `allowed_signers` lines and raw wire blobs both come
//! from files an attacker may control; neither decoder may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use signed_identity::domain::ssh::{parse_ssh_keys, SshPublicKey};
use std::path::Path;

#[derive(Debug, arbitrary::Arbitrary)]
enum FuzzInput {
    /// Whole key file
    KeyFile(Vec<u8>),
    /// Public key wire blob
    Blob(Vec<u8>),
}

fuzz_target!(|input: FuzzInput| {
    match input {
        FuzzInput::KeyFile(bytes) => {
            if let Ok(keys) = parse_ssh_keys(&bytes, Path::new("fuzz.pub")) {
                for key in keys {
                    // Every decoded line carries a key whose blob decodes again
                    assert!(SshPublicKey::from_blob(&key.material.blob).is_ok());
                    let _ = key.candidate.identity();
                }
            }
        }
        FuzzInput::Blob(bytes) => {
            if let Ok(key) = SshPublicKey::from_blob(&bytes) {
                let _ = key.bits();
                let _ = key.key_type();
            }
        }
    }
});
