//! Fuzz target for OpenPGP keyring decoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use signed_identity::domain::gpg::{decode_keyring, looks_like_gpg_key};

fuzz_target!(|data: &[u8]| {
    let _ = looks_like_gpg_key(data);

    if let Ok(certs) = decode_keyring(data) {
        assert!(!certs.is_empty());
    }
});
