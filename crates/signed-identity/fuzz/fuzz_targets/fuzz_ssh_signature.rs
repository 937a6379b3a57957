//! Fuzz target for SSH signature wrapper decoding.
//!
//! Feeds arbitrary text through `parse_ssh_signature` and, when it decodes,
//! checks the result against an arbitrary key line.
//!
//! ## Running
//!
//! ```bash
//! cd crates/signed-identity
//! cargo +nightly fuzz run fuzz_ssh_signature
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use signed_identity::domain::ssh::{parse_ssh_keys, parse_ssh_signature};
use std::path::Path;

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    /// Signature text as stored on the commit
    signature: String,
    /// Contents of one key file
    key_file: Vec<u8>,
    /// Commit bytes
    commit: Vec<u8>,
    namespace: String,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(signature) = parse_ssh_signature(&input.signature) else {
        return;
    };

    // Decoding is deterministic
    assert_eq!(parse_ssh_signature(&input.signature).ok(), Some(signature.clone()));

    if let Ok(keys) = parse_ssh_keys(&input.key_file, Path::new("fuzz.pub")) {
        for key in &keys {
            let _ = signature.verify(&key.material, &input.commit, &input.namespace);
        }
    }
});
