//! # Signature Type Detection
//!
//! Classifies an opaque signature string by its structural markers.
//!
//! Rules, first match wins:
//! 1. PGP armor header → GPG
//! 2. SSHSIG armor header → SSH
//! 3. known SSH algorithm prefix (`ssh-`, `ecdsa-`, `sk-ssh-`), which also
//!    covers the `<algorithm>:<payload>` form → SSH
//!
//! Anything else is unclassified. [`detect_signature_type`] resolves that to
//! GPG; the default is a policy choice, not a parsing guarantee.

use super::entities::{DetectedType, SignatureType};
use super::{gpg, ssh};

/// Armor header of an OpenPGP signature.
pub const PGP_SIGNATURE_MARKER: &str = "-----BEGIN PGP SIGNATURE-----";

/// Armor header of an SSHSIG signature.
pub const SSH_SIGNATURE_MARKER: &str = "-----BEGIN SSH SIGNATURE-----";

/// Algorithm prefixes that mark an SSH signature.
pub const SSH_ALGORITHM_PREFIXES: [&str; 3] = ["ssh-", "ecdsa-", "sk-ssh-"];

/// Classify a signature without applying any default.
pub fn classify(signature: &str) -> DetectedType {
    if signature.contains(PGP_SIGNATURE_MARKER) {
        return DetectedType::Gpg;
    }

    if signature.contains(SSH_SIGNATURE_MARKER) {
        return DetectedType::Ssh;
    }

    if SSH_ALGORITHM_PREFIXES
        .iter()
        .any(|prefix| signature.starts_with(prefix))
    {
        return DetectedType::Ssh;
    }

    DetectedType::Unknown
}

/// Classify a signature, treating anything unrecognised as GPG.
pub fn detect_signature_type(signature: &str) -> SignatureType {
    classify(signature)
        .or_default(Some(SignatureType::Gpg))
        .unwrap_or(SignatureType::Gpg)
}

/// Whether a file name ends in one of the accepted extensions.
///
/// Extensions are plain suffixes, so `allowed_signers` matches the bare
/// file name as well as `team.allowed_signers`.
pub fn has_accepted_extension(file_name: &str, extensions: &[String]) -> bool {
    extensions
        .iter()
        .any(|extension| !extension.is_empty() && file_name.ends_with(extension.as_str()))
}

/// Content sniff for a candidate key file of `family`.
pub fn looks_like_key_file(family: SignatureType, bytes: &[u8]) -> bool {
    match family {
        SignatureType::Gpg => gpg::looks_like_gpg_key(bytes),
        SignatureType::Ssh => ssh::looks_like_ssh_key(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detect_signature_type_table() {
        let cases = [
            (
                "-----BEGIN PGP SIGNATURE-----\nVersion: GnuPG v2\nData\n-----END PGP SIGNATURE-----",
                SignatureType::Gpg,
            ),
            ("ssh-rsa:AAAAB3NzaC1yc2EAAA...", SignatureType::Ssh),
            ("ssh-ed25519:AAAAC3NzaC1lZDI1NTE5AAAA...", SignatureType::Ssh),
            (
                "ecdsa-sha2-nistp256:AAAAE2VjZHNhLXNoYTItbmlzdHA...",
                SignatureType::Ssh,
            ),
            ("sk-ssh-ed25519@openssh.com:AAAA", SignatureType::Ssh),
            (
                "-----BEGIN SSH SIGNATURE-----\nU1NIU0lH\n-----END SSH SIGNATURE-----",
                SignatureType::Ssh,
            ),
            ("unknown-signature-format", SignatureType::Gpg),
        ];

        for (signature, expected) in cases {
            assert_eq!(detect_signature_type(signature), expected, "{signature}");
        }
    }

    #[test]
    fn test_pgp_marker_wins_over_ssh_prefix() {
        let signature = format!("ssh-ed25519:{PGP_SIGNATURE_MARKER}");
        assert_eq!(classify(&signature), DetectedType::Gpg);
    }

    #[test]
    fn test_extension_suffix_match() {
        let extensions = vec![".pub".to_string(), "allowed_signers".to_string()];
        assert!(has_accepted_extension("id_ed25519.pub", &extensions));
        assert!(has_accepted_extension("allowed_signers", &extensions));
        assert!(!has_accepted_extension("id_ed25519", &extensions));
        assert!(!has_accepted_extension("anything", &[String::new()]));
    }

    #[test]
    fn test_key_file_sniff_by_family() {
        let armored = b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nxjMEZ...\n";
        assert!(looks_like_key_file(SignatureType::Gpg, armored));
        assert!(!looks_like_key_file(SignatureType::Ssh, armored));
        assert!(looks_like_key_file(SignatureType::Ssh, b"ssh-ed25519 AAAA user"));
        assert!(!looks_like_key_file(SignatureType::Gpg, b"ssh-ed25519 AAAA user"));
    }

    #[test]
    fn test_classify_reports_unknown() {
        assert_eq!(classify("garbage"), DetectedType::Unknown);
        assert_eq!(classify(""), DetectedType::Unknown);
    }

    proptest! {
        #[test]
        fn prop_detection_is_total_and_deterministic(signature in ".*") {
            let first = detect_signature_type(&signature);
            let second = detect_signature_type(&signature);
            prop_assert_eq!(first, second);
            prop_assert!(matches!(first, SignatureType::Gpg | SignatureType::Ssh));
        }

        #[test]
        fn prop_ssh_prefixed_signatures_are_ssh(payload in "[A-Za-z0-9+/=]{0,64}") {
            let signature = format!("ecdsa-sha2-nistp256:{payload}");
            prop_assert_eq!(detect_signature_type(&signature), SignatureType::Ssh);
        }
    }
}
