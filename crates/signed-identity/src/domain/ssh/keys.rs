//! SSH key files.
//!
//! One key per line, in any of the OpenSSH layouts:
//!
//! ```text
//! ssh-ed25519 AAAA... comment                      # .pub / authorized_keys
//! valid-before="20300101" ssh-ed25519 AAAA...      # authorized_keys with options
//! alice@example.com namespaces="git" ssh-ed25519 AAAA...   # allowed_signers
//! @revoked ssh-ed25519 AAAA...
//! ```
//!
//! Blank lines and `#` comments are skipped. A line that fails to decode is
//! skipped on its own; a file with no decodable line is a parse failure.

use super::{SshError, SshPublicKey, KEY_TYPES};
use crate::domain::entities::{KeyCandidate, TrustedKey};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::domain::errors::KeyFileError;

/// Public key material plus the restrictions its key file placed on it.
#[derive(Clone, Debug)]
pub struct SshKeyMaterial {
    pub key: SshPublicKey,
    /// Wire-format blob, compared against the key embedded in SSHSIG envelopes
    pub blob: Vec<u8>,
    /// `namespaces="..."` restriction; `None` allows every namespace
    pub namespaces: Option<Vec<String>>,
}

pub type SshKey = TrustedKey<SshKeyMaterial>;

/// Parse every key line in an SSH key file.
pub fn parse_ssh_keys(bytes: &[u8], source: &Path) -> Result<Vec<SshKey>, KeyFileError> {
    let text = std::str::from_utf8(bytes).map_err(|_| KeyFileError::Parse {
        path: source.to_path_buf(),
        reason: "SSH key file is not valid UTF-8".into(),
    })?;

    let mut keys = Vec::new();
    let mut last_error = None;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_key_line(line, source) {
            Ok(key) => keys.push(key),
            Err(e) => {
                debug!(
                    path = %source.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping SSH key line"
                );
                last_error = Some(e);
            }
        }
    }

    if keys.is_empty() {
        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no SSH keys in file".into());
        return Err(KeyFileError::Parse {
            path: source.to_path_buf(),
            reason,
        });
    }

    Ok(keys)
}

/// Whether file contents look like an SSH public key file.
pub fn looks_like_ssh_key(bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start();
    ["ssh-", "ecdsa-", "sk-"]
        .iter()
        .any(|prefix| text.starts_with(prefix))
        || [" ssh-", " ecdsa-", " sk-"]
            .iter()
            .any(|needle| text.contains(needle))
}

fn parse_key_line(line: &str, source: &Path) -> Result<SshKey, SshError> {
    let mut fields = split_fields(line);

    let mut revoked = false;
    if let Some(marker) = fields.first().filter(|field| field.starts_with('@')) {
        if *marker != "@revoked" {
            return Err(SshError::Malformed(format!("unsupported marker {marker}")));
        }
        revoked = true;
        fields.remove(0);
    }

    let type_index = fields
        .iter()
        .position(|field| KEY_TYPES.contains(field))
        .ok_or_else(|| SshError::Malformed("no key type on line".into()))?;
    let declared_type = fields[type_index];
    let encoded = fields
        .get(type_index + 1)
        .ok_or_else(|| SshError::Malformed("missing key data".into()))?;

    let blob = STANDARD
        .decode(encoded)
        .map_err(|e| SshError::Malformed(format!("invalid base64 key data: {e}")))?;
    let key = SshPublicKey::from_blob(&blob)?;
    if key.key_type() != declared_type {
        return Err(SshError::Malformed(format!(
            "key data is {} but line declares {declared_type}",
            key.key_type()
        )));
    }

    let mut principals = Vec::new();
    let mut options = KeyOptions::default();
    for (position, field) in fields[..type_index].iter().enumerate() {
        if position == 0 && !looks_like_option(field) {
            principals = field
                .split(',')
                .filter(|principal| !principal.is_empty())
                .map(String::from)
                .collect();
        } else {
            options.apply(field)?;
        }
    }

    let comment = fields[type_index + 2..].join(" ");
    let mut identities = principals;
    if !comment.is_empty() {
        identities.push(comment);
    }

    let candidate = KeyCandidate {
        source_path: source.to_path_buf(),
        identities,
        algorithm: key.algorithm(),
        bit_strength: Some(key.bits()),
        created_at: options.valid_after.unwrap_or(UNIX_EPOCH),
        primary_expiry: options.valid_before,
        primary_can_sign: true,
        subkeys: Vec::new(),
        revoked,
    };

    Ok(TrustedKey {
        candidate,
        material: SshKeyMaterial {
            key,
            blob,
            namespaces: options.namespaces,
        },
    })
}

/// Split on whitespace outside double quotes.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = None;
    let mut quoted = false;

    for (i, c) in line.char_indices() {
        if c == '"' {
            quoted = !quoted;
        }
        if c.is_whitespace() && !quoted {
            if let Some(s) = start.take() {
                fields.push(&line[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        fields.push(&line[s..]);
    }
    fields
}

/// Split an options field on commas outside double quotes.
fn split_options(field: &str) -> Vec<&str> {
    let mut options = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (i, c) in field.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                options.push(&field[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    options.push(&field[start..]);
    options
}

fn looks_like_option(field: &str) -> bool {
    field.contains('=')
        || matches!(
            field.split(',').next().map(str::to_ascii_lowercase).as_deref(),
            Some("cert-authority" | "restrict" | "no-pty" | "no-port-forwarding")
        )
}

#[derive(Debug, Default)]
struct KeyOptions {
    valid_after: Option<SystemTime>,
    valid_before: Option<SystemTime>,
    namespaces: Option<Vec<String>>,
}

impl KeyOptions {
    fn apply(&mut self, field: &str) -> Result<(), SshError> {
        for option in split_options(field) {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, value.trim_matches('"')),
                None => (option, ""),
            };

            match name.to_ascii_lowercase().as_str() {
                "valid-after" => self.valid_after = Some(parse_ssh_time(value)?),
                "valid-before" | "expiry-time" => self.valid_before = Some(parse_ssh_time(value)?),
                "namespaces" => {
                    self.namespaces = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|ns| !ns.is_empty())
                            .map(String::from)
                            .collect(),
                    )
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Parse an OpenSSH timestamp: `YYYYMMDD`, `YYYYMMDDHHMM` or
/// `YYYYMMDDHHMMSS`, with an optional trailing `Z`. Always read as UTC.
fn parse_ssh_time(value: &str) -> Result<SystemTime, SshError> {
    let invalid = || SshError::Malformed(format!("invalid timestamp {value:?}"));
    let digits = value.strip_suffix(['Z', 'z']).unwrap_or(value);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let number = |range: std::ops::Range<usize>| -> Result<u32, SshError> {
        digits
            .get(range)
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)
    };

    let date = NaiveDate::from_ymd_opt(number(0..4)? as i32, number(4..6)?, number(6..8)?)
        .ok_or_else(invalid)?;
    let time = match digits.len() {
        8 => NaiveTime::MIN,
        12 => NaiveTime::from_hms_opt(number(8..10)?, number(10..12)?, 0).ok_or_else(invalid)?,
        14 => NaiveTime::from_hms_opt(number(8..10)?, number(10..12)?, number(12..14)?)
            .ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };

    let seconds = NaiveDateTime::new(date, time).and_utc().timestamp();
    let seconds = u64::try_from(seconds).map_err(|_| invalid())?;
    Ok(UNIX_EPOCH + Duration::from_secs(seconds))
}
