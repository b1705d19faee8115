//! Obfuscation for stored third-party API keys.
//!
//! Same scheme the original client used: XOR against a rolling key, then
//! base64. This is obfuscation at rest, not cryptography; the vault key keeps
//! casual reads of the table from exposing plaintext keys.

use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

fn xor_with_key(data: &[u8], key: &str) -> Vec<u8> {
    let key_bytes = key.as_bytes();
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key_bytes[i % key_bytes.len()])
        .collect()
}

pub fn encrypt(plain: &str, key: &str) -> String {
    if plain.is_empty() || key.is_empty() {
        return String::new();
    }
    STANDARD.encode(xor_with_key(plain.as_bytes(), key))
}

/// Inverse of `encrypt`. Input that does not decode as base64 (or does not
/// XOR back to UTF-8) is returned unchanged, matching the original's
/// fall-through behavior for legacy plaintext rows.
pub fn decrypt(encoded: &str, key: &str) -> String {
    if encoded.is_empty() || key.is_empty() {
        return encoded.to_string();
    }
    match STANDARD.decode(encoded) {
        Ok(bytes) => match String::from_utf8(xor_with_key(&bytes, key)) {
            Ok(plain) => plain,
            Err(_) => encoded.to_string(),
        },
        Err(_) => encoded.to_string(),
    }
}

pub fn is_encoded(value: &str) -> bool {
    STANDARD.decode(value).is_ok()
}

/// Short display fingerprint for a key: `sha256:` + first 12 hex chars
pub fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex = format!("{:x}", digest);
    format!("sha256:{}", &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "nexus-api-key-2024";

    #[test]
    fn encrypt_decrypt_are_inverses() {
        let secret = "sk-live-abcdef1234567890";
        let stored = encrypt(secret, KEY);
        assert_ne!(stored, secret);
        assert_eq!(decrypt(&stored, KEY), secret);
    }

    #[test]
    fn decrypt_passes_through_non_base64() {
        assert_eq!(decrypt("not base64!!", KEY), "not base64!!");
    }

    #[test]
    fn empty_inputs_are_safe() {
        assert_eq!(encrypt("", KEY), "");
        assert_eq!(decrypt("", KEY), "");
    }

    #[test]
    fn detects_encoded_values() {
        let stored = encrypt("some-key", KEY);
        assert!(is_encoded(&stored));
        assert!(!is_encoded("spaces are not base64"));
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint("some-key");
        let b = fingerprint("some-key");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 12);
        assert_ne!(fingerprint("other-key"), a);
    }
}
