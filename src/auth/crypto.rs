//! # Credential Hygiene
//!
//! Constant-time token comparison, log-safe token fingerprints and
//! identifier generation.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Constant-time comparison of two byte slices
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time comparison of two strings
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

/// Short SHA-256 fingerprint of a token for log lines
///
/// The raw token never appears in logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let encoded =
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, digest);
    encoded.chars().take(12).collect()
}

/// New document identifier: 32 hex characters
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_comparison() {
        assert!(constant_time_str_eq("hello", "hello"));
        assert!(!constant_time_str_eq("hello", "world"));
        assert!(!constant_time_str_eq("hello", "hello!"));
    }

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        let a = token_fingerprint("sk_live_secret");
        assert_eq!(a, token_fingerprint("sk_live_secret"));
        assert_ne!(a, token_fingerprint("sk_live_other"));
        assert_eq!(a.len(), 12);
        assert!(!a.contains("secret"));
    }

    #[test]
    fn test_generate_id() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        // Long enough for the id-path minimum
        assert!(a.len() >= 12);
    }
}
