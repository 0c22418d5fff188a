//! Verification token codec: random raw tokens and storable digests.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Entropy for email verification tokens
pub const VERIFICATION_TOKEN_BYTES: usize = 32;

/// Generate a URL-safe token from `byte_length` cryptographically secure
/// random bytes. A zero length is a programmer error.
pub fn generate_token(byte_length: usize) -> String {
    debug_assert!(byte_length > 0, "token byte length must be positive");

    let mut bytes = vec![0u8; byte_length];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a token for storage; the raw value never reaches the database.
///
/// Deterministic across processes (no per-call salt) so the digest can be
/// used for equality lookup when the link is followed.
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_decodes_to_requested_length() {
        let token = generate_token(VERIFICATION_TOKEN_BYTES);
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        assert_eq!(decoded.len(), VERIFICATION_TOKEN_BYTES);
    }

    #[test]
    fn generated_tokens_are_url_safe() {
        let token = generate_token(VERIFICATION_TOKEN_BYTES);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn generated_tokens_do_not_repeat() {
        let first = generate_token(VERIFICATION_TOKEN_BYTES);
        let second = generate_token(VERIFICATION_TOKEN_BYTES);
        assert_ne!(first, second);
    }

    #[test]
    fn digest_is_deterministic_and_fixed_length() {
        let first = hash_token("token");
        let second = hash_token("token");
        let different = hash_token("other");

        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }
}
