//! PKCE (Proof Key for Code Exchange) per RFC 7636, plus the opaque `state`
//! nonce that ties a callback back to the flow that started it.
//!
//! Google accepts PKCE on web clients alongside the client secret. The
//! verifier stays in the gateway's pending-flow table; only the challenge
//! travels through the browser.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random PKCE code verifier.
///
/// 64 random bytes encoded as URL-safe base64 without padding (86 chars),
/// inside the 43-128 character range RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 64];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate the `state` nonce for one authorization attempt.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_is_url_safe_base64_within_rfc_range() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 86);
        assert!((43..=128).contains(&verifier.len()));
        assert!(is_url_safe(&verifier), "verifier: {verifier}");
    }

    #[test]
    fn verifiers_and_states_are_unique() {
        assert_ne!(generate_verifier(), generate_verifier());
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn state_is_url_safe() {
        let state = generate_state();
        assert_eq!(state.len(), 43);
        assert!(is_url_safe(&state), "state: {state}");
    }

    #[test]
    fn challenge_matches_known_value() {
        // SHA256("hello") base64url-encoded without padding
        let challenge = compute_challenge("hello");
        assert_eq!(challenge, "LPJNul-wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ");
    }

    #[test]
    fn challenge_decodes_to_sha256_length() {
        let challenge = compute_challenge(&generate_verifier());
        let decoded = URL_SAFE_NO_PAD.decode(&challenge).expect("valid base64url");
        assert_eq!(decoded.len(), 32);
    }
}
