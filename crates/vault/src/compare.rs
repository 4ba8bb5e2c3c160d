//! Constant-time digest comparison, the idiom this repo already uses for its
//! bearer-token middleware: hash both sides to a fixed-length digest, then
//! compare with `subtle::ConstantTimeEq` so neither the token's length nor
//! its content leaks through timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn digests_match(provided: &[u8], expected_digest: &[u8]) -> bool {
    let provided_digest = Sha256::digest(provided);
    bool::from(provided_digest.ct_eq(expected_digest))
}

/// Verifies a GitHub-style `X-Hub-Signature-256: sha256=<hex>` webhook
/// signature: `HMAC-SHA256(secret, raw_body)`, hex-encoded, compared in
/// constant time against the header value.
pub fn verify_hmac_signature(secret: &[u8], raw_body: &[u8], provided_hex: &str) -> bool {
    use hmac::{Hmac, Mac};
    type HmacSha256 = Hmac<Sha256>;

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();
    let expected_hex = hex::encode(expected);

    bool::from(expected_hex.as_bytes().ct_eq(provided_hex.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_same_input_matches() {
        let expected = Sha256::digest(b"token123");
        assert!(digests_match(b"token123", &expected));
    }

    #[test]
    fn digest_of_different_input_does_not_match() {
        let expected = Sha256::digest(b"token123");
        assert!(!digests_match(b"wrong", &expected));
    }

    #[test]
    fn hmac_signature_round_trips() {
        use hmac::{Hmac, Mac};
        type HmacSha256 = Hmac<Sha256>;

        let secret = b"webhook-secret";
        let body = b"{\"event\":\"push\"}";
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());

        assert!(verify_hmac_signature(secret, body, &sig));
        assert!(!verify_hmac_signature(secret, body, "deadbeef"));
    }
}
