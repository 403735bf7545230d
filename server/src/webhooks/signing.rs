//! HMAC-SHA1 Event Signing
//!
//! Signs pushed event bodies so collectors can verify their origin.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Sign a payload with HMAC-SHA1 and return the hex-encoded signature.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Value for the `X-Signature` header: `sha1=<hex>`.
pub fn signature_header(secret: &str, payload: &[u8]) -> String {
    format!("sha1={}", sign_payload(secret, payload))
}

/// Verify an `X-Signature` header value against a payload.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str) -> bool {
    header
        .strip_prefix("sha1=")
        .is_some_and(|signature| constant_time_eq(&sign_payload(secret, payload), signature))
}

/// Compare two strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(expected: &str, actual: &str) -> bool {
    expected.len() == actual.len()
        && expected
            .as_bytes()
            .iter()
            .zip(actual.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
