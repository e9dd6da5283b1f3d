//! Webhook signature verification.
//!
//! Shopify signs each webhook delivery with HMAC-SHA256 over the exact raw
//! request body, base64-encoded into the `X-Shopify-Hmac-Sha256` header.
//! Verification therefore has to run against the body bytes as received,
//! before any JSON decoding; re-serializing a parsed body would silently
//! change the bytes and break the check.

/// Header carrying the base64 HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-Shopify-Hmac-Sha256";

/// Verify a webhook body against its signature header.
///
/// Returns `true` only when the header is present, decodes as base64, and
/// matches `HMAC-SHA256(raw_body, secret)`. The comparison goes through
/// `ring::hmac::verify`, which is constant-time.
pub fn verify(raw_body: &[u8], signature_header: Option<&str>, secret: &[u8]) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let Ok(expected) = fast32::base64::RFC4648.decode_str(header) else {
        return false;
    };
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret);
    ring::hmac::verify(&key, raw_body, &expected).is_ok()
}

/// Compute the base64 signature for a body, as Shopify would send it.
pub fn sign(raw_body: &[u8], secret: &[u8]) -> String {
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret);
    let tag = ring::hmac::sign(&key, raw_body);
    fast32::base64::RFC4648.encode(tag.as_ref())
}
