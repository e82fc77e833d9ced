//! HubSpot request signatures
//!
//! Two schemes are accepted on inbound webhooks:
//! - **v3**: `base64(HMAC-SHA256(secret, method + uri + body + timestamp))`
//! - **v1**: `hex(SHA-256(secret + body))`
//!
//! Timestamp freshness for v3 is checked by the caller; these helpers only
//! deal with bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

fn v3_mac(
    secret: &str,
    method: &str,
    uri: &str,
    body: &[u8],
    timestamp: &str,
) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(method.as_bytes());
    mac.update(uri.as_bytes());
    mac.update(body);
    mac.update(timestamp.as_bytes());
    Some(mac)
}

/// Compute the v3 signature HubSpot sends in `X-HubSpot-Signature-v3`.
pub fn compute_v3_signature(
    secret: &str,
    method: &str,
    uri: &str,
    body: &[u8],
    timestamp: &str,
) -> String {
    v3_mac(secret, method, uri, body, timestamp)
        .map(|mac| STANDARD.encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Verify a v3 signature in constant time.
pub fn verify_v3_signature(
    secret: &str,
    method: &str,
    uri: &str,
    body: &[u8],
    timestamp: &str,
    provided: &str,
) -> bool {
    let Ok(signature) = STANDARD.decode(provided.trim()) else {
        return false;
    };
    v3_mac(secret, method, uri, body, timestamp)
        .is_some_and(|mac| mac.verify_slice(&signature).is_ok())
}

/// Compute the legacy v1 signature HubSpot sends in `X-HubSpot-Signature`.
pub fn compute_v1_signature(secret: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Verify a v1 signature in constant time.
pub fn verify_v1_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let expected = compute_v1_signature(secret, body);
    constant_time_eq(expected.as_bytes(), provided.trim().to_ascii_lowercase().as_bytes())
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
