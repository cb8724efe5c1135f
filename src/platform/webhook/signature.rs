use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Check an `X-Hub-Signature` header value against the HMAC-SHA1 of `body`.
///
/// Accepts `sha1=<hex>` or a bare hex digest. A missing, non-hex or
/// wrong-length value fails closed. The digest comparison is constant-time.
pub fn verify(secret: &[u8], body: &[u8], header: Option<&str>) -> bool {
    let Some(value) = header else {
        return false;
    };
    let value = value.trim();
    let hex_digest = value.strip_prefix("sha1=").unwrap_or(value);

    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Constant-time equality for shared tokens.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
