//! Log-safe credential fingerprints.
//!
//! The raw token never goes into logs or error payloads; this is the only
//! representation that does.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

// 9 bytes encode to exactly 12 base64url characters.
const FINGERPRINT_BYTES: usize = 9;

pub fn sanitize_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("sha256:{}", URL_SAFE_NO_PAD.encode(&digest[..FINGERPRINT_BYTES]))
}
