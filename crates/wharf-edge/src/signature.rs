//! Push payload authentication.
//!
//! Every push is signed with an HMAC-SHA256 over `path ‖ contents ‖ mtime`
//! using the shared secret of the target node. The receiver recomputes the
//! tag and rejects mismatches before touching the payload.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs a push payload, returning the hex-encoded tag.
pub fn sign(path: &str, contents: &[u8], mtime: i64, secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    feed_message(&mut mac, path, contents, mtime);
    hex_encode(&mac.finalize().into_bytes())
}

/// Verifies a hex-encoded signature in constant time.
pub fn verify(signature: &str, path: &str, contents: &[u8], mtime: i64, secret: &[u8]) -> bool {
    let Some(tag) = hex_decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    feed_message(&mut mac, path, contents, mtime);
    mac.verify_slice(&tag).is_ok()
}

fn feed_message(mac: &mut HmacSha256, path: &str, contents: &[u8], mtime: i64) {
    mac.update(path.as_bytes());
    mac.update(contents);
    mac.update(mtime.to_string().as_bytes());
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
