//! Push payload framing and gzip transport compression.

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::error::{ErrorContext, Result};

/// One push request as it travels over the internal channel.
///
/// `contents` is the gzip-compressed document; `mtime` is the original
/// file's modification time in epoch seconds, preserved on the receiving
/// side so staleness checks behave identically on every tier.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub path: String,
    pub contents: Vec<u8>,
    pub mtime: i64,
    pub signature: String,
}

/// Compresses a document for transport.
pub fn gzip(contents: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(contents)
        .with_context(|| "gzip-compressing push payload".to_string())?;
    encoder
        .finish()
        .with_context(|| "finishing gzip stream".to_string())
}

/// Decompresses a received payload.
pub fn gunzip(contents: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(contents);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .with_context(|| "gzip-decompressing push payload".to_string())?;
    Ok(out)
}
