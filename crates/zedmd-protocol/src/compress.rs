use flate2::{Compression, write::DeflateEncoder};
use std::io::Write;

use crate::error::ZedmdError;

/// Compresses `payload` with raw DEFLATE (RFC 1951), matching the wire
/// format's `[len_hi][len_lo][deflate bytes]` compressed-payload shape.
pub fn deflate(payload: &[u8]) -> Result<Vec<u8>, ZedmdError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).map_err(|e| ZedmdError::CompressionError(e.to_string()))?;
    encoder.finish().map_err(|e| ZedmdError::CompressionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compresses_without_error() {
        let payload = vec![0u8; 4096];
        let compressed = deflate(&payload).unwrap();
        assert!(compressed.len() < payload.len());
    }
}
