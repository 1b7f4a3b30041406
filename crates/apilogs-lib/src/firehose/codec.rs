//! Transport encoding of record payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::RecordError;

/// Decode a base64 record payload.
pub fn decode_data(data: &str) -> Result<Vec<u8>, RecordError> {
    STANDARD
        .decode(data.as_bytes())
        .map_err(|e| RecordError::Decode(e.to_string()))
}

/// Encode a payload for the response.
pub fn encode_data(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Length of the base64 encoding of `len` bytes, padding included.
pub fn encoded_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}
