//! Decimal "blob" encoding used for numbers and hashes in JSON manifests
//!
//! Every byte is written as exactly three decimal digits, least significant
//! byte first: the `i32` 13 becomes `"013000000000"`.

use super::JsonManifestError;

/// Decode a blob string into its bytes
pub fn decode_bytes(blob: &str) -> Result<Vec<u8>, JsonManifestError> {
    let digits = blob.as_bytes();
    if digits.len() % 3 != 0 {
        return Err(JsonManifestError::InvalidBlob(blob.to_string()));
    }

    digits
        .chunks_exact(3)
        .map(|triple| {
            let mut value = 0u16;
            for digit in triple {
                if !digit.is_ascii_digit() {
                    return Err(JsonManifestError::InvalidBlob(blob.to_string()));
                }
                value = value * 10 + u16::from(digit - b'0');
            }
            u8::try_from(value).map_err(|_| JsonManifestError::InvalidBlob(blob.to_string()))
        })
        .collect()
}

/// Decode a blob holding an integer of at most `width` bytes
///
/// Shorter blobs are zero-extended; bytes beyond `width` must be zero.
pub fn decode_uint(blob: &str, width: usize) -> Result<u64, JsonManifestError> {
    let bytes = decode_bytes(blob)?;
    let width = width.min(8);
    if bytes.iter().skip(width).any(|b| *b != 0) {
        return Err(JsonManifestError::InvalidBlob(blob.to_string()));
    }

    let mut buf = [0u8; 8];
    for (slot, byte) in buf.iter_mut().zip(bytes.iter().take(width)) {
        *slot = *byte;
    }
    Ok(u64::from_le_bytes(buf))
}

/// Decode a blob into a fixed-size byte array
pub fn decode_array<const N: usize>(blob: &str) -> Result<[u8; N], JsonManifestError> {
    let bytes = decode_bytes(blob)?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| JsonManifestError::InvalidBlob(blob.to_string()))
}

#[cfg(test)]
pub(crate) fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:03}")).collect()
}
