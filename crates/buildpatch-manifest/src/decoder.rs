//! Format detection and binary container unwrapping
//!
//! [`ManifestDecoder`] is the single entry point for decoding. It looks at
//! the first four bytes of the source: a `{` anywhere in them selects the
//! text decoder, the binary magic selects the container path, and anything
//! else is rejected.
//!
//! The binary container is a [`ManifestHeader`] followed, at `header_size`,
//! by a payload of `data_size_compressed` bytes that is zlib compressed when
//! the header says so. The payload holds the four manifest blocks.

use crate::error::{ManifestError, Result};
use crate::header::{MANIFEST_MAGIC, ManifestHeader};
use crate::json::{JsonManifestDecoder, TextDecoder};
use crate::manifest::Manifest;
use crate::reader::ArchiveReader;
use crate::sections;
use binrw::BinRead;
use flate2::read::ZlibDecoder;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Default upper bound for a manifest payload (256 MiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 256 * 1024 * 1024;

/// Encoding of a manifest document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// JSON text document
    Json,
    /// Binary container
    Binary,
}

impl ManifestFormat {
    /// Detect the format from up to four leading bytes
    pub fn detect(lead: &[u8]) -> Option<Self> {
        let lead = &lead[..lead.len().min(4)];
        if lead.contains(&b'{') {
            return Some(Self::Json);
        }

        match <[u8; 4]>::try_from(lead) {
            Ok(bytes) if u32::from_le_bytes(bytes) == MANIFEST_MAGIC => Some(Self::Binary),
            _ => None,
        }
    }
}

/// Decoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Largest payload, stored or decompressed, the decoder will allocate
    pub max_payload_size: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl DecodeOptions {
    /// Set the payload size limit
    pub fn with_max_payload_size(mut self, max_payload_size: u64) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }
}

/// Manifest decoder for both encodings
#[derive(Debug, Clone)]
pub struct ManifestDecoder<T = JsonManifestDecoder> {
    options: DecodeOptions,
    text_decoder: T,
}

impl ManifestDecoder {
    /// Create a decoder using the built-in JSON decoder
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            text_decoder: JsonManifestDecoder,
        }
    }
}

impl Default for ManifestDecoder {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl<T: TextDecoder> ManifestDecoder<T> {
    /// Replace the decoder used for text manifests
    pub fn with_text_decoder<U: TextDecoder>(self, text_decoder: U) -> ManifestDecoder<U> {
        ManifestDecoder {
            options: self.options,
            text_decoder,
        }
    }

    /// Decoder configuration
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a manifest from an in-memory buffer
    pub fn decode_bytes(&self, data: &[u8]) -> Result<Manifest> {
        self.decode(Cursor::new(data))
    }

    /// Decode a manifest starting at the current position of `source`
    pub fn decode<R: Read + Seek>(&self, mut source: R) -> Result<Manifest> {
        let origin = source.stream_position()?;
        let lead = read_lead(&mut source)?;

        match ManifestFormat::detect(&lead) {
            Some(ManifestFormat::Json) => {
                debug!(origin, "decoding JSON manifest");
                source.seek(SeekFrom::Start(origin))?;
                self.text_decoder
                    .decode(&mut source)
                    .map_err(ManifestError::TextDecoder)
            }
            Some(ManifestFormat::Binary) => {
                debug!(origin, "decoding binary manifest");
                source.seek(SeekFrom::Start(origin))?;
                self.decode_binary(&mut source, origin)
            }
            None => Err(ManifestError::UnrecognizedFormat { magic: lead }),
        }
    }

    fn decode_binary<R: Read + Seek>(&self, source: &mut R, origin: u64) -> Result<Manifest> {
        let header = ManifestHeader::read(source).map_err(|e| header_error(e, origin))?;
        let flags = header.storage_flags();
        debug!(
            header_size = header.header_size,
            compressed_size = header.data_size_compressed,
            uncompressed_size = header.data_size_uncompressed,
            stored_as = header.stored_as,
            feature_level = %header.feature_level(),
            "read manifest header"
        );

        if flags.is_encrypted() {
            return Err(ManifestError::EncryptedPayload);
        }

        let limit = self.options.max_payload_size;
        check_size(u64::from(header.data_size_compressed), limit)?;
        if flags.is_compressed() {
            check_size(u64::from(header.data_size_uncompressed), limit)?;
        }

        let mut reader = ArchiveReader::new(source);
        reader.set_section("ManifestPayload");
        reader.set_pos(origin + u64::from(header.header_size));
        let stored = reader.read_bytes(header.data_size_compressed as usize);
        reader.check()?;

        let payload = if flags.is_compressed() {
            inflate(&stored, header.data_size_uncompressed, limit)?
        } else {
            stored
        };

        let mut reader = ArchiveReader::new(Cursor::new(payload));
        let manifest = sections::read_manifest(&mut reader)?;

        if manifest.meta.feature_level != header.feature_level() {
            debug!(
                header = %header.feature_level(),
                meta = %manifest.meta.feature_level,
                "header and metadata feature levels differ"
            );
        }

        Ok(manifest)
    }
}

/// Read up to four bytes, stopping early at end of input
fn read_lead<R: Read>(source: &mut R) -> Result<Vec<u8>> {
    let mut lead = [0u8; 4];
    let mut filled = 0;
    while filled < lead.len() {
        match source.read(&mut lead[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(lead[..filled].to_vec())
}

fn header_error(error: binrw::Error, origin: u64) -> ManifestError {
    if error.is_eof() {
        ManifestError::Truncated {
            section: "ManifestHeader",
            position: origin,
        }
    } else {
        ManifestError::BinRw(error)
    }
}

fn check_size(declared: u64, limit: u64) -> Result<()> {
    if declared > limit {
        return Err(ManifestError::PayloadTooLarge { declared, limit });
    }
    Ok(())
}

/// Inflate a zlib payload, refusing to grow past `limit`
fn inflate(data: &[u8], expected_size: u32, limit: u64) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size as usize);

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| ManifestError::DecompressionFailed(e.to_string()))?;

        if bytes_read == 0 {
            break;
        }

        if (decompressed.len() + bytes_read) as u64 > limit {
            return Err(ManifestError::DecompressionFailed(format!(
                "decompressed size exceeds limit of {limit} bytes"
            )));
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    if decompressed.len() != expected_size as usize {
        warn!(
            expected = expected_size,
            actual = decompressed.len(),
            "decompressed payload size differs from header"
        );
    }

    Ok(decompressed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::flags::StorageFlags;
    use crate::test_utils::{ManifestWriter, sample_manifest};
    use crate::version::FeatureLevel;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    fn decoder() -> ManifestDecoder {
        ManifestDecoder::default()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(ManifestFormat::detect(b"{\"a\":1}"), Some(ManifestFormat::Json));
        assert_eq!(ManifestFormat::detect(b"\xEF\xBB\xBF{"), Some(ManifestFormat::Json));
        assert_eq!(ManifestFormat::detect(b" \n{"), Some(ManifestFormat::Json));
        assert_eq!(
            ManifestFormat::detect(&MANIFEST_MAGIC.to_le_bytes()),
            Some(ManifestFormat::Binary)
        );
        assert_eq!(ManifestFormat::detect(&MANIFEST_MAGIC.to_be_bytes()), None);
        assert_eq!(ManifestFormat::detect(b"    {"), None);
        assert_eq!(ManifestFormat::detect(b""), None);
    }

    #[test]
    fn test_decode_raw_container() {
        let manifest = sample_manifest();
        let data = ManifestWriter::container(&ManifestWriter::payload(&manifest), false);
        let decoded = decoder().decode_bytes(&data).expect("Operation should succeed");
        assert_eq!(decoded, manifest);
    }

    #[test]
    fn test_compression_toggle() {
        let manifest = sample_manifest();
        let payload = ManifestWriter::payload(&manifest);

        let raw = decoder()
            .decode_bytes(&ManifestWriter::container(&payload, false))
            .expect("Operation should succeed");
        let compressed = decoder()
            .decode_bytes(&ManifestWriter::container(&payload, true))
            .expect("Operation should succeed");

        assert_eq!(raw, compressed);
        assert_eq!(raw, manifest);
    }

    #[test]
    fn test_header_size_skips_unknown_header_fields() {
        let payload = ManifestWriter::payload(&sample_manifest());
        let mut header = ManifestHeader::new(
            payload.len() as u32,
            payload.len() as u32,
            StorageFlags::NONE,
            FeatureLevel::LATEST,
        );
        header.header_size += 16;

        let mut data = Vec::new();
        header
            .write(&mut Cursor::new(&mut data))
            .expect("Operation should succeed");
        data.extend_from_slice(&[0xEE; 16]);
        data.extend_from_slice(&payload);

        let decoded = decoder().decode_bytes(&data).expect("Operation should succeed");
        assert_eq!(decoded, sample_manifest());
    }

    #[test]
    fn test_decode_from_non_zero_origin() {
        let manifest = sample_manifest();
        let container = ManifestWriter::container(&ManifestWriter::payload(&manifest), true);
        let mut data = vec![0xAA; 10];
        data.extend_from_slice(&container);

        let mut cursor = Cursor::new(data);
        cursor.set_position(10);
        let decoded = decoder().decode(&mut cursor).expect("Operation should succeed");
        assert_eq!(decoded, manifest);
    }

    #[test]
    fn test_unrecognized_format() {
        let err = decoder()
            .decode_bytes(b"PK\x03\x04rest")
            .expect_err("Test operation should fail");
        assert!(matches!(
            err,
            ManifestError::UnrecognizedFormat { ref magic } if magic == b"PK\x03\x04"
        ));

        let err = decoder()
            .decode_bytes(b"")
            .expect_err("Test operation should fail");
        assert!(matches!(err, ManifestError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn test_truncated_header() {
        let data = ManifestWriter::container(&ManifestWriter::payload(&sample_manifest()), false);
        let err = decoder()
            .decode_bytes(&data[..20])
            .expect_err("Test operation should fail");
        assert!(matches!(
            err,
            ManifestError::Truncated {
                section: "ManifestHeader",
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let data = ManifestWriter::container(&ManifestWriter::payload(&sample_manifest()), false);
        let err = decoder()
            .decode_bytes(&data[..data.len() - 1])
            .expect_err("Test operation should fail");
        assert!(matches!(
            err,
            ManifestError::Truncated {
                section: "ManifestPayload",
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_compressed_payload() {
        let payload = ManifestWriter::payload(&sample_manifest());
        let mut data = ManifestWriter::container(&payload, true);
        let header_size = crate::header::FULL_HEADER_SIZE as usize;
        data[header_size..header_size + 2].copy_from_slice(&[0xFF, 0xFF]);

        let err = decoder()
            .decode_bytes(&data)
            .expect_err("Test operation should fail");
        assert!(matches!(err, ManifestError::DecompressionFailed(_)));
    }

    #[test]
    fn test_encrypted_payload_rejected() {
        let payload = ManifestWriter::payload(&sample_manifest());
        let mut data = ManifestWriter::container(&payload, false);
        // Storage flags live right after the 20-byte hash
        data[36] = StorageFlags::ENCRYPTED;

        let err = decoder()
            .decode_bytes(&data)
            .expect_err("Test operation should fail");
        assert!(matches!(err, ManifestError::EncryptedPayload));
    }

    #[test]
    fn test_payload_size_limit() {
        let payload = ManifestWriter::payload(&sample_manifest());
        let data = ManifestWriter::container(&payload, true);

        let small = ManifestDecoder::new(DecodeOptions::default().with_max_payload_size(64));
        let err = small
            .decode_bytes(&data)
            .expect_err("Test operation should fail");
        assert!(matches!(
            err,
            ManifestError::PayloadTooLarge { limit: 64, .. }
        ));
    }

    #[test]
    fn test_json_routed_to_text_decoder() {
        struct Marker;

        impl TextDecoder for Marker {
            fn decode(
                &self,
                source: &mut dyn Read,
            ) -> std::result::Result<Manifest, Box<dyn std::error::Error + Send + Sync>> {
                let mut text = String::new();
                source.read_to_string(&mut text)?;
                let mut manifest = Manifest::default();
                manifest.custom_fields.insert("document".to_string(), text);
                Ok(manifest)
            }
        }

        let manifest = decoder()
            .with_text_decoder(Marker)
            .decode_bytes(br#"{"a":1}"#)
            .expect("Operation should succeed");
        assert_eq!(manifest.custom_fields["document"], r#"{"a":1}"#);
    }

    #[test]
    fn test_text_decoder_failure() {
        let err = decoder()
            .decode_bytes(b"{\"ManifestFileVersion\": [")
            .expect_err("Test operation should fail");
        assert!(matches!(err, ManifestError::TextDecoder(_)));
    }
}
