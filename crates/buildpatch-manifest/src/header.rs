//! Binary manifest container header

use crate::flags::StorageFlags;
use crate::guid::ShaHash;
use crate::version::FeatureLevel;
use binrw::{BinRead, BinWrite};

/// Magic number at the start of every binary manifest
pub const MANIFEST_MAGIC: u32 = 0x44BE_C00C;

/// Size of a header that carries the version field
pub const FULL_HEADER_SIZE: u32 = 41;

/// Binary manifest header
///
/// Layout (little-endian):
/// - Magic (4 bytes)
/// - Header size (4 bytes), the payload starts at this offset
/// - Uncompressed payload size (4 bytes)
/// - Compressed payload size (4 bytes)
/// - SHA1 of the payload (20 bytes)
/// - Storage flags (1 byte)
/// - Feature level (4 bytes, only when the header size allows for it)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
pub struct ManifestHeader {
    /// Magic number, always `0x44BEC00C`
    #[br(assert(magic == MANIFEST_MAGIC, "Invalid manifest magic: {:#010x}", magic))]
    pub magic: u32,

    /// Size of the header, including any fields this crate does not know
    pub header_size: u32,

    /// Payload size after decompression
    pub data_size_uncompressed: u32,

    /// Payload size as stored
    pub data_size_compressed: u32,

    /// SHA1 hash of the payload
    pub sha_hash: [u8; 20],

    /// Raw storage flags
    pub stored_as: u8,

    /// Feature level of the manifest data
    #[br(if(header_size >= FULL_HEADER_SIZE))]
    pub version: Option<i32>,
}

impl ManifestHeader {
    /// Create a full-size header for a payload
    pub fn new(
        data_size_uncompressed: u32,
        data_size_compressed: u32,
        stored_as: u8,
        version: FeatureLevel,
    ) -> Self {
        Self {
            magic: MANIFEST_MAGIC,
            header_size: FULL_HEADER_SIZE,
            data_size_uncompressed,
            data_size_compressed,
            sha_hash: [0; 20],
            stored_as,
            version: Some(version.0),
        }
    }

    /// Storage flags
    pub const fn storage_flags(&self) -> StorageFlags {
        StorageFlags::new(self.stored_as)
    }

    /// Payload hash
    pub const fn sha_hash(&self) -> ShaHash {
        ShaHash::from_bytes(self.sha_hash)
    }

    /// Feature level declared by the header
    ///
    /// Headers too short to carry the field predate it; they were written by
    /// the first binary producers.
    pub fn feature_level(&self) -> FeatureLevel {
        self.version
            .map_or(FeatureLevel::STORED_AS_BINARY_DATA, FeatureLevel)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    fn header_bytes(header_size: u32, with_version: bool) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&MANIFEST_MAGIC.to_le_bytes());
        data.extend_from_slice(&header_size.to_le_bytes());
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&60u32.to_le_bytes());
        data.extend_from_slice(&[0xAB; 20]);
        data.push(StorageFlags::COMPRESSED);
        if with_version {
            data.extend_from_slice(&18i32.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_header_parsing() {
        let data = header_bytes(FULL_HEADER_SIZE, true);
        assert_eq!(data.len(), FULL_HEADER_SIZE as usize);

        let header =
            ManifestHeader::read(&mut Cursor::new(&data)).expect("Operation should succeed");
        assert_eq!(header.header_size, 41);
        assert_eq!(header.data_size_uncompressed, 100);
        assert_eq!(header.data_size_compressed, 60);
        assert_eq!(header.sha_hash().as_bytes(), &[0xAB; 20]);
        assert!(header.storage_flags().is_compressed());
        assert_eq!(
            header.feature_level(),
            FeatureLevel::USES_BUILD_TIME_GENERATED_BUILD_ID
        );
    }

    #[test]
    fn test_short_header_has_no_version() {
        let data = header_bytes(37, false);
        let header =
            ManifestHeader::read(&mut Cursor::new(&data)).expect("Operation should succeed");
        assert_eq!(header.version, None);
        assert_eq!(header.feature_level(), FeatureLevel::STORED_AS_BINARY_DATA);
    }

    #[test]
    fn test_header_round_trip() {
        let original = ManifestHeader::new(10, 8, 0, FeatureLevel::VARIABLE_SIZE_CHUNKS);

        let mut buffer = Vec::new();
        original
            .write(&mut Cursor::new(&mut buffer))
            .expect("Operation should succeed");
        assert_eq!(buffer.len(), FULL_HEADER_SIZE as usize);
        assert_eq!(&buffer[..4], &[0x0C, 0xC0, 0xBE, 0x44]);

        let parsed =
            ManifestHeader::read(&mut Cursor::new(&buffer)).expect("Operation should succeed");
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_header_invalid_magic() {
        let mut data = header_bytes(FULL_HEADER_SIZE, true);
        data[0] = 0;
        let result = ManifestHeader::read(&mut Cursor::new(&data));
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes(FULL_HEADER_SIZE, true);
        let result = ManifestHeader::read(&mut Cursor::new(&data[..20]));
        assert!(result.is_err());
    }
}
