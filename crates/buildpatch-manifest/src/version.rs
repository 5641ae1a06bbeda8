//! Feature levels and per-section data versions
//!
//! Both are ordered: every level supersedes the one before it, so field
//! presence is decided with `>=` comparisons. Values written by a newer
//! producer are kept as-is rather than rejected.

use serde::{Serialize, Serializer};
use std::fmt;

/// Capability level a manifest was produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureLevel(pub i32);

impl FeatureLevel {
    /// Default for an unset level
    pub const INVALID: Self = Self(-1);
    /// The original version
    pub const ORIGINAL: Self = Self(0);
    /// Support for custom fields
    pub const CUSTOM_FIELDS: Self = Self(1);
    /// Started storing the version number
    pub const START_STORING_VERSION: Self = Self(2);
    /// Data files renamed to include the hash value (`ChunksV2`)
    pub const DATA_FILE_RENAMES: Self = Self(3);
    /// Stores whether the build was made with chunk or file data
    pub const STORES_IF_CHUNK_OR_FILE_DATA: Self = Self(4);
    /// Stores the group number for each chunk
    pub const STORES_DATA_GROUP_NUMBERS: Self = Self(5);
    /// Chunk compression support (`ChunksV3`)
    pub const CHUNK_COMPRESSION_SUPPORT: Self = Self(6);
    /// Stores product prerequisites info
    pub const STORES_PREREQUISITES_INFO: Self = Self(7);
    /// Stores chunk download sizes
    pub const STORES_CHUNK_FILE_SIZES: Self = Self(8);
    /// Optionally stored compressed
    pub const STORED_AS_COMPRESSED_UCLASS: Self = Self(9);
    /// Removed, never used
    pub const UNUSED_0: Self = Self(10);
    /// Removed, never used
    pub const UNUSED_1: Self = Self(11);
    /// Stores chunk SHA1 hashes
    pub const STORES_CHUNK_DATA_SHA_HASHES: Self = Self(12);
    /// Stores prerequisite ids
    pub const STORES_PREREQUISITE_IDS: Self = Self(13);
    /// First minimal binary format
    pub const STORED_AS_BINARY_DATA: Self = Self(14);
    /// Variable window sizes referenced but not serialized (`ChunksV4`)
    pub const VARIABLE_SIZE_CHUNKS_WITHOUT_WINDOW_SIZE_CHUNK_INFO: Self = Self(15);
    /// Variable window sizes serialized
    pub const VARIABLE_SIZE_CHUNKS: Self = Self(16);
    /// Build id generated from metadata
    pub const USES_RUNTIME_GENERATED_BUILD_ID: Self = Self(17);
    /// Build id generated at build time and stored
    pub const USES_BUILD_TIME_GENERATED_BUILD_ID: Self = Self(18);

    /// Latest level this crate knows by name
    pub const LATEST: Self = Self::USES_BUILD_TIME_GENERATED_BUILD_ID;
    /// Latest level supported by file-data (no chunks) builds
    pub const LATEST_NO_CHUNKS: Self = Self::STORES_CHUNK_FILE_SIZES;
    /// Latest level supported by JSON manifests
    pub const LATEST_JSON: Self = Self::STORES_PREREQUISITE_IDS;
    /// Renamed alias of `USES_RUNTIME_GENERATED_BUILD_ID`
    pub const STORES_UNIQUE_BUILD_ID: Self = Self::USES_RUNTIME_GENERATED_BUILD_ID;
    /// Written by some JSON producers by mistake
    pub const BROKEN_JSON_VERSION: Self = Self(255);

    /// Name of a known level
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            -1 => "Invalid",
            0 => "Original",
            1 => "CustomFields",
            2 => "StartStoringVersion",
            3 => "DataFileRenames",
            4 => "StoresIfChunkOrFileData",
            5 => "StoresDataGroupNumbers",
            6 => "ChunkCompressionSupport",
            7 => "StoresPrerequisitesInfo",
            8 => "StoresChunkFileSizes",
            9 => "StoredAsCompressedUClass",
            10 => "UNUSED_0",
            11 => "UNUSED_1",
            12 => "StoresChunkDataShaHashes",
            13 => "StoresPrerequisiteIds",
            14 => "StoredAsBinaryData",
            15 => "VariableSizeChunksWithoutWindowSizeChunkInfo",
            16 => "VariableSizeChunks",
            17 => "UsesRuntimeGeneratedBuildId",
            18 => "UsesBuildTimeGeneratedBuildId",
            255 => "BrokenJsonVersion",
            _ => return None,
        })
    }

    /// Map the broken JSON marker onto the level it stands for
    pub const fn normalized(self) -> Self {
        if self.0 == Self::BROKEN_JSON_VERSION.0 {
            Self::STORES_CHUNK_FILE_SIZES
        } else {
            self
        }
    }

    /// Directory that chunk files of this level are published under
    pub fn chunk_directory(self) -> &'static str {
        if self < Self::DATA_FILE_RENAMES {
            "Chunks"
        } else if self < Self::CHUNK_COMPRESSION_SUPPORT {
            "ChunksV2"
        } else if self < Self::VARIABLE_SIZE_CHUNKS_WITHOUT_WINDOW_SIZE_CHUNK_INFO {
            "ChunksV3"
        } else {
            "ChunksV4"
        }
    }
}

impl Default for FeatureLevel {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "Unknown ({})", self.0),
        }
    }
}

impl Serialize for FeatureLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.0)
    }
}

/// Data version of the metadata section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManifestMetaVersion(pub u8);

impl ManifestMetaVersion {
    /// The original layout
    pub const ORIGINAL: Self = Self(0);
    /// Adds the build id string
    pub const SERIALISES_BUILD_ID: Self = Self(1);
    /// Latest known layout
    pub const LATEST: Self = Self::SERIALISES_BUILD_ID;
}
