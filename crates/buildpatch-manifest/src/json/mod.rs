//! JSON manifest decoding
//!
//! Manifests that start with `{` are handed to a [`TextDecoder`]. The
//! default [`JsonManifestDecoder`] reads the legacy JSON layout, in which
//! numbers and hashes are stored as decimal blobs (see [`blob`]) and the
//! chunk catalog is split into per-field maps keyed by GUID.
//!
//! JSON manifests predate variable-size chunks, so every chunk gets the
//! fixed window size [`LEGACY_CHUNK_WINDOW_SIZE`].

pub mod blob;

use crate::flags::FileMetaFlags;
use crate::guid::{Guid, ParseHexError, ShaHash};
use crate::manifest::{ChunkInfo, ChunkPart, FileManifest, Manifest, ManifestMeta};
use crate::version::FeatureLevel;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::io::Read;
use thiserror::Error;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Window size of every chunk referenced by a JSON manifest
pub const LEGACY_CHUNK_WINDOW_SIZE: u32 = 1024 * 1024;

/// Decoder for the text encoding of a manifest
///
/// Receives the source rewound to the start of the document.
pub trait TextDecoder {
    /// Decode a manifest from a text document
    fn decode(&self, source: &mut dyn Read) -> Result<Manifest, Box<dyn Error + Send + Sync>>;
}

/// Errors raised by [`JsonManifestDecoder`]
#[derive(Error, Debug)]
pub enum JsonManifestError {
    /// The document is not valid JSON or has unexpected value types
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blob value is not a sequence of three-digit bytes
    #[error("Invalid blob value: {0:?}")]
    InvalidBlob(String),

    /// A GUID or hash is not valid hex
    #[error("Invalid hex value: {0}")]
    InvalidHex(#[from] ParseHexError),

    /// A plain number does not fit the field it is stored in
    #[error("Number {0} out of range for {1}")]
    OutOfRange(String, &'static str),
}

/// Default decoder for JSON manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifestDecoder;

impl TextDecoder for JsonManifestDecoder {
    fn decode(&self, source: &mut dyn Read) -> Result<Manifest, Box<dyn Error + Send + Sync>> {
        Ok(Self::parse_reader(source)?)
    }
}

impl JsonManifestDecoder {
    /// Parse a JSON manifest from a reader
    ///
    /// A leading UTF-8 byte order mark is skipped.
    pub fn parse_reader(source: &mut dyn Read) -> Result<Manifest, JsonManifestError> {
        let mut text = Vec::new();
        source.read_to_end(&mut text)?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);
        let document: JsonManifest = serde_json::from_slice(text)?;
        document.into_manifest()
    }

    /// Parse a JSON manifest from a string
    ///
    /// A leading byte order mark is skipped.
    pub fn parse_str(text: &str) -> Result<Manifest, JsonManifestError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let document: JsonManifest = serde_json::from_str(text)?;
        document.into_manifest()
    }
}

/// A number stored either as a blob string or as a plain JSON number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonNumber {
    Blob(String),
    Signed(i64),
    Unsigned(u64),
}

impl JsonNumber {
    /// Convert to `T`
    ///
    /// Blobs are little-endian values `width` bytes wide and are passed to
    /// `from_blob`. Plain numbers must fit `T` exactly.
    fn convert<T>(&self, width: usize, from_blob: fn(u64) -> T) -> Result<T, JsonManifestError>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let out_of_range =
            |value: String| JsonManifestError::OutOfRange(value, std::any::type_name::<T>());
        match self {
            Self::Blob(blob) => blob::decode_uint(blob, width).map(from_blob),
            Self::Signed(value) => {
                <T as TryFrom<i64>>::try_from(*value).map_err(|_| out_of_range(value.to_string()))
            }
            Self::Unsigned(value) => {
                <T as TryFrom<u64>>::try_from(*value).map_err(|_| out_of_range(value.to_string()))
            }
        }
    }

    fn to_u8(&self) -> Result<u8, JsonManifestError> {
        self.convert(1, |value| value as u8)
    }

    fn to_u32(&self) -> Result<u32, JsonManifestError> {
        self.convert(4, |value| value as u32)
    }

    fn to_u64(&self) -> Result<u64, JsonManifestError> {
        self.convert(8, |value| value)
    }

    // Blobs hold the two's complement bytes of signed fields
    fn to_i32(&self) -> Result<i32, JsonManifestError> {
        self.convert(4, |value| value as u32 as i32)
    }

    fn to_i64(&self) -> Result<i64, JsonManifestError> {
        self.convert(8, |value| value as i64)
    }
}

#[derive(Debug, Deserialize)]
struct JsonManifest {
    #[serde(rename = "ManifestFileVersion")]
    manifest_file_version: Option<JsonNumber>,
    #[serde(rename = "bIsFileData", default)]
    is_file_data: bool,
    #[serde(rename = "AppID")]
    app_id: Option<JsonNumber>,
    #[serde(rename = "AppNameString", default)]
    app_name: String,
    #[serde(rename = "BuildVersionString", default)]
    build_version: String,
    #[serde(rename = "LaunchExeString", default)]
    launch_exe: String,
    #[serde(rename = "LaunchCommand", default)]
    launch_command: String,
    #[serde(rename = "PrereqIds", default)]
    prereq_ids: Vec<String>,
    #[serde(rename = "PrereqName", default)]
    prereq_name: String,
    #[serde(rename = "PrereqPath", default)]
    prereq_path: String,
    #[serde(rename = "PrereqArgs", default)]
    prereq_args: String,
    #[serde(rename = "BuildId", default)]
    build_id: String,
    #[serde(rename = "FileManifestList", default)]
    files: Vec<JsonFileManifest>,
    #[serde(rename = "ChunkHashList", default)]
    chunk_hashes: BTreeMap<String, JsonNumber>,
    #[serde(rename = "ChunkShaList", default)]
    chunk_shas: BTreeMap<String, String>,
    #[serde(rename = "DataGroupList", default)]
    data_groups: BTreeMap<String, JsonNumber>,
    #[serde(rename = "ChunkFilesizeList", default)]
    chunk_file_sizes: BTreeMap<String, JsonNumber>,
    #[serde(rename = "CustomFields", default)]
    custom_fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct JsonFileManifest {
    #[serde(rename = "Filename", default)]
    filename: String,
    #[serde(rename = "SymlinkTarget", default)]
    symlink_target: String,
    #[serde(rename = "FileHash")]
    file_hash: Option<String>,
    #[serde(rename = "FileChunkParts", default)]
    chunk_parts: Vec<JsonChunkPart>,
    #[serde(rename = "InstallTags", default)]
    install_tags: Vec<String>,
    #[serde(rename = "bIsReadOnly", default)]
    is_read_only: bool,
    #[serde(rename = "bIsCompressed", default)]
    is_compressed: bool,
    #[serde(rename = "bIsUnixExecutable", default)]
    is_unix_executable: bool,
}

#[derive(Debug, Deserialize)]
struct JsonChunkPart {
    #[serde(rename = "Guid")]
    guid: String,
    #[serde(rename = "Offset")]
    offset: JsonNumber,
    #[serde(rename = "Size")]
    size: JsonNumber,
}

/// Re-key a GUID-keyed map by parsed GUID
fn by_guid<V>(map: BTreeMap<String, V>) -> Result<BTreeMap<Guid, V>, JsonManifestError> {
    map.into_iter()
        .map(|(key, value)| -> Result<_, JsonManifestError> {
            Ok((key.parse::<Guid>()?, value))
        })
        .collect()
}

impl JsonManifest {
    fn into_manifest(self) -> Result<Manifest, JsonManifestError> {
        let feature_level = match &self.manifest_file_version {
            Some(version) => FeatureLevel(version.to_i32()?).normalized(),
            None => FeatureLevel::ORIGINAL,
        };

        let meta = ManifestMeta {
            feature_level,
            is_file_data: self.is_file_data,
            app_id: self.app_id.as_ref().map(JsonNumber::to_u32).transpose()?.unwrap_or(0),
            app_name: self.app_name,
            build_version: self.build_version,
            launch_exe: self.launch_exe,
            launch_command: self.launch_command,
            prereq_ids: self.prereq_ids,
            prereq_name: self.prereq_name,
            prereq_path: self.prereq_path,
            prereq_args: self.prereq_args,
            build_id: self.build_id,
        };

        let shas = by_guid(self.chunk_shas)?;
        let groups = by_guid(self.data_groups)?;
        let file_sizes = by_guid(self.chunk_file_sizes)?;

        let chunks = by_guid(self.chunk_hashes)?
            .into_iter()
            .map(|(guid, hash)| -> Result<_, JsonManifestError> {
                Ok(ChunkInfo {
                    guid,
                    hash: hash.to_u64()?,
                    sha_hash: shas
                        .get(&guid)
                        .map(|sha| sha.parse::<ShaHash>())
                        .transpose()?
                        .unwrap_or_default(),
                    group_number: groups
                        .get(&guid)
                        .map(JsonNumber::to_u8)
                        .transpose()?
                        .unwrap_or(0),
                    window_size: LEGACY_CHUNK_WINDOW_SIZE,
                    file_size: file_sizes
                        .get(&guid)
                        .map(JsonNumber::to_i64)
                        .transpose()?
                        .unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>, JsonManifestError>>()?;

        let files = self
            .files
            .into_iter()
            .map(JsonFileManifest::into_file_manifest)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            feature_level = %meta.feature_level,
            chunks = chunks.len(),
            files = files.len(),
            "decoded JSON manifest"
        );

        Ok(Manifest {
            meta,
            chunks,
            files,
            custom_fields: self.custom_fields,
        })
    }
}

impl JsonFileManifest {
    fn into_file_manifest(self) -> Result<FileManifest, JsonManifestError> {
        let mut meta_flags = FileMetaFlags::default();
        if self.is_read_only {
            meta_flags.set(FileMetaFlags::READ_ONLY);
        }
        if self.is_compressed {
            meta_flags.set(FileMetaFlags::COMPRESSED);
        }
        if self.is_unix_executable {
            meta_flags.set(FileMetaFlags::UNIX_EXECUTABLE);
        }

        let file_hash = match &self.file_hash {
            Some(hash) => ShaHash::from_bytes(blob::decode_array(hash)?),
            None => ShaHash::default(),
        };

        let mut file_size = 0u64;
        let chunk_parts = self
            .chunk_parts
            .iter()
            .map(|part| -> Result<_, JsonManifestError> {
                let part = ChunkPart {
                    guid: part.guid.parse()?,
                    offset: part.offset.to_u32()?,
                    size: part.size.to_u32()?,
                };
                file_size += u64::from(part.size);
                Ok(part)
            })
            .collect::<Result<Vec<_>, JsonManifestError>>()?;

        Ok(FileManifest {
            filename: self.filename,
            symlink_target: self.symlink_target,
            file_hash,
            meta_flags,
            install_tags: self.install_tags,
            chunk_parts,
            file_size,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUID_A: &str = "1A2B3C4D5E6F708192A3B4C5D6E7F809";

    fn sample_json() -> String {
        let file_hash = blob::encode(&[0x33; 20]);
        format!(
            r#"{{
                "ManifestFileVersion": "013000000000",
                "bIsFileData": false,
                "AppID": "000000000000",
                "AppNameString": "SampleGame",
                "BuildVersionString": "1.0.0",
                "LaunchExeString": "Game.exe",
                "LaunchCommand": "",
                "PrereqIds": ["redist"],
                "PrereqName": "Redist",
                "PrereqPath": "Redist/setup.exe",
                "PrereqArgs": "/q",
                "FileManifestList": [
                    {{
                        "Filename": "Game.exe",
                        "FileHash": "{file_hash}",
                        "FileChunkParts": [
                            {{ "Guid": "{GUID_A}", "Offset": "000000000000", "Size": "100000000000" }},
                            {{ "Guid": "{GUID_A}", "Offset": "100000000000", "Size": "250000000000" }}
                        ],
                        "InstallTags": ["core"],
                        "bIsUnixExecutable": true
                    }}
                ],
                "ChunkHashList": {{ "{GUID_A}": "239205017054136029079062" }},
                "ChunkShaList": {{ "{GUID_A}": "1111111111111111111111111111111111111111" }},
                "DataGroupList": {{ "{GUID_A}": "042" }},
                "ChunkFilesizeList": {{ "{GUID_A}": "123004000000000000000000" }},
                "CustomFields": {{ "BaseUrl": "https://example.invalid" }}
            }}"#
        )
    }

    #[test]
    fn test_parse_json_manifest() {
        let manifest =
            JsonManifestDecoder::parse_str(&sample_json()).expect("Operation should succeed");

        assert_eq!(manifest.meta.feature_level, FeatureLevel::STORES_PREREQUISITE_IDS);
        assert_eq!(manifest.meta.app_name, "SampleGame");
        assert_eq!(manifest.meta.prereq_ids, vec!["redist".to_string()]);
        assert_eq!(manifest.meta.build_id, "");

        assert_eq!(manifest.chunks.len(), 1);
        let chunk = &manifest.chunks[0];
        assert_eq!(chunk.guid.to_string(), GUID_A);
        assert_eq!(
            chunk.hash,
            u64::from_le_bytes([239, 205, 17, 54, 136, 29, 79, 62])
        );
        assert_eq!(chunk.sha_hash, ShaHash::from_bytes([0x11; 20]));
        assert_eq!(chunk.group_number, 42);
        assert_eq!(chunk.window_size, LEGACY_CHUNK_WINDOW_SIZE);
        assert_eq!(chunk.file_size, 123 + 4 * 256);

        let file = &manifest.files[0];
        assert_eq!(file.file_hash, ShaHash::from_bytes([0x33; 20]));
        assert!(file.meta_flags.is_unix_executable());
        assert!(!file.meta_flags.is_read_only());
        assert_eq!(file.chunk_parts[1].offset, 100);
        assert_eq!(file.file_size, 350);
        assert_eq!(manifest.custom_fields["BaseUrl"], "https://example.invalid");
    }

    #[test]
    fn test_broken_json_version() {
        let manifest = JsonManifestDecoder::parse_str(r#"{"ManifestFileVersion": "255000000000"}"#)
            .expect("Operation should succeed");
        assert_eq!(
            manifest.meta.feature_level,
            FeatureLevel::STORES_CHUNK_FILE_SIZES
        );
    }

    #[test]
    fn test_plain_numbers_accepted() {
        let manifest =
            JsonManifestDecoder::parse_str(r#"{"ManifestFileVersion": 10, "AppID": 7}"#)
                .expect("Operation should succeed");
        assert_eq!(manifest.meta.feature_level, FeatureLevel::UNUSED_0);
        assert_eq!(manifest.meta.app_id, 7);
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn test_plain_numbers_must_fit_field() {
        let result = JsonManifestDecoder::parse_str(r#"{"AppID": 4294967297}"#);
        assert!(matches!(
            result,
            Err(JsonManifestError::OutOfRange(ref value, "u32")) if value == "4294967297"
        ));

        let result = JsonManifestDecoder::parse_str(r#"{"AppID": "001000000000001"}"#);
        assert!(matches!(result, Err(JsonManifestError::InvalidBlob(_))));

        let result = JsonManifestDecoder::parse_str(r#"{"AppID": -1}"#);
        assert!(matches!(result, Err(JsonManifestError::OutOfRange(_, "u32"))));

        let result = JsonManifestDecoder::parse_str(&format!(
            r#"{{"ChunkHashList": {{"{GUID_A}": 1}}, "DataGroupList": {{"{GUID_A}": 256}}}}"#
        ));
        assert!(matches!(result, Err(JsonManifestError::OutOfRange(_, "u8"))));

        let result = JsonManifestDecoder::parse_str(r#"{"ManifestFileVersion": 2147483648}"#);
        assert!(matches!(result, Err(JsonManifestError::OutOfRange(_, "i32"))));
    }

    #[test]
    fn test_str_with_byte_order_mark() {
        let manifest = JsonManifestDecoder::parse_str("\u{feff}{\"AppNameString\": \"Bom\"}")
            .expect("Operation should succeed");
        assert_eq!(manifest.meta.app_name, "Bom");
    }

    #[test]
    fn test_invalid_guid_rejected() {
        let result = JsonManifestDecoder::parse_str(r#"{"ChunkHashList": {"nope": "000"}}"#);
        assert!(matches!(result, Err(JsonManifestError::InvalidHex(_))));
    }

    #[test]
    fn test_invalid_blob_rejected() {
        let result = JsonManifestDecoder::parse_str(r#"{"AppID": "12"}"#);
        assert!(matches!(result, Err(JsonManifestError::InvalidBlob(_))));
    }

    #[test]
    fn test_text_decoder_trait() {
        let json = sample_json();
        let manifest = JsonManifestDecoder
            .decode(&mut json.as_bytes())
            .expect("Operation should succeed");
        assert_eq!(manifest.files.len(), 1);

        let err = JsonManifestDecoder
            .decode(&mut "{ not json".as_bytes())
            .expect_err("Test operation should fail");
        assert!(err.to_string().contains("JSON error"));
    }
}
