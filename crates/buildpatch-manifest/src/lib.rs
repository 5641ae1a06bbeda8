//! Decoder for BuildPatch build manifests
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_sign_loss)] // Counts validated before conversion
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::needless_pass_by_value)] // Configuration types
#![allow(clippy::missing_errors_doc)] // Error variants are documented on ManifestError
#![allow(clippy::must_use_candidate)] // Accessor-heavy API
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! A build manifest describes one version of an application: its metadata,
//! the catalog of content chunks the build is assembled from, the files that
//! make up the build together with the chunk ranges holding their bytes, and
//! a set of free-form custom fields.
//!
//! Two encodings are recognized and decoded into the same [`Manifest`]:
//!
//! - **Binary**: a fixed header starting with [`MANIFEST_MAGIC`] followed by
//!   a payload that may be zlib compressed. The payload holds four
//!   size-prefixed blocks, so data appended by newer producers is skipped.
//! - **JSON**: the older text encoding, handled by a pluggable
//!   [`TextDecoder`] ([`JsonManifestDecoder`] by default).
//!
//! Decoding is read-only. Nothing here writes, patches or downloads.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//!
//! let manifest = buildpatch_manifest::parse(File::open("game.manifest")?)?;
//! println!("{} {}", manifest.meta.app_name, manifest.meta.build_version);
//! for file in &manifest.files {
//!     println!("{} ({} bytes)", file.filename, file.file_size);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

/// Format detection, container unwrapping and decoder configuration
pub mod decoder;
pub mod error;
pub mod flags;
pub mod guid;
/// Binary container header
pub mod header;
/// JSON manifest decoding
///
/// JSON manifests were written by early producers, before the binary
/// container existed. Numbers and hashes are stored as decimal blobs and
/// the chunk catalog is split into one map per chunk field.
pub mod json;
pub mod manifest;
/// Positioned little-endian reader with sticky error state
pub mod reader;
/// Readers for the four blocks of a binary manifest payload
pub mod sections;
pub mod version;

/// Fixture writer for tests, enabled by the `test-utils` feature
#[cfg(any(test, feature = "test-utils"))]
#[allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
pub mod test_utils;

pub use decoder::{DEFAULT_MAX_PAYLOAD_SIZE, DecodeOptions, ManifestDecoder, ManifestFormat};
pub use error::{ManifestError, Result};
pub use flags::{FileMetaFlags, StorageFlags};
pub use guid::{Guid, ShaHash};
pub use header::{MANIFEST_MAGIC, ManifestHeader};
pub use json::{JsonManifestDecoder, JsonManifestError, TextDecoder};
pub use manifest::{ChunkInfo, ChunkPart, ChunkPartIssue, FileManifest, Manifest, ManifestMeta, ManifestStats};
pub use version::{FeatureLevel, ManifestMetaVersion};

use std::io::{Read, Seek};

/// Decode a manifest with default options
///
/// The source is read from its current position. Binary and JSON manifests
/// are told apart by their first four bytes.
pub fn parse<R: Read + Seek>(source: R) -> Result<Manifest> {
    ManifestDecoder::new(DecodeOptions::default()).decode(source)
}

/// Decode a manifest held in memory with default options
pub fn parse_bytes(data: &[u8]) -> Result<Manifest> {
    ManifestDecoder::new(DecodeOptions::default()).decode_bytes(data)
}
