//! Decoded manifest structures

use crate::flags::FileMetaFlags;
use crate::guid::{Guid, ShaHash};
use crate::version::FeatureLevel;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A decoded build manifest
///
/// Produced once by a decode call; nothing in it is mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Build metadata
    pub meta: ManifestMeta,
    /// Chunk catalog
    pub chunks: Vec<ChunkInfo>,
    /// Files in the build
    pub files: Vec<FileManifest>,
    /// Free-form key/value fields
    pub custom_fields: BTreeMap<String, String>,
}

/// Build metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestMeta {
    /// Feature level the build was created with, regardless of encoding
    pub feature_level: FeatureLevel,
    /// Whether this is a legacy file-data (no chunks) build
    pub is_file_data: bool,
    /// App id provided at generation
    pub app_id: u32,
    /// App name provided at generation
    pub app_name: String,
    /// Build version provided at generation
    pub build_version: String,
    /// Launch executable within the build
    pub launch_exe: String,
    /// Command line for the launch executable
    pub launch_command: String,
    /// Prerequisite ids applied by the prerequisite installer
    pub prereq_ids: Vec<String>,
    /// Display name of the prerequisite installer
    pub prereq_name: String,
    /// Path of the prerequisite installer within the build
    pub prereq_path: String,
    /// Command line for the prerequisite installer
    pub prereq_args: String,
    /// Unique build id, empty when not serialized
    pub build_id: String,
}

/// Catalog entry for one chunk of build data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    /// Chunk identifier
    pub guid: Guid,
    /// Rolling hash of the chunk data
    pub hash: u64,
    /// SHA1 of the chunk data
    pub sha_hash: ShaHash,
    /// Group (directory shard) the chunk belongs to
    pub group_number: u8,
    /// Logical chunk length used for hashing
    pub window_size: u32,
    /// Download size of the chunk file
    pub file_size: i64,
}

impl ChunkInfo {
    /// Path of the chunk file relative to the distribution root
    pub fn relative_path(&self, feature_level: FeatureLevel) -> String {
        let directory = feature_level.chunk_directory();
        if feature_level < FeatureLevel::DATA_FILE_RENAMES {
            format!("{directory}/{:02}/{}.chunk", self.group_number, self.guid)
        } else {
            format!(
                "{directory}/{:02}/{:016X}_{}.chunk",
                self.group_number, self.hash, self.guid
            )
        }
    }
}

/// One file of the build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileManifest {
    /// Build-relative path
    pub filename: String,
    /// Link target; non-empty only for symlinks
    pub symlink_target: String,
    /// SHA1 of the whole file
    pub file_hash: ShaHash,
    /// Attribute flags
    pub meta_flags: FileMetaFlags,
    /// Install tags for selective installs
    pub install_tags: Vec<String>,
    /// Chunk ranges concatenated to rebuild the file
    pub chunk_parts: Vec<ChunkPart>,
    /// Sum of the chunk part sizes
    pub file_size: u64,
}

impl FileManifest {
    /// Check for a symlink entry
    pub fn is_symlink(&self) -> bool {
        !self.symlink_target.is_empty()
    }

    /// Files without install tags belong to every install
    pub fn is_untagged(&self) -> bool {
        self.install_tags.is_empty()
    }

    /// Check whether the file carries a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.install_tags.iter().any(|t| t == tag)
    }
}

/// A byte range within one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChunkPart {
    /// Chunk holding the data
    pub guid: Guid,
    /// Offset of the first byte within the chunk
    pub offset: u32,
    /// Length of the range
    pub size: u32,
}

/// A chunk part that does not fit its chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPartIssue {
    /// The referenced GUID is not in the chunk catalog
    UnknownChunk {
        /// File containing the part
        filename: String,
        /// Referenced chunk
        guid: Guid,
    },
    /// `offset + size` exceeds the chunk window size
    OutOfBounds {
        /// File containing the part
        filename: String,
        /// Offending part
        part: ChunkPart,
        /// Window size of the chunk
        window_size: u32,
    },
}

/// Summary statistics for a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManifestStats {
    /// Number of files
    pub file_count: usize,
    /// Number of chunks in the catalog
    pub chunk_count: usize,
    /// Number of chunk parts over all files
    pub chunk_part_count: usize,
    /// Total installed size in bytes
    pub build_size: u64,
    /// Total size of all chunk downloads in bytes
    pub download_size: u64,
}

impl Manifest {
    /// Find a chunk by GUID
    pub fn chunk(&self, guid: &Guid) -> Option<&ChunkInfo> {
        self.chunks.iter().find(|chunk| chunk.guid == *guid)
    }

    /// Index the chunk catalog by GUID
    pub fn chunk_lookup(&self) -> HashMap<Guid, &ChunkInfo> {
        self.chunks.iter().map(|chunk| (chunk.guid, chunk)).collect()
    }

    /// Find a file by its build-relative path
    pub fn file(&self, filename: &str) -> Option<&FileManifest> {
        self.files.iter().find(|file| file.filename == filename)
    }

    /// Total installed size of the build
    pub fn build_size(&self) -> u64 {
        self.files.iter().map(|file| file.file_size).sum()
    }

    /// Total download size of every chunk in the catalog
    pub fn download_size(&self) -> u64 {
        self.chunks
            .iter()
            .map(|chunk| u64::try_from(chunk.file_size).unwrap_or(0))
            .sum()
    }

    /// Every install tag used by any file, sorted
    pub fn install_tags(&self) -> BTreeSet<&str> {
        self.files
            .iter()
            .flat_map(|file| file.install_tags.iter().map(String::as_str))
            .collect()
    }

    /// Files selected by a set of install tags
    ///
    /// Untagged files are always selected.
    pub fn files_for_tags<'a>(
        &'a self,
        tags: &'a [&str],
    ) -> impl Iterator<Item = &'a FileManifest> + 'a {
        self.files
            .iter()
            .filter(move |file| file.is_untagged() || tags.iter().any(|tag| file.has_tag(tag)))
    }

    /// Chunks referenced by the given files, in catalog order
    pub fn chunks_for_files<'a>(
        &'a self,
        files: impl IntoIterator<Item = &'a FileManifest>,
    ) -> Vec<&'a ChunkInfo> {
        let referenced: HashSet<Guid> = files
            .into_iter()
            .flat_map(|file| file.chunk_parts.iter().map(|part| part.guid))
            .collect();

        self.chunks
            .iter()
            .filter(|chunk| referenced.contains(&chunk.guid))
            .collect()
    }

    /// Check that every chunk part lies within a known chunk
    ///
    /// The decoder never runs this; it is for consumers that are about to
    /// reassemble files.
    pub fn validate_chunk_parts(&self) -> Vec<ChunkPartIssue> {
        let lookup = self.chunk_lookup();
        let mut issues = Vec::new();

        for file in &self.files {
            for part in &file.chunk_parts {
                match lookup.get(&part.guid) {
                    None => issues.push(ChunkPartIssue::UnknownChunk {
                        filename: file.filename.clone(),
                        guid: part.guid,
                    }),
                    Some(chunk)
                        if u64::from(part.offset) + u64::from(part.size)
                            > u64::from(chunk.window_size) =>
                    {
                        issues.push(ChunkPartIssue::OutOfBounds {
                            filename: file.filename.clone(),
                            part: *part,
                            window_size: chunk.window_size,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }

    /// Summary statistics
    pub fn stats(&self) -> ManifestStats {
        ManifestStats {
            file_count: self.files.len(),
            chunk_count: self.chunks.len(),
            chunk_part_count: self.files.iter().map(|file| file.chunk_parts.len()).sum(),
            build_size: self.build_size(),
            download_size: self.download_size(),
        }
    }
}
