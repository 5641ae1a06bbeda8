//! File manifest list block

use crate::flags::FileMetaFlags;
use crate::manifest::{ChunkPart, FileManifest};
use crate::reader::ArchiveReader;
use std::io::{Read, Seek};
use tracing::trace;

/// Smallest encoding of one file across all columns: two empty strings, a
/// hash, the flags byte and two empty sequences
const FILE_MANIFEST_MIN_SIZE: u64 = 4 + 4 + 20 + 1 + 4 + 4;

/// Smallest encoding of a chunk part block
const CHUNK_PART_MIN_SIZE: u64 = 4 + 16 + 4 + 4;

/// Read the file list following the block length
///
/// Columns, in order: filenames, symlink targets, file hashes, meta flags,
/// install tag sequences and chunk part sequences. The file size is the
/// running sum of the chunk part sizes.
pub fn read_file_manifest_list<R: Read + Seek>(
    reader: &mut ArchiveReader<R>,
) -> Vec<FileManifest> {
    let data_version = reader.read_u8();
    let count = reader.read_count(FILE_MANIFEST_MIN_SIZE);
    trace!(data_version, count, "file manifest list");

    let mut files = vec![FileManifest::default(); count];
    for file in &mut files {
        file.filename = reader.read_string();
    }
    for file in &mut files {
        file.symlink_target = reader.read_string();
    }
    for file in &mut files {
        file.file_hash = reader.read_sha_hash();
    }
    for file in &mut files {
        file.meta_flags = FileMetaFlags::new(reader.read_u8());
    }
    for file in &mut files {
        file.install_tags = reader.read_string_sequence();
    }
    for file in &mut files {
        let part_count = reader.read_count(CHUNK_PART_MIN_SIZE);
        let mut file_size = 0u64;
        file.chunk_parts = reader.read_array(part_count, |reader| {
            let part = reader.read_block(read_chunk_part);
            file_size += u64::from(part.size);
            part
        });
        file.file_size = file_size;
    }

    files
}

/// Read one chunk part following its block length
pub fn read_chunk_part<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> ChunkPart {
    ChunkPart {
        guid: reader.read_guid_segmented(),
        offset: reader.read_u32(),
        size: reader.read_u32(),
    }
}
