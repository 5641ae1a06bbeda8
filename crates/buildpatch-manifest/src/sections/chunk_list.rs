//! Chunk data list block

use crate::manifest::ChunkInfo;
use crate::reader::ArchiveReader;
use std::io::{Read, Seek};
use tracing::trace;

/// Encoded size of one chunk record across all columns
const CHUNK_INFO_SIZE: u64 = 16 + 8 + 20 + 1 + 4 + 8;

/// Read the chunk catalog following the block length
///
/// Records are stored column by column: every GUID, then every rolling
/// hash, every SHA1, every group number, every window size and finally
/// every file size.
pub fn read_chunk_data_list<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> Vec<ChunkInfo> {
    let data_version = reader.read_u8();
    let count = reader.read_count(CHUNK_INFO_SIZE);
    trace!(data_version, count, "chunk data list");

    let mut chunks = vec![ChunkInfo::default(); count];
    for chunk in &mut chunks {
        chunk.guid = reader.read_guid_segmented();
    }
    for chunk in &mut chunks {
        chunk.hash = reader.read_u64();
    }
    for chunk in &mut chunks {
        chunk.sha_hash = reader.read_sha_hash();
    }
    for chunk in &mut chunks {
        chunk.group_number = reader.read_u8();
    }
    for chunk in &mut chunks {
        chunk.window_size = reader.read_u32();
    }
    for chunk in &mut chunks {
        chunk.file_size = reader.read_i64();
    }

    chunks
}
