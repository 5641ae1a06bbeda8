//! Parsers for the four blocks of a binary manifest payload
//!
//! Every block starts with its own `u32` byte length and a one-byte data
//! version, and is read through [`ArchiveReader::read_section`] so that
//! fields added by newer producers are skipped. The list blocks store their
//! records column by column: every value of the first field, then every
//! value of the second, and so on.

mod chunk_list;
mod custom_fields;
mod file_list;
mod meta;

pub use chunk_list::read_chunk_data_list;
pub use custom_fields::read_custom_fields;
pub use file_list::{read_chunk_part, read_file_manifest_list};
pub use meta::read_manifest_meta;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::reader::ArchiveReader;
use std::io::{Read, Seek};
use tracing::debug;

/// Read all four blocks from a decompressed payload
pub fn read_manifest<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> Result<Manifest> {
    let meta = reader.read_section("ManifestMeta", read_manifest_meta)?;
    let chunks = reader.read_section("ChunkDataList", read_chunk_data_list)?;
    let files = reader.read_section("FileManifestList", read_file_manifest_list)?;
    let custom_fields = reader.read_section("CustomFields", read_custom_fields)?;

    debug!(
        app = %meta.app_name,
        version = %meta.build_version,
        chunks = chunks.len(),
        files = files.len(),
        custom_fields = custom_fields.len(),
        "decoded binary manifest"
    );

    Ok(Manifest {
        meta,
        chunks,
        files,
        custom_fields,
    })
}
