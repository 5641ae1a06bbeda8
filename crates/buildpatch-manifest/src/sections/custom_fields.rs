//! Custom fields block

use crate::reader::ArchiveReader;
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use tracing::trace;

/// Read the custom fields following the block length
///
/// All keys are stored before all values. A key that appears twice keeps
/// the value stored last.
pub fn read_custom_fields<R: Read + Seek>(
    reader: &mut ArchiveReader<R>,
) -> BTreeMap<String, String> {
    let data_version = reader.read_u8();
    let count = reader.read_count(8);
    trace!(data_version, count, "custom fields");

    let keys = reader.read_array(count, ArchiveReader::read_string);
    let values = reader.read_array(count, ArchiveReader::read_string);

    let mut fields = BTreeMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        fields.insert(key, value);
    }
    fields
}
