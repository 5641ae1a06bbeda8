//! Manifest metadata block

use crate::manifest::ManifestMeta;
use crate::reader::ArchiveReader;
use crate::version::{FeatureLevel, ManifestMetaVersion};
use std::io::{Read, Seek};
use tracing::trace;

/// Read the metadata fields following the block length
///
/// The build id is only present from `SerialisesBuildId` onwards.
pub fn read_manifest_meta<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> ManifestMeta {
    let data_version = ManifestMetaVersion(reader.read_u8());
    trace!(data_version = data_version.0, "manifest meta");

    let mut meta = ManifestMeta {
        feature_level: FeatureLevel(reader.read_i32()),
        is_file_data: reader.read_bool(),
        app_id: reader.read_u32(),
        app_name: reader.read_string(),
        build_version: reader.read_string(),
        launch_exe: reader.read_string(),
        launch_command: reader.read_string(),
        prereq_ids: reader.read_string_sequence(),
        prereq_name: reader.read_string(),
        prereq_path: reader.read_string(),
        prereq_args: reader.read_string(),
        build_id: String::new(),
    };

    if data_version >= ManifestMetaVersion::SERIALISES_BUILD_ID {
        meta.build_id = reader.read_string();
    }

    meta
}
