//! Test utilities for building manifest fixtures
//!
//! The crate never writes manifests; this writer exists so tests can lay
//! out payloads byte by byte, including layouts only newer producers emit.
//! Integration tests reach it through the `test-utils` feature.

use crate::flags::StorageFlags;
use crate::guid::{Guid, ShaHash};
use crate::header::ManifestHeader;
use crate::manifest::{ChunkInfo, ChunkPart, FileManifest, Manifest, ManifestMeta};
use crate::version::{FeatureLevel, ManifestMetaVersion};
use binrw::BinWrite;
use binrw::io::Cursor;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::collections::BTreeMap;
use std::io::Write;

/// Little-endian byte writer mirroring `ArchiveReader`
#[derive(Debug, Default)]
pub struct ManifestWriter {
    buf: Vec<u8>,
    padding: usize,
}

impl ManifestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer that appends `padding` unknown bytes to every block
    pub fn with_padding(padding: usize) -> Self {
        Self {
            buf: Vec::new(),
            padding,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes(&[value])
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.u32(u32::from(value))
    }

    pub fn guid(&mut self, guid: Guid) -> &mut Self {
        for group in guid.groups() {
            self.u32(group);
        }
        self
    }

    pub fn sha(&mut self, hash: ShaHash) -> &mut Self {
        self.bytes(hash.as_bytes())
    }

    /// ASCII strings are written as single-byte characters, anything else
    /// as UTF-16; both with a trailing NUL
    pub fn string(&mut self, value: &str) -> &mut Self {
        if value.is_empty() {
            return self.i32(0);
        }

        if value.is_ascii() {
            self.i32(value.len() as i32 + 1);
            self.bytes(value.as_bytes());
            self.u8(0)
        } else {
            let units: Vec<u16> = value.encode_utf16().chain([0]).collect();
            self.i32(-(units.len() as i32));
            for unit in units {
                self.bytes(&unit.to_le_bytes());
            }
            self
        }
    }

    pub fn strings<S: AsRef<str>>(&mut self, values: &[S]) -> &mut Self {
        self.i32(values.len() as i32);
        for value in values {
            self.string(value.as_ref());
        }
        self
    }

    /// Write a size-prefixed block with the writer's padding
    pub fn block(&mut self, fields: impl FnOnce(&mut Self)) -> &mut Self {
        self.padded(self.padding, fields)
    }

    /// Write a size-prefixed block with `padding` unknown bytes after the fields
    pub fn padded(&mut self, padding: usize, fields: impl FnOnce(&mut Self)) -> &mut Self {
        let start = self.buf.len();
        self.u32(0);
        fields(self);
        self.buf.extend(std::iter::repeat_n(0xEE, padding));

        let length = (self.buf.len() - start) as u32;
        self.buf[start..start + 4].copy_from_slice(&length.to_le_bytes());
        self
    }

    pub fn meta_fields(&mut self, meta: &ManifestMeta, version: ManifestMetaVersion) -> &mut Self {
        self.u8(version.0)
            .i32(meta.feature_level.0)
            .bool(meta.is_file_data)
            .u32(meta.app_id)
            .string(&meta.app_name)
            .string(&meta.build_version)
            .string(&meta.launch_exe)
            .string(&meta.launch_command)
            .strings(&meta.prereq_ids)
            .string(&meta.prereq_name)
            .string(&meta.prereq_path)
            .string(&meta.prereq_args);
        if version >= ManifestMetaVersion::SERIALISES_BUILD_ID {
            self.string(&meta.build_id);
        }
        self
    }

    pub fn chunk_list_fields(&mut self, chunks: &[ChunkInfo]) -> &mut Self {
        self.u8(0).i32(chunks.len() as i32);
        for chunk in chunks {
            self.guid(chunk.guid);
        }
        for chunk in chunks {
            self.u64(chunk.hash);
        }
        for chunk in chunks {
            self.sha(chunk.sha_hash);
        }
        for chunk in chunks {
            self.u8(chunk.group_number);
        }
        for chunk in chunks {
            self.u32(chunk.window_size);
        }
        for chunk in chunks {
            self.i64(chunk.file_size);
        }
        self
    }

    pub fn chunk_part(&mut self, part: &ChunkPart) -> &mut Self {
        self.block(|w| {
            w.guid(part.guid).u32(part.offset).u32(part.size);
        })
    }

    pub fn file_list_fields(&mut self, files: &[FileManifest]) -> &mut Self {
        self.u8(0).i32(files.len() as i32);
        for file in files {
            self.string(&file.filename);
        }
        for file in files {
            self.string(&file.symlink_target);
        }
        for file in files {
            self.sha(file.file_hash);
        }
        for file in files {
            self.u8(file.meta_flags.value);
        }
        for file in files {
            self.strings(&file.install_tags);
        }
        for file in files {
            self.i32(file.chunk_parts.len() as i32);
            for part in &file.chunk_parts {
                self.chunk_part(part);
            }
        }
        self
    }

    pub fn custom_fields_fields(&mut self, fields: &BTreeMap<String, String>) -> &mut Self {
        self.u8(0).i32(fields.len() as i32);
        for key in fields.keys() {
            self.string(key);
        }
        for value in fields.values() {
            self.string(value);
        }
        self
    }

    pub fn meta(&mut self, meta: &ManifestMeta, version: ManifestMetaVersion) -> &mut Self {
        self.block(|w| {
            w.meta_fields(meta, version);
        })
    }

    pub fn chunk_list(&mut self, chunks: &[ChunkInfo]) -> &mut Self {
        self.block(|w| {
            w.chunk_list_fields(chunks);
        })
    }

    pub fn file_list(&mut self, files: &[FileManifest]) -> &mut Self {
        self.block(|w| {
            w.file_list_fields(files);
        })
    }

    pub fn custom_fields(&mut self, fields: &BTreeMap<String, String>) -> &mut Self {
        self.block(|w| {
            w.custom_fields_fields(fields);
        })
    }

    /// Uncompressed payload holding all four blocks
    pub fn payload(manifest: &Manifest) -> Vec<u8> {
        Self::padded_payload(manifest, 0)
    }

    /// Uncompressed payload with `padding` unknown bytes after every block,
    /// chunk parts included
    pub fn padded_payload(manifest: &Manifest, padding: usize) -> Vec<u8> {
        let mut writer = Self::with_padding(padding);
        writer
            .meta(&manifest.meta, ManifestMetaVersion::LATEST)
            .chunk_list(&manifest.chunks)
            .file_list(&manifest.files)
            .custom_fields(&manifest.custom_fields);
        writer.into_bytes()
    }

    /// Header followed by the payload, zlib compressed when asked
    pub fn container(payload: &[u8], compressed: bool) -> Vec<u8> {
        let stored = if compressed {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(payload).expect("Operation should succeed");
            encoder.finish().expect("Operation should succeed")
        } else {
            payload.to_vec()
        };
        let flags = if compressed {
            StorageFlags::COMPRESSED
        } else {
            StorageFlags::NONE
        };

        let header = ManifestHeader::new(
            payload.len() as u32,
            stored.len() as u32,
            flags,
            FeatureLevel::LATEST,
        );
        let mut out = Vec::new();
        header
            .write(&mut Cursor::new(&mut out))
            .expect("Operation should succeed");
        out.extend_from_slice(&stored);
        out
    }
}

/// A small manifest touching every field
pub fn sample_manifest() -> Manifest {
    let chunk_a = Guid::from_groups([0x1A2B_3C4D, 0x5E6F_7081, 0x92A3_B4C5, 0xD6E7_F809]);
    let chunk_b = Guid::from_groups([0xCAFE_BABE, 0, 0xFFFF_0000, 1]);

    let chunks = vec![
        ChunkInfo {
            guid: chunk_a,
            hash: 0x0123_4567_89AB_CDEF,
            sha_hash: ShaHash::from_bytes([0x11; 20]),
            group_number: 42,
            window_size: 1_048_576,
            file_size: 400_123,
        },
        ChunkInfo {
            guid: chunk_b,
            hash: 0xFEDC_BA98_7654_3210,
            sha_hash: ShaHash::from_bytes([0x22; 20]),
            group_number: 3,
            window_size: 262_144,
            file_size: 100_000,
        },
    ];

    let files = vec![
        FileManifest {
            filename: "Game/Binaries/Win64/Game.exe".to_string(),
            file_hash: ShaHash::from_bytes([0x33; 20]),
            meta_flags: crate::flags::FileMetaFlags::new(
                crate::flags::FileMetaFlags::UNIX_EXECUTABLE,
            ),
            chunk_parts: vec![
                ChunkPart {
                    guid: chunk_a,
                    offset: 0,
                    size: 1_048_576,
                },
                ChunkPart {
                    guid: chunk_b,
                    offset: 0,
                    size: 1000,
                },
            ],
            file_size: 1_049_576,
            ..FileManifest::default()
        },
        FileManifest {
            filename: "Game/Content/Movies/Intro.bk2".to_string(),
            file_hash: ShaHash::from_bytes([0x44; 20]),
            install_tags: vec!["movies".to_string(), "optional".to_string()],
            chunk_parts: vec![ChunkPart {
                guid: chunk_b,
                offset: 1000,
                size: 5000,
            }],
            file_size: 5000,
            ..FileManifest::default()
        },
        FileManifest {
            filename: "Game/Latest.exe".to_string(),
            symlink_target: "Game/Binaries/Win64/Game.exe".to_string(),
            ..FileManifest::default()
        },
    ];

    let mut custom_fields = BTreeMap::new();
    custom_fields.insert("CloudDir".to_string(), "https://example.invalid/cloud".to_string());
    custom_fields.insert("BaseUrl".to_string(), "https://example.invalid".to_string());

    Manifest {
        meta: ManifestMeta {
            feature_level: FeatureLevel::USES_BUILD_TIME_GENERATED_BUILD_ID,
            is_file_data: false,
            app_id: 0,
            app_name: "SampleGame".to_string(),
            build_version: "1.2.3-CL-4567+Windows".to_string(),
            launch_exe: "Game/Binaries/Win64/Game.exe".to_string(),
            launch_command: "-nosplash".to_string(),
            prereq_ids: vec!["vcredist-2019".to_string()],
            prereq_name: "Sample Prerequisites (x64)".to_string(),
            prereq_path: "Prereqs/Setup.exe".to_string(),
            prereq_args: "/quiet /norestart".to_string(),
            build_id: "rFq3hTtS0UmD5K3dfWIdhw==".to_string(),
        },
        chunks,
        files,
        custom_fields,
    }
}
