//! Shared fixtures for integration tests
//!
//! Payloads are laid out with `buildpatch_manifest::test_utils::ManifestWriter`.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use buildpatch_manifest::{
    ChunkInfo, ChunkPart, FeatureLevel, FileManifest, FileMetaFlags, Guid, Manifest,
    ManifestMeta, ShaHash,
};
use buildpatch_manifest::test_utils::ManifestWriter;
use std::collections::BTreeMap;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Route decoder logs to the test output when `RUST_LOG` is set
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Binary container for `manifest` with `padding` unknown bytes after every block
pub fn encode(manifest: &Manifest, padding: usize, compressed: bool) -> Vec<u8> {
    ManifestWriter::container(&ManifestWriter::padded_payload(manifest, padding), compressed)
}

pub fn guid(seed: u32) -> Guid {
    Guid::from_groups([seed, seed.wrapping_mul(31), 0xA5A5_0000 | seed, !seed])
}

/// A manifest shaped like a small game build
pub fn game_manifest() -> Manifest {
    let chunks: Vec<ChunkInfo> = (1..=4)
        .map(|n| ChunkInfo {
            guid: guid(n),
            hash: 0x1000_0000_0000_0000 | u64::from(n),
            sha_hash: ShaHash::from_bytes([n as u8; 20]),
            group_number: (n * 7 % 100) as u8,
            window_size: 1_048_576,
            file_size: 500_000 + i64::from(n),
        })
        .collect();

    let part = |n: u32, offset: u32, size: u32| ChunkPart {
        guid: guid(n),
        offset,
        size,
    };

    let files = vec![
        FileManifest {
            filename: "Engine/Binaries/Win64/Launcher.exe".to_string(),
            file_hash: ShaHash::from_bytes([0xA1; 20]),
            meta_flags: FileMetaFlags::new(FileMetaFlags::READ_ONLY),
            chunk_parts: vec![part(1, 0, 1_048_576), part(2, 0, 24)],
            file_size: 1_048_600,
            ..FileManifest::default()
        },
        FileManifest {
            filename: "Game/Content/Paks/pakchunk0.pak".to_string(),
            file_hash: ShaHash::from_bytes([0xA2; 20]),
            chunk_parts: vec![part(2, 24, 1_000_000), part(3, 0, 4096)],
            file_size: 1_004_096,
            ..FileManifest::default()
        },
        FileManifest {
            filename: "Game/Content/Localization/fr/Game.locres".to_string(),
            file_hash: ShaHash::from_bytes([0xA3; 20]),
            install_tags: vec!["fr".to_string()],
            chunk_parts: vec![part(4, 0, 2048)],
            file_size: 2048,
            ..FileManifest::default()
        },
        FileManifest {
            filename: "Game/Content/Localization/de/Game.locres".to_string(),
            file_hash: ShaHash::from_bytes([0xA4; 20]),
            install_tags: vec!["de".to_string()],
            chunk_parts: vec![part(4, 2048, 1024)],
            file_size: 1024,
            ..FileManifest::default()
        },
        FileManifest {
            filename: "Spiel/Überblick.txt".to_string(),
            file_hash: ShaHash::from_bytes([0xA5; 20]),
            chunk_parts: vec![part(3, 4096, 12)],
            file_size: 12,
            ..FileManifest::default()
        },
    ];

    let mut custom_fields = BTreeMap::new();
    custom_fields.insert("BuildChannel".to_string(), "live".to_string());

    Manifest {
        meta: ManifestMeta {
            feature_level: FeatureLevel::LATEST,
            app_name: "Sample".to_string(),
            build_version: "++Sample+Release-1.0-CL-100".to_string(),
            launch_exe: "Engine/Binaries/Win64/Launcher.exe".to_string(),
            build_id: "bUiLdId".to_string(),
            ..ManifestMeta::default()
        },
        chunks,
        files,
        custom_fields,
    }
}
