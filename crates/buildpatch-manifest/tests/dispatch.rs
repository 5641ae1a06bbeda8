#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for format detection and decoder routing

mod common;

use buildpatch_manifest::{
    DecodeOptions, MANIFEST_MAGIC, Manifest, ManifestDecoder, ManifestError, ManifestFormat,
    TextDecoder,
};
use common::{encode, game_manifest};
use std::error::Error;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Text decoder that echoes the document it was handed as the app name
struct Recorder;

impl TextDecoder for Recorder {
    fn decode(&self, source: &mut dyn Read) -> Result<Manifest, Box<dyn Error + Send + Sync>> {
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        if text.contains("fail") {
            return Err("rejected by recorder".into());
        }

        let mut manifest = Manifest::default();
        manifest.meta.app_name = text;
        Ok(manifest)
    }
}

#[test]
fn dispatch_brace_in_lead_bytes_selects_text() {
    for document in ["{}", "  {}", "\t\n\r{ }", "abc{"] {
        assert_eq!(
            ManifestFormat::detect(document.as_bytes()),
            Some(ManifestFormat::Json),
            "{document:?}"
        );
    }
    assert_eq!(ManifestFormat::detect(b"abcd{"), None);
}

#[test]
fn dispatch_text_decoder_gets_whole_document() {
    let decoder =
        ManifestDecoder::new(DecodeOptions::default()).with_text_decoder(Recorder);
    let manifest = decoder
        .decode_bytes(b"  {\"anything\": true}")
        .expect("Operation should succeed");
    assert_eq!(manifest.meta.app_name, "  {\"anything\": true}");
}

#[test]
fn dispatch_binary_does_not_reach_text_decoder() {
    let decoder = ManifestDecoder::new(DecodeOptions::default()).with_text_decoder(Recorder);
    let data = encode(&game_manifest(), 0, true);

    let manifest = decoder.decode_bytes(&data).expect("Operation should succeed");
    assert_eq!(manifest, game_manifest());
}

#[test]
fn dispatch_text_decoder_error_is_wrapped() {
    let decoder =
        ManifestDecoder::new(DecodeOptions::default()).with_text_decoder(Recorder);
    let err = decoder
        .decode_bytes(b"{fail}")
        .expect_err("Test operation should fail");

    match err {
        ManifestError::TextDecoder(source) => {
            assert_eq!(source.to_string(), "rejected by recorder");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dispatch_unknown_lead_bytes() {
    let decoder = ManifestDecoder::new(DecodeOptions::default());

    let err = decoder
        .decode_bytes(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A])
        .expect_err("Test operation should fail");
    match err {
        ManifestError::UnrecognizedFormat { magic } => {
            assert_eq!(magic, vec![0x89, b'P', b'N', b'G']);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Byte-swapped magic
    let err = decoder
        .decode_bytes(&MANIFEST_MAGIC.to_be_bytes())
        .expect_err("Test operation should fail");
    assert!(matches!(err, ManifestError::UnrecognizedFormat { .. }));
}

#[test]
fn dispatch_short_input() {
    let decoder = ManifestDecoder::new(DecodeOptions::default());
    for len in 0..4 {
        let data = &MANIFEST_MAGIC.to_le_bytes()[..len];
        let err = decoder
            .decode_bytes(data)
            .expect_err("Test operation should fail");
        assert!(
            matches!(err, ManifestError::UnrecognizedFormat { ref magic } if magic.len() == len),
            "length {len}: {err}"
        );
    }
}

#[test]
fn dispatch_magic_with_no_header() {
    let err = ManifestDecoder::new(DecodeOptions::default())
        .decode_bytes(&MANIFEST_MAGIC.to_le_bytes())
        .expect_err("Test operation should fail");
    assert!(err.is_truncated());
}

#[test]
fn dispatch_reads_from_current_position() {
    let mut data = b"unrelated prefix".to_vec();
    let origin = data.len() as u64;
    data.extend_from_slice(&encode(&game_manifest(), 5, false));

    let mut cursor = Cursor::new(data);
    cursor.seek(SeekFrom::Start(origin)).expect("Operation should succeed");

    let decoder = ManifestDecoder::new(DecodeOptions::default());
    let manifest = decoder.decode(&mut cursor).expect("Operation should succeed");
    assert_eq!(manifest, game_manifest());
}
