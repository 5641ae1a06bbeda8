//! Error types for manifest decoding

use thiserror::Error;

/// Errors that can occur when decoding a build manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The leading bytes match neither the binary magic nor a JSON document
    #[error("Unrecognized manifest format: leading bytes {magic:02x?}")]
    UnrecognizedFormat {
        /// Up to four leading bytes of the input
        magic: Vec<u8>,
    },

    /// A read needed more bytes than remained in the source
    #[error("Truncated manifest data in {section} at offset {position}")]
    Truncated {
        /// Section being decoded when the read failed
        section: &'static str,
        /// Absolute position of the failed read
        position: u64,
    },

    /// A sequence count is negative
    #[error("Invalid element count {count} in {section} at offset {position}")]
    InvalidCount {
        /// Section being decoded
        section: &'static str,
        /// Declared element count
        count: i64,
        /// Absolute position of the count field
        position: u64,
    },

    /// A length-prefixed string is not valid UTF-16
    #[error("Invalid string encoding in {section} at offset {position}")]
    InvalidString {
        /// Section being decoded
        section: &'static str,
        /// Absolute position of the string length field
        position: u64,
    },

    /// The payload is flagged as encrypted
    #[error("Encrypted manifest payloads are not supported")]
    EncryptedPayload,

    /// A declared payload size exceeds the configured limit
    #[error("Payload size {declared} exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Declared size in bytes
        declared: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// The zlib-compressed payload could not be inflated
    #[error("Payload decompression failed: {0}")]
    DecompressionFailed(String),

    /// The text-format decoder rejected the input
    #[error("Text manifest decoding failed: {0}")]
    TextDecoder(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `BinRW` parsing error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl ManifestError {
    /// Whether this error means the input ended early
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

/// Type alias for manifest decoding results
pub type Result<T> = std::result::Result<T, ManifestError>;
