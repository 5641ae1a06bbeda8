//! Storage flags for the container header and meta flags for file entries

use serde::Serialize;
use std::fmt;

/// How the manifest payload is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StorageFlags {
    /// Raw flag value
    pub value: u8,
}

impl StorageFlags {
    /// Stored as raw data
    pub const NONE: u8 = 0x00;

    /// Payload is zlib compressed
    pub const COMPRESSED: u8 = 0x01;

    /// Payload is encrypted; decrypt before decompressing
    pub const ENCRYPTED: u8 = 0x02;

    /// Create storage flags from raw value
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// Check if flag is set
    pub const fn has(&self, flag: u8) -> bool {
        (self.value & flag) != 0
    }

    /// Check for zlib compression
    pub const fn is_compressed(&self) -> bool {
        self.has(Self::COMPRESSED)
    }

    /// Check for encryption
    pub const fn is_encrypted(&self) -> bool {
        self.has(Self::ENCRYPTED)
    }
}

/// Per-file attribute flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileMetaFlags {
    /// Raw flag value
    pub value: u8,
}

impl FileMetaFlags {
    /// No special flags
    pub const NONE: u8 = 0x00;

    /// Read-only file
    pub const READ_ONLY: u8 = 0x01;

    /// Natively compressed file
    pub const COMPRESSED: u8 = 0x02;

    /// Unix executable
    pub const UNIX_EXECUTABLE: u8 = 0x04;

    /// Create meta flags from raw value
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// Check if flag is set
    pub const fn has(&self, flag: u8) -> bool {
        (self.value & flag) != 0
    }

    /// Set flag
    pub fn set(&mut self, flag: u8) {
        self.value |= flag;
    }

    /// Check read-only flag
    pub const fn is_read_only(&self) -> bool {
        self.has(Self::READ_ONLY)
    }

    /// Check natively compressed flag
    pub const fn is_compressed(&self) -> bool {
        self.has(Self::COMPRESSED)
    }

    /// Check unix executable flag
    pub const fn is_unix_executable(&self) -> bool {
        self.has(Self::UNIX_EXECUTABLE)
    }
}

impl fmt::Display for FileMetaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_read_only() {
            names.push("ReadOnly");
        }
        if self.is_compressed() {
            names.push("Compressed");
        }
        if self.is_unix_executable() {
            names.push("UnixExecutable");
        }

        if names.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
