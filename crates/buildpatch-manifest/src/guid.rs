//! GUID and SHA1 hash value types

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a SHA1 digest in bytes
pub const SHA_HASH_SIZE: usize = 20;

/// 128-bit chunk identifier
///
/// Stored in canonical order: four 32-bit groups, each most significant
/// byte first. The text form is the 32 uppercase hex digits used in chunk
/// file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid([u8; 16]);

impl Guid {
    /// The all-zero GUID
    pub const NIL: Self = Self([0; 16]);

    /// Create a GUID from canonical bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create a GUID from its four 32-bit groups
    pub fn from_groups(groups: [u32; 4]) -> Self {
        let mut bytes = [0u8; 16];
        for (chunk, group) in bytes.chunks_exact_mut(4).zip(groups) {
            chunk.copy_from_slice(&group.to_be_bytes());
        }
        Self(bytes)
    }

    /// The four 32-bit groups
    pub fn groups(&self) -> [u32; 4] {
        let mut groups = [0u32; 4];
        for (group, chunk) in groups.iter_mut().zip(self.0.chunks_exact(4)) {
            *group = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        groups
    }

    /// Canonical bytes
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Check for the all-zero GUID
    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Error returned when parsing a GUID or hash from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex value {value:?}: expected {expected} hex digits")]
pub struct ParseHexError {
    value: String,
    expected: usize,
}

impl FromStr for Guid {
    type Err = ParseHexError;

    /// Parse 32 hex digits, optionally grouped with dashes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| ParseHexError {
            value: s.to_string(),
            expected: 32,
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 160-bit SHA1 digest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaHash([u8; SHA_HASH_SIZE]);

impl ShaHash {
    /// Wrap raw digest bytes
    pub const fn from_bytes(bytes: [u8; SHA_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    pub const fn as_bytes(&self) -> &[u8; SHA_HASH_SIZE] {
        &self.0
    }

    /// A zero hash means the producer did not record one
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ShaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ShaHash {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; SHA_HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseHexError {
            value: s.to_string(),
            expected: SHA_HASH_SIZE * 2,
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for ShaHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
