//! Position-tracking archive reader with a sticky error
//!
//! [`ArchiveReader`] wraps any `Read + Seek` source and exposes the primitive
//! reads the manifest format is built from. The first failed read is recorded
//! and every later primitive becomes a no-op returning a zero value, so a
//! parser can read a long run of fields and check for failure once with
//! [`ArchiveReader::check`].
//!
//! All multi-byte integers are little-endian.

use crate::error::{ManifestError, Result};
use crate::guid::{Guid, SHA_HASH_SIZE, ShaHash};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Seekable reader with sticky error state
#[derive(Debug)]
pub struct ArchiveReader<R> {
    inner: R,
    position: u64,
    len: u64,
    section: &'static str,
    error: Option<ManifestError>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Wrap a source, starting at its current position
    ///
    /// The source length is measured once up front so that sequence counts
    /// and string lengths can be checked before anything is allocated.
    pub fn new(inner: R) -> Self {
        let mut reader = Self {
            inner,
            position: 0,
            len: 0,
            section: "Manifest",
            error: None,
        };

        match reader.measure() {
            Ok((position, len)) => {
                reader.position = position;
                reader.len = len;
            }
            Err(e) => reader.fail(ManifestError::Io(e)),
        }

        reader
    }

    fn measure(&mut self) -> std::io::Result<(u64, u64)> {
        let position = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(position))?;
        Ok((position, len))
    }

    /// Name the section that following errors are attributed to
    pub fn set_section(&mut self, section: &'static str) {
        self.section = section;
    }

    /// Section that errors are currently attributed to
    pub fn section(&self) -> &'static str {
        self.section
    }

    /// Current absolute position
    pub fn pos(&self) -> u64 {
        self.position
    }

    /// Move to an absolute position
    ///
    /// Seeking past the end of the source is allowed; only reading there fails.
    pub fn set_pos(&mut self, position: u64) {
        if self.error.is_some() {
            return;
        }

        match self.inner.seek(SeekFrom::Start(position)) {
            Ok(_) => self.position = position,
            Err(e) => self.fail(ManifestError::Io(e)),
        }
    }

    /// Total length of the source in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check for an empty source
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left between the current position and the end of the source
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    /// First recorded error, if any
    pub fn error(&self) -> Option<&ManifestError> {
        self.error.as_ref()
    }

    /// Whether a read has failed
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Return and clear the recorded error
    pub fn check(&mut self) -> Result<()> {
        self.error.take().map_or(Ok(()), Err)
    }

    /// Consume the reader, returning `value` unless a read failed
    pub fn into_result<T>(mut self, value: T) -> Result<T> {
        self.check()?;
        Ok(value)
    }

    /// Unwrap the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fail(&mut self, error: ManifestError) {
        if self.error.is_none() {
            debug!(section = self.section, position = self.position, %error, "manifest read failed");
            self.error = Some(error);
        }
    }

    fn truncated(&mut self) {
        self.fail(ManifestError::Truncated {
            section: self.section,
            position: self.position,
        });
    }

    fn ensure_available(&mut self, count: u64) -> bool {
        if self.error.is_some() {
            return false;
        }
        if count > self.remaining() {
            self.truncated();
            return false;
        }
        true
    }

    fn fill(&mut self, buf: &mut [u8]) -> bool {
        if self.error.is_some() {
            return false;
        }

        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                true
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.truncated();
                false
            }
            Err(e) => {
                self.fail(ManifestError::Io(e));
                false
            }
        }
    }

    fn read_fixed<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0u8; N];
        if self.fill(&mut buf) { buf } else { [0u8; N] }
    }

    /// Read a `u8`
    pub fn read_u8(&mut self) -> u8 {
        u8::from_le_bytes(self.read_fixed())
    }

    /// Read a little-endian `u16`
    pub fn read_u16(&mut self) -> u16 {
        u16::from_le_bytes(self.read_fixed())
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.read_fixed())
    }

    /// Read a little-endian `u64`
    pub fn read_u64(&mut self) -> u64 {
        u64::from_le_bytes(self.read_fixed())
    }

    /// Read an `i8`
    pub fn read_i8(&mut self) -> i8 {
        i8::from_le_bytes(self.read_fixed())
    }

    /// Read a little-endian `i16`
    pub fn read_i16(&mut self) -> i16 {
        i16::from_le_bytes(self.read_fixed())
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&mut self) -> i32 {
        i32::from_le_bytes(self.read_fixed())
    }

    /// Read a little-endian `i64`
    pub fn read_i64(&mut self) -> i64 {
        i64::from_le_bytes(self.read_fixed())
    }

    /// Read a 32-bit boolean; any nonzero value is true
    pub fn read_bool(&mut self) -> bool {
        self.read_u32() != 0
    }

    /// Read a 20-byte SHA1 digest
    pub fn read_sha_hash(&mut self) -> ShaHash {
        ShaHash::from_bytes(self.read_fixed::<SHA_HASH_SIZE>())
    }

    /// Read a GUID stored in canonical byte order
    pub fn read_guid(&mut self) -> Guid {
        Guid::from_bytes(self.read_fixed())
    }

    /// Read a GUID stored as four little-endian 32-bit groups
    pub fn read_guid_segmented(&mut self) -> Guid {
        let groups = [
            self.read_u32(),
            self.read_u32(),
            self.read_u32(),
            self.read_u32(),
        ];
        if self.has_error() {
            return Guid::NIL;
        }
        Guid::from_groups(groups)
    }

    /// Read exactly `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Vec<u8> {
        if !self.ensure_available(count as u64) {
            return Vec::new();
        }

        let mut buf = vec![0u8; count];
        if self.fill(&mut buf) { buf } else { Vec::new() }
    }

    /// Read a length-prefixed string
    ///
    /// A positive length counts single-byte characters, a negative length
    /// counts UTF-16 code units. Either form may carry a trailing NUL, which
    /// is dropped.
    pub fn read_string(&mut self) -> String {
        let start = self.position;
        let length = self.read_i32();
        if self.has_error() || length == 0 {
            return String::new();
        }

        if length > 0 {
            let mut bytes = self.read_bytes(length as usize);
            if bytes.last() == Some(&0) {
                bytes.pop();
            }
            // Single-byte characters map directly onto the first 256 code points
            return bytes.into_iter().map(char::from).collect();
        }

        let units = length.unsigned_abs() as usize;
        let bytes = self.read_bytes(units * 2);
        if self.has_error() {
            return String::new();
        }

        let mut code_units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if code_units.last() == Some(&0) {
            code_units.pop();
        }

        match String::from_utf16(&code_units) {
            Ok(value) => value,
            Err(_) => {
                self.fail(ManifestError::InvalidString {
                    section: self.section,
                    position: start,
                });
                String::new()
            }
        }
    }

    /// Read a 32-bit element count
    ///
    /// Records `InvalidCount` and returns zero for a negative count. A count
    /// whose `count * min_element_size` bytes cannot remain in the source
    /// records `Truncated` at the position of the count.
    pub fn read_count(&mut self, min_element_size: u64) -> usize {
        let position = self.position;
        let count = self.read_i32();
        if self.has_error() {
            return 0;
        }

        let Ok(elements) = usize::try_from(count) else {
            self.fail(ManifestError::InvalidCount {
                section: self.section,
                count: i64::from(count),
                position,
            });
            return 0;
        };

        let fits = (elements as u64)
            .checked_mul(min_element_size.max(1))
            .is_some_and(|needed| needed <= self.remaining());
        if !fits {
            self.fail(ManifestError::Truncated {
                section: self.section,
                position,
            });
            return 0;
        }

        elements
    }

    /// Read `count` elements with `read_element`
    ///
    /// Stops early once a read fails; the returned vector is then incomplete
    /// and the error is left for the caller to check.
    pub fn read_array<T>(
        &mut self,
        count: usize,
        mut read_element: impl FnMut(&mut Self) -> T,
    ) -> Vec<T> {
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            if self.has_error() {
                break;
            }
            items.push(read_element(self));
        }
        items
    }

    /// Read a count-prefixed sequence of elements
    pub fn read_sequence<T>(&mut self, read_element: impl FnMut(&mut Self) -> T) -> Vec<T> {
        let count = self.read_count(1);
        self.read_array(count, read_element)
    }

    /// Read a count-prefixed sequence of strings
    pub fn read_string_sequence(&mut self) -> Vec<String> {
        let count = self.read_count(4);
        self.read_array(count, Self::read_string)
    }

    /// Read a size-prefixed block
    ///
    /// Reads the `u32` block length, runs `parse`, then moves to
    /// `start + length` whether or not `parse` consumed exactly that many
    /// bytes. Fields appended by newer producers are skipped this way.
    pub fn read_block<T>(&mut self, parse: impl FnOnce(&mut Self) -> T) -> T {
        let start = self.position;
        let length = self.read_u32();
        let value = parse(self);

        let end = start + u64::from(length);
        if !self.has_error() && self.position != end {
            trace!(
                section = self.section,
                start,
                length,
                consumed = self.position - start,
                "realigning to end of block"
            );
        }
        self.set_pos(end);

        value
    }

    /// Read a named top-level block and surface any read error
    pub fn read_section<T>(
        &mut self,
        section: &'static str,
        parse: impl FnOnce(&mut Self) -> T,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.section, section);
        let start = self.position;
        let value = self.read_block(parse);
        self.section = previous;
        self.check()?;

        debug!(section, start, end = self.position, "read manifest section");
        Ok(value)
    }
}
