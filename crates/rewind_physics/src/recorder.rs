//! # State Recorder
//!
//! Growable byte buffer with a single read/write cursor. The engine writes
//! its whole simulation state into one on save and reads it back on restore.
//!
//! ## Design
//!
//! - Writes append at the cursor and grow the buffer as needed
//! - Reads copy forward from the cursor and fail on short data
//! - `rewind` resets the cursor without releasing capacity, so history
//!   slots are reused tick after tick without reallocating

use bytemuck::{bytes_of, bytes_of_mut, Pod};

use crate::error::RecorderError;

/// Byte buffer plus cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateRecorder {
    buffer: Vec<u8>,
    cursor: usize,
}

impl StateRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    /// Creates an empty recorder with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Wraps existing bytes, cursor at the start.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            cursor: 0,
        }
    }

    /// Total bytes held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes are held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Current cursor position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left after the cursor.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Cursor is at the end of the data.
    #[inline]
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    /// All bytes held, independent of the cursor.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Resets the cursor to the start, keeping data and capacity.
    #[inline]
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Drops all data and resets the cursor, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Writes raw bytes at the cursor, overwriting then growing.
    pub fn write_bytes(&mut self, data: &[u8]) {
        let end = self.cursor + data.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.cursor..end].copy_from_slice(data);
        self.cursor = end;
    }

    /// Overwrites bytes at an absolute offset without moving the cursor.
    ///
    /// Used to back-patch headers once the payload is known.
    pub fn patch(&mut self, offset: usize, data: &[u8]) -> Result<(), RecorderError> {
        let end = offset + data.len();
        if end > self.buffer.len() {
            return Err(RecorderError::UnexpectedEof {
                requested: data.len(),
                remaining: self.buffer.len().saturating_sub(offset),
            });
        }
        self.buffer[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Copies `out.len()` bytes from the cursor.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), RecorderError> {
        let bytes = self.read_slice(out.len())?;
        out.copy_from_slice(bytes);
        Ok(())
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn read_slice(&mut self, len: usize) -> Result<&[u8], RecorderError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(RecorderError::UnexpectedEof {
                requested: len,
                remaining,
            });
        }
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.buffer[start..self.cursor])
    }

    /// Writes a Pod value directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.write_bytes(bytes_of(value));
    }

    /// Reads a Pod value directly.
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, RecorderError> {
        let mut value = T::zeroed();
        self.read_bytes(bytes_of_mut(&mut value))?;
        Ok(value)
    }

    /// Writes a u8.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Writes a bool as one byte.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Reads a u8.
    pub fn read_u8(&mut self) -> Result<u8, RecorderError> {
        let mut bytes = [0u8; 1];
        self.read_bytes(&mut bytes)?;
        Ok(bytes[0])
    }

    /// Reads a bool written by `write_bool`.
    pub fn read_bool(&mut self) -> Result<bool, RecorderError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a u32 in little-endian format.
    pub fn read_u32(&mut self) -> Result<u32, RecorderError> {
        let mut bytes = [0u8; 4];
        self.read_bytes(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a u64 in little-endian format.
    pub fn read_u64(&mut self) -> Result<u64, RecorderError> {
        let mut bytes = [0u8; 8];
        self.read_bytes(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads a f32 in little-endian format.
    pub fn read_f32(&mut self) -> Result<f32, RecorderError> {
        let mut bytes = [0u8; 4];
        self.read_bytes(&mut bytes)?;
        Ok(f32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_shared::Vec3;

    #[test]
    fn test_write_then_read() {
        let mut rec = StateRecorder::new();
        rec.write_u32(7);
        rec.write_f32(1.5);
        rec.write_pod(&Vec3::new(1.0, 2.0, 3.0));
        assert!(rec.is_eof());

        rec.rewind();
        assert_eq!(rec.read_u32().unwrap(), 7);
        assert_eq!(rec.read_f32().unwrap(), 1.5);
        assert_eq!(rec.read_pod::<Vec3>().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert!(rec.is_eof());
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut rec = StateRecorder::new();
        rec.write_u8(1);
        rec.rewind();
        let err = rec.read_u32().unwrap_err();
        assert_eq!(
            err,
            RecorderError::UnexpectedEof {
                requested: 4,
                remaining: 1
            }
        );
        // Failed reads do not move the cursor.
        assert_eq!(rec.position(), 0);
    }

    #[test]
    fn test_rewind_allows_repeated_reads() {
        let mut rec = StateRecorder::new();
        rec.write_u64(99);
        for _ in 0..3 {
            rec.rewind();
            assert_eq!(rec.read_u64().unwrap(), 99);
        }
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut rec = StateRecorder::with_capacity(64);
        rec.write_bytes(&[1; 32]);
        rec.clear();
        assert!(rec.is_empty());
        assert!(rec.buffer.capacity() >= 64);
    }

    #[test]
    fn test_patch_header() {
        let mut rec = StateRecorder::new();
        rec.write_u32(0);
        rec.write_u32(5);
        rec.patch(0, &9u32.to_le_bytes()).unwrap();
        rec.rewind();
        assert_eq!(rec.read_u32().unwrap(), 9);
        assert!(rec.patch(6, &[0; 4]).is_err());
    }
}
