//! Primitive reader over an in-memory byte buffer.
//!
//! All multi-byte values are little-endian 32-bit. Every read checks the
//! remaining length first and reports [`Error::TruncatedInput`] with the
//! offset it stopped at.

use byteorder::{ByteOrder, LittleEndian};

use super::format::VALUE_SIZE;
use crate::util::{Error, Result};

/// Forward-only cursor over a byte buffer.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current cursor position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Consume `len` bytes.
    pub fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(Error::TruncatedInput { offset: self.pos, context })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.read_bytes(1, context)?[0])
    }

    pub fn read_i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(VALUE_SIZE, context)?))
    }

    /// Read a non-negative 32-bit count.
    pub fn read_count(&mut self, context: &'static str) -> Result<usize> {
        let start = self.pos;
        let count = self.read_i32(context)?;
        usize::try_from(count).map_err(|_| Error::corrupt(start, format!("negative {}: {}", context, count)))
    }

    /// Read `count` little-endian `i32` values.
    pub fn read_i32s(&mut self, count: usize, context: &'static str) -> Result<Vec<i32>> {
        let bytes = self.read_array(count, context)?;
        let mut values = vec![0i32; count];
        LittleEndian::read_i32_into(bytes, &mut values);
        Ok(values)
    }

    /// Read `count` little-endian IEEE-754 `f32` values.
    pub fn read_f32s(&mut self, count: usize, context: &'static str) -> Result<Vec<f32>> {
        let bytes = self.read_array(count, context)?;
        let mut values = vec![0f32; count];
        LittleEndian::read_f32_into(bytes, &mut values);
        Ok(values)
    }

    /// Read a string of known byte length, dropping one trailing NUL if present.
    ///
    /// Bytes are decoded as Latin-1, so every byte maps to exactly one char.
    pub fn read_string(&mut self, len: usize, context: &'static str) -> Result<String> {
        let bytes = self.read_bytes(len, context)?;
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        Ok(latin1_to_string(bytes))
    }

    /// Read a NUL-terminated string; the terminator is consumed.
    pub fn read_cstring(&mut self, context: &'static str) -> Result<String> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::TruncatedInput { offset: self.buf.len(), context })?;
        let name = latin1_to_string(&rest[..len]);
        self.pos += len + 1;
        Ok(name)
    }

    fn read_array(&mut self, count: usize, context: &'static str) -> Result<&'a [u8]> {
        let len = count
            .checked_mul(VALUE_SIZE)
            .ok_or(Error::TruncatedInput { offset: self.pos, context })?;
        self.read_bytes(len, context)
    }
}

/// Decode Latin-1 bytes.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}
