//! Primitive writer into a growable byte buffer.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::util::{Error, Result};

/// Append-only output buffer with little-endian helpers.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Overwrite a byte written earlier.
    pub fn patch_u8(&mut self, pos: usize, value: u8) {
        self.buf[pos] = value;
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a 32-bit count, rejecting lengths the format cannot express.
    pub fn write_count(&mut self, count: usize, context: &str) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| Error::constraint(format!("{} too large: {}", context, count)))?;
        self.write_i32(count)
    }

    pub fn write_i32s(&mut self, values: &[i32]) -> Result<()> {
        self.buf.reserve(values.len() * 4);
        for v in values {
            self.buf.write_i32::<LittleEndian>(*v)?;
        }
        Ok(())
    }

    pub fn write_f32s(&mut self, values: &[f32]) -> Result<()> {
        self.buf.reserve(values.len() * 4);
        for v in values {
            self.buf.write_f32::<LittleEndian>(*v)?;
        }
        Ok(())
    }

    /// Write a Latin-1 string without length prefix or terminator.
    pub fn write_latin1(&mut self, s: &str, context: &str) -> Result<()> {
        let bytes = string_to_latin1(s)
            .ok_or_else(|| Error::constraint(format!("{} is not Latin-1 encodable: {:?}", context, s)))?;
        self.write_bytes(&bytes);
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode a string as Latin-1. Fails on code points above U+00FF.
pub fn string_to_latin1(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian() -> Result<()> {
        let mut w = ByteWriter::new();
        w.write_i32s(&[1, -1])?;
        w.write_f32s(&[1.5])?;
        let mut expected = vec![1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        expected.extend_from_slice(&1.5f32.to_le_bytes());
        assert_eq!(w.into_inner(), expected);
        Ok(())
    }

    #[test]
    fn test_latin1() {
        assert_eq!(string_to_latin1("a\u{e9}"), Some(vec![0x61, 0xE9]));
        assert_eq!(string_to_latin1("\u{263a}"), None);

        let mut w = ByteWriter::new();
        assert!(matches!(
            w.write_latin1("\u{263a}", "name"),
            Err(Error::EncodeConstraintViolation(_))
        ));
    }
}
