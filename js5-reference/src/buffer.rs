//! Forward-only cursor over a byte slice
//!
//! All multi-byte fields in JS5 metadata are big-endian. The cursor
//! never backtracks; every read either consumes its full width or
//! fails with [`Error::ShortInput`] and consumes nothing.

use crate::{Error, Result};

/// Forward-only reader over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current read offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::ShortInput {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Read a single unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a single signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a "smart" variable-width integer.
    ///
    /// The width is selected by peeking at the next byte without
    /// consuming it: if its high bit is set, four bytes are consumed
    /// and the sign bit masked off (a 31-bit value); otherwise two
    /// bytes are consumed and zero-extended. Values 0..=32767 fit the
    /// short form.
    pub fn read_smart(&mut self) -> Result<u32> {
        let first = *self.data.get(self.offset).ok_or(Error::ShortInput {
            needed: 1,
            available: 0,
        })?;

        if first & 0x80 != 0 {
            Ok(self.read_i32()? as u32 & 0x7FFF_FFFF)
        } else {
            Ok(u32::from(self.read_u16()?))
        }
    }

    /// Copy the next `n` bytes into a new buffer.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }
}
