//! Bounds-checked read cursor.

use crate::macros::for_each_le_scalar;
use crate::macros::read_le_scalar;
use crate::types::Error;
use crate::types::Result;

/// A cursor over a borrowed byte slice.
///
/// Every read is bounds-checked; running off the end yields
/// `Error::UnexpectedEnd` with the number of missing bytes, never a panic.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    slice: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a cursor at the start of `slice`.
    pub fn new(slice: &'a [u8]) -> Self {
        Self { slice, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.slice.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves the cursor to an absolute position within the slice.
    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.slice.len() {
            return Err(Error::OutOfBounds);
        }
        self.pos = pos;
        Ok(())
    }

    /// The unread tail of the slice.
    pub fn rest(&self) -> &'a [u8] {
        &self.slice[self.pos..]
    }

    #[inline]
    fn need(&self, n: usize) -> Result<()> {
        let end = self.pos.saturating_add(n);
        if end > self.slice.len() {
            Err(Error::UnexpectedEnd { needed: end - self.slice.len() })
        } else {
            Ok(())
        }
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.need(len)?;
        let out = &self.slice[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Skips `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.need(len)?;
        self.pos += len;
        Ok(())
    }

    /// Reads a bool, rejecting any byte other than `0` or `1`.
    pub fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(Error::InvalidBool(b)),
        }
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let b = self.slice[self.pos];
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    for_each_le_scalar!(read_le_scalar);

    /// Reads a char from its `u32` scalar value.
    pub fn char(&mut self) -> Result<char> {
        let raw = self.u32()?;
        char::from_u32(raw).ok_or(Error::InvalidChar(raw))
    }

    /// Reads a length-prefixed byte blob, borrowing from the underlying slice.
    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.read_bytes(len)
    }

    /// Reads a length-prefixed UTF-8 string, borrowing from the underlying slice.
    pub fn str(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.bytes()?;
        std::str::from_utf8(bytes).map_err(|_| {
            self.pos = start;
            Error::InvalidUtf8
        })
    }
}
