//! Append-only writer.

use crate::macros::for_each_le_scalar;
use crate::macros::write_le_scalar;
use crate::types::Error;
use crate::types::Result;

/// An append-only byte writer.
///
/// Scalar writes cannot fail and return `&mut Self` for chaining. Blob writes
/// return `Result` because their length prefix is a `u32`.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer with a small default capacity.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(64) }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes a bool as a single `0`/`1` byte.
    #[inline]
    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    /// Writes an unsigned byte.
    #[inline]
    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    /// Writes a signed byte.
    #[inline]
    pub fn i8(&mut self, v: i8) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    for_each_le_scalar!(write_le_scalar);

    /// Writes a char as its `u32` scalar value.
    #[inline]
    pub fn char(&mut self, v: char) -> &mut Self {
        self.u32(v as u32)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn str(&mut self, v: &str) -> Result<&mut Self> {
        self.bytes(v.as_bytes())
    }

    /// Writes a length-prefixed byte blob.
    pub fn bytes(&mut self, v: &[u8]) -> Result<&mut Self> {
        let len = v.len();
        if len > u32::MAX as usize {
            return Err(Error::BlobTooLarge(len));
        }
        self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        self.buf.extend_from_slice(v);
        Ok(self)
    }
}
