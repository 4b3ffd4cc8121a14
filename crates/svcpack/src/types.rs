//! Core types for the svcpack byte codec.

use std::fmt;

/// Encoding and decoding failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer ended before the value could be read; `needed` more bytes were required.
    UnexpectedEnd { needed: usize },
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// A bool byte other than `0` or `1`.
    InvalidBool(u8),
    /// A `u32` that is not a Unicode scalar value.
    InvalidChar(u32),
    /// Blob length exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// Attempted to move the cursor past the end of the buffer.
    OutOfBounds,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEnd { needed } => write!(f, "unexpected end of buffer: {} more bytes needed", needed),
            Error::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Error::InvalidBool(b) => write!(f, "invalid bool byte: {:#04x}", b),
            Error::InvalidChar(c) => write!(f, "invalid char scalar: {:#x}", c),
            Error::BlobTooLarge(n) => write!(f, "blob of {} bytes exceeds u32 length prefix", n),
            Error::OutOfBounds => write!(f, "cursor position out of bounds"),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for svcpack operations.
pub type Result<T> = std::result::Result<T, Error>;
