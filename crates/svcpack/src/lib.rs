//! # Svcpack
//!
//! A small positional byte codec.
//!
//! Unlike a tagged format, nothing on the wire says what a value is. The reader
//! must ask for exactly the sequence of types the writer produced, in the same
//! order. This is what the RPC layer wants: both sides know the declared
//! signature of the operation, so tags would only cost bytes.
//!
//! ## Format
//!
//! - **Scalars**: fixed width, little-endian. `bool` is one byte, `0` or `1`.
//! - **char**: the `u32` scalar value.
//! - **Blobs** (`str`, `bytes`): `[Len: u32 LE][Data: Len]`.

mod macros;

pub mod types;
pub mod writer;
pub mod reader;

pub use types::Error;
pub use types::Result;

pub use writer::Writer;
pub use reader::Reader;
