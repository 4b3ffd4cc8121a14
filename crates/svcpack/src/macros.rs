//! Scalar schema shared by the writer and the reader.

/// Invokes `$m!(method, rust_type, width)` for every fixed-width scalar
/// that has `to_le_bytes`/`from_le_bytes`.
macro_rules! for_each_le_scalar {
    ($m:ident) => {
        $m!(u16, u16, 2);
        $m!(i16, i16, 2);
        $m!(u32, u32, 4);
        $m!(i32, i32, 4);
        $m!(u64, u64, 8);
        $m!(i64, i64, 8);
        $m!(f32, f32, 4);
        $m!(f64, f64, 8);
    };
}

/// Generates `Writer` methods for little-endian scalars.
macro_rules! write_le_scalar {
    ($name:ident, $ty:ty, $width:expr) => {
        #[doc = concat!("Writes a `", stringify!($ty), "` (LE).")]
        #[inline]
        pub fn $name(&mut self, v: $ty) -> &mut Self {
            self.buf.extend_from_slice(&v.to_le_bytes());
            self
        }
    };
}

/// Generates `Reader` methods for little-endian scalars.
macro_rules! read_le_scalar {
    ($name:ident, $ty:ty, $width:expr) => {
        #[doc = concat!("Reads a `", stringify!($ty), "` (LE).")]
        #[inline]
        pub fn $name(&mut self) -> crate::types::Result<$ty> {
            let bytes = self.read_bytes($width)?;
            let mut raw = [0u8; $width];
            raw.copy_from_slice(bytes);
            Ok(<$ty>::from_le_bytes(raw))
        }
    };
}

pub(crate) use for_each_le_scalar;
pub(crate) use write_le_scalar;
pub(crate) use read_le_scalar;
