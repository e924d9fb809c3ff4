//! Fixed-width number codec.
//!
//! Converts signed integers and IEEE floats to and from byte sequences in a
//! single configurable byte order. The frame header uses
//! [`NumberCodec::big_endian`].
//!
//! The `width` argument must equal the natural width of the type. A
//! mismatch is a caller bug and panics.
//!
//! # Example
//!
//! ```
//! use rpcwire::codec::NumberCodec;
//!
//! let codec = NumberCodec::big_endian();
//! let bytes = codec.encode_i32(0x0102_0304, 4);
//! assert_eq!(bytes, vec![1, 2, 3, 4]);
//! assert_eq!(codec.decode_i32(&bytes, 4), 0x0102_0304);
//! ```

/// Byte order used by a [`NumberCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Most significant byte first (network order).
    #[default]
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

/// Codec for primitive numbers under one fixed byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberCodec {
    order: ByteOrder,
}

macro_rules! number_methods {
    ($encode:ident, $decode:ident, $ty:ty) => {
        #[doc = concat!("Encode an `", stringify!($ty), "` into exactly `width` bytes.")]
        pub fn $encode(&self, value: $ty, width: usize) -> Vec<u8> {
            check_width(width, std::mem::size_of::<$ty>());
            match self.order {
                ByteOrder::BigEndian => value.to_be_bytes().to_vec(),
                ByteOrder::LittleEndian => value.to_le_bytes().to_vec(),
            }
        }

        #[doc = concat!("Decode an `", stringify!($ty), "` from the first `width` bytes.")]
        pub fn $decode(&self, bytes: &[u8], width: usize) -> $ty {
            const N: usize = std::mem::size_of::<$ty>();
            check_width(width, N);
            assert!(
                bytes.len() >= N,
                "need {} bytes, got {}",
                N,
                bytes.len()
            );
            let mut raw = [0u8; N];
            raw.copy_from_slice(&bytes[..N]);
            match self.order {
                ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
            }
        }
    };
}

impl NumberCodec {
    /// Create a codec for the given byte order.
    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    /// Big endian codec (the wire order of the frame header).
    pub const fn big_endian() -> Self {
        Self::new(ByteOrder::BigEndian)
    }

    /// Little endian codec.
    pub const fn little_endian() -> Self {
        Self::new(ByteOrder::LittleEndian)
    }

    /// The byte order of this codec.
    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    number_methods!(encode_i16, decode_i16, i16);
    number_methods!(encode_i32, decode_i32, i32);
    number_methods!(encode_i64, decode_i64, i64);
    number_methods!(encode_f32, decode_f32, f32);
    number_methods!(encode_f64, decode_f64, f64);
}

#[inline]
fn check_width(width: usize, natural: usize) {
    assert_eq!(
        width, natural,
        "width {} does not match the {}-byte type",
        width, natural
    );
}
