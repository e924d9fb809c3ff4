//! Codec module - number and payload serialization.
//!
//! - [`NumberCodec`] - Fixed-width integers and floats in one byte order
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (struct-as-map)
//!
//! # Example
//!
//! ```
//! use rpcwire::codec::{MsgPackCodec, NumberCodec};
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let codec = NumberCodec::big_endian();
//! assert_eq!(codec.decode_i32(&codec.encode_i32(42, 4), 4), 42);
//! ```

mod msgpack;
mod number;

pub use msgpack::MsgPackCodec;
pub use number::{ByteOrder, NumberCodec};
