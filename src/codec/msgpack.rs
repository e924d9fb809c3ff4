//! MsgPack codec using `rmp-serde`.
//!
//! Structs are always written with `to_vec_named` (struct-as-map), so a
//! peer can add trailing fields to a record without breaking older readers
//! that ignore unknown keys.
//!
//! # Example
//!
//! ```
//! use rpcwire::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Report {
//!     id: String,
//!     count: i32,
//! }
//!
//! let msg = Report { id: "abc".to_string(), count: 0 };
//! let encoded = MsgPackCodec::encode(&msg).unwrap();
//! let decoded: Report = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use crate::error::Result;

/// MessagePack codec for call envelopes and descriptor bodies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
