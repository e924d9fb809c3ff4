//! Wire format encoding and decoding.
//!
//! Implements the 8-byte header format:
//! ```text
//! ┌──────────┬──────────┬─────────────────┐
//! │ Type tag │ Length   │ Payload         │
//! │ 4 bytes  │ 4 bytes  │ Length bytes    │
//! │ int32 BE │ int32 BE │                 │
//! └──────────┴──────────┴─────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::codec::NumberCodec;
use crate::error::{RpcError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Width of each header field.
pub const INT_FIELD_SIZE: usize = 4;

/// Type tag carried by every call frame, request and response alike.
pub const TYPE_CALL: i32 = 1;

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Absolute maximum payload size (max i32, the largest encodable length).
pub const ABSOLUTE_MAX_FRAME_SIZE: u32 = i32::MAX as u32;

const WIRE: NumberCodec = NumberCodec::big_endian();

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Logical message kind.
    pub type_tag: i32,
    /// Payload length in bytes, as written on the wire (may be negative if
    /// the peer is broken; see [`Header::validate`]).
    pub length: i32,
}

impl Header {
    /// Create a new header.
    pub fn new(type_tag: i32, length: i32) -> Self {
        Self { type_tag, length }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use rpcwire::protocol::{Header, TYPE_CALL};
    ///
    /// let bytes = Header::new(TYPE_CALL, 5).encode();
    /// assert_eq!(bytes, [0, 0, 0, 1, 0, 0, 0, 5]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&WIRE.encode_i32(self.type_tag, INT_FIELD_SIZE));
        buf[4..8].copy_from_slice(&WIRE.encode_i32(self.length, INT_FIELD_SIZE));
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            type_tag: WIRE.decode_i32(&buf[0..4], INT_FIELD_SIZE),
            length: WIRE.decode_i32(&buf[4..8], INT_FIELD_SIZE),
        })
    }

    /// Validate the length field and return it as a byte count.
    ///
    /// A negative length, or one above `max_frame_size`, is a protocol
    /// violation.
    pub fn validate(&self, max_frame_size: u32) -> Result<usize> {
        if self.length < 0 {
            return Err(RpcError::ProtocolViolation(format!(
                "Negative payload length {}",
                self.length
            )));
        }

        let length = self.length as u32;
        if length > max_frame_size {
            return Err(RpcError::ProtocolViolation(format!(
                "Payload size {} exceeds maximum {}",
                length, max_frame_size
            )));
        }

        Ok(length as usize)
    }

    /// Check if this header carries a call.
    #[inline]
    pub fn is_call(&self) -> bool {
        self.type_tag == TYPE_CALL
    }
}
