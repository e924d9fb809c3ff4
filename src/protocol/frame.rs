//! Frame struct and frame encoder.
//!
//! A frame is always complete: the length is derived from the payload,
//! so a `Frame` can never disagree with its own header.
//!
//! # Example
//!
//! ```
//! use rpcwire::protocol::{Frame, TYPE_CALL, HEADER_SIZE};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(TYPE_CALL, Bytes::from_static(b"hello"));
//! assert_eq!(frame.length(), 5);
//! assert_eq!(frame.encode().len(), HEADER_SIZE + 5);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Header, ABSOLUTE_MAX_FRAME_SIZE, HEADER_SIZE};
use crate::error::{RpcError, Result};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    type_tag: i32,
    payload: Bytes,
}

impl Frame {
    /// Create a new frame from a type tag and payload.
    ///
    /// # Panics
    ///
    /// Panics if the payload is longer than `i32::MAX` bytes, which the
    /// length field cannot represent. Use [`Frame::try_new`] for payloads
    /// of unchecked size.
    pub fn new(type_tag: i32, payload: Bytes) -> Self {
        assert!(
            payload.len() <= ABSOLUTE_MAX_FRAME_SIZE as usize,
            "payload of {} bytes does not fit the length field",
            payload.len()
        );
        Self { type_tag, payload }
    }

    /// Create a new frame, failing with `ProtocolViolation` if the payload
    /// does not fit the length field.
    pub fn try_new(type_tag: i32, payload: Bytes) -> Result<Self> {
        check_payload_len(payload.len())?;
        Ok(Self { type_tag, payload })
    }

    /// Create a frame from explicit header values.
    ///
    /// Fails with `ProtocolViolation` if `length` does not equal the
    /// payload size.
    pub fn from_parts(type_tag: i32, length: i32, payload: Bytes) -> Result<Self> {
        if length < 0 || length as usize != payload.len() {
            return Err(RpcError::ProtocolViolation(format!(
                "Declared length {} does not match payload of {} bytes",
                length,
                payload.len()
            )));
        }
        Ok(Self { type_tag, payload })
    }

    /// The type tag.
    #[inline]
    pub fn type_tag(&self) -> i32 {
        self.type_tag
    }

    /// The payload length in bytes.
    #[inline]
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get a clone of the payload as Bytes (cheap, zero-copy).
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Consume the frame, returning its payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// The header describing this frame.
    #[inline]
    pub fn header(&self) -> Header {
        Header::new(self.type_tag, self.payload.len() as i32)
    }

    /// Encode header and payload into a contiguous byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.header().encode());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Append the encoded frame to an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_SIZE + self.payload.len());
        buf.put_slice(&self.header().encode());
        buf.put_slice(&self.payload);
    }
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > ABSOLUTE_MAX_FRAME_SIZE as usize {
        return Err(RpcError::ProtocolViolation(format!(
            "payload of {} bytes does not fit the length field",
            len
        )));
    }
    Ok(())
}

/// Build an encoded frame from a type tag and payload.
///
/// # Example
///
/// ```
/// use rpcwire::protocol::{build_frame, TYPE_CALL};
///
/// let bytes = build_frame(TYPE_CALL, b"hi");
/// assert_eq!(bytes, vec![0, 0, 0, 1, 0, 0, 0, 2, b'h', b'i']);
/// ```
pub fn build_frame(type_tag: i32, payload: &[u8]) -> Vec<u8> {
    Frame::new(type_tag, Bytes::copy_from_slice(payload)).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TYPE_CALL;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(TYPE_CALL, Bytes::from_static(b"hello"));

        assert_eq!(frame.type_tag(), TYPE_CALL);
        assert_eq!(frame.payload(), b"hello");
        assert_eq!(frame.length(), 5);
        assert_eq!(frame.header(), Header::new(TYPE_CALL, 5));
    }

    #[test]
    fn test_from_parts_checks_length() {
        assert!(Frame::from_parts(TYPE_CALL, 4, Bytes::from_static(b"test")).is_ok());

        let err = Frame::from_parts(TYPE_CALL, 5, Bytes::from_static(b"test")).unwrap_err();
        assert!(matches!(err, RpcError::ProtocolViolation(_)));

        assert!(Frame::from_parts(TYPE_CALL, -4, Bytes::from_static(b"test")).is_err());
    }

    #[test]
    fn test_try_new() {
        let frame = Frame::try_new(TYPE_CALL, Bytes::from_static(b"ok")).unwrap();
        assert_eq!(frame, Frame::new(TYPE_CALL, Bytes::from_static(b"ok")));
    }

    #[test]
    fn test_payload_length_limit() {
        assert!(check_payload_len(0).is_ok());
        assert!(check_payload_len(ABSOLUTE_MAX_FRAME_SIZE as usize).is_ok());

        let err = check_payload_len(ABSOLUTE_MAX_FRAME_SIZE as usize + 1).unwrap_err();
        assert!(matches!(err, RpcError::ProtocolViolation(_)));
    }

    #[test]
    fn test_encode_layout() {
        let frame = Frame::new(TYPE_CALL, Bytes::from_static(b"abc"));
        let bytes = frame.encode();

        assert_eq!(&bytes[..HEADER_SIZE], &[0, 0, 0, 1, 0, 0, 0, 3]);
        assert_eq!(&bytes[HEADER_SIZE..], b"abc");
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = Frame::new(TYPE_CALL, Bytes::new());
        assert_eq!(frame.encode().len(), HEADER_SIZE);
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = BytesMut::from(&b"xx"[..]);
        Frame::new(2, Bytes::from_static(b"z")).encode_into(&mut buf);

        assert_eq!(&buf[..], &[b'x', b'x', 0, 0, 0, 2, 0, 0, 0, 1, b'z']);
    }

    #[test]
    fn test_payload_bytes_zero_copy() {
        let original = Bytes::from_static(b"test data");
        let frame = Frame::new(TYPE_CALL, original.clone());

        let cloned = frame.payload_bytes();
        assert_eq!(cloned.as_ptr(), original.as_ptr());
    }

    #[test]
    fn test_build_frame_roundtrip() {
        use super::super::FrameDecoder;

        let bytes = build_frame(123, b"0123456789");

        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(&bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_tag(), 123);
        assert_eq!(frames[0].payload(), b"0123456789");
    }
}
