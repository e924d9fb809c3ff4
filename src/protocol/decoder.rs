//! Stream decoder for reassembling frames from partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `AwaitingHeader`: Need at least 8 bytes
//! - `AwaitingBody`: Header parsed and retained, need `length` payload bytes
//!
//! # Example
//!
//! ```
//! use rpcwire::protocol::{build_frame, FrameDecoder, TYPE_CALL};
//!
//! let bytes = build_frame(TYPE_CALL, b"hello");
//! let mut decoder = FrameDecoder::new();
//!
//! // Data arrives in arbitrary chunks from the socket
//! assert!(decoder.push(&bytes[..3]).unwrap().is_empty());
//! let frames = decoder.push(&bytes[3..]).unwrap();
//! assert_eq!(frames[0].payload(), b"hello");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::Result;

/// Default initial buffer capacity.
const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Observable decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for a complete header.
    AwaitingHeader,
    /// Header parsed, waiting for `length` payload bytes.
    AwaitingBody { type_tag: i32, length: usize },
}

/// Per-connection decoder session.
///
/// Holds the header of the frame in progress and the residual unconsumed
/// bytes. One decoder belongs to exactly one connection.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: DecoderState,
    /// Maximum allowed payload size.
    max_frame_size: u32,
}

impl FrameDecoder {
    /// Create a new decoder with default settings.
    ///
    /// Default capacity: 8KB, max payload: 16MB.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new decoder with custom max payload size.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self::with_capacity_and_max_frame_size(DEFAULT_CAPACITY, max_frame_size)
    }

    /// Create a new decoder with custom capacity and max payload.
    pub fn with_capacity_and_max_frame_size(capacity: usize, max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: DecoderState::AwaitingHeader,
            max_frame_size,
        }
    }

    /// Push data into the decoder and extract all complete frames.
    ///
    /// This is the main API for processing incoming data from the socket.
    /// Partial data is retained for the next push.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if a header declares a negative length or
    /// one above the configured maximum. The session is unusable afterwards.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.decode()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Append data to the buffer without extracting frames.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single frame from the buffered bytes.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed (nothing is consumed)
    /// - `Err(...)` on a protocol violation
    pub fn decode(&mut self) -> Result<Option<Frame>> {
        if let DecoderState::AwaitingHeader = self.state {
            let header = match Header::decode(&self.buffer) {
                Some(header) => header,
                None => return Ok(None),
            };
            let length = header.validate(self.max_frame_size)?;

            let _ = self.buffer.split_to(HEADER_SIZE);
            self.state = DecoderState::AwaitingBody {
                type_tag: header.type_tag,
                length,
            };
        }

        match self.state {
            DecoderState::AwaitingBody { type_tag, length } => {
                if self.buffer.len() < length {
                    return Ok(None);
                }

                let payload = if length == 0 {
                    Bytes::new()
                } else {
                    self.buffer.split_to(length).freeze()
                };

                self.state = DecoderState::AwaitingHeader;
                Ok(Some(Frame::new(type_tag, payload)))
            }
            DecoderState::AwaitingHeader => Ok(None),
        }
    }

    /// The current decoder state.
    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Get the number of buffered, not yet consumed bytes.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The configured maximum payload size.
    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::AwaitingHeader;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::protocol::{build_frame, TYPE_CALL};

    #[test]
    fn test_single_complete_frame() {
        let mut decoder = FrameDecoder::new();

        let frames = decoder.push(&build_frame(TYPE_CALL, b"hello")).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_tag(), TYPE_CALL);
        assert_eq!(frames[0].payload(), b"hello");
        assert!(decoder.is_empty());
        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut decoder = FrameDecoder::new();

        let mut combined = build_frame(1, b"first");
        combined.extend(build_frame(2, b"second"));
        combined.extend(build_frame(3, b"third"));

        let frames = decoder.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].type_tag(), 1);
        assert_eq!(frames[1].payload(), b"second");
        assert_eq!(frames[2].type_tag(), 3);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut decoder = FrameDecoder::new();
        let bytes = build_frame(TYPE_CALL, b"test");

        assert!(decoder.push(&bytes[..5]).unwrap().is_empty());
        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);
        assert_eq!(decoder.buffered(), 5);

        let frames = decoder.push(&bytes[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"test");
    }

    #[test]
    fn test_header_retained_while_awaiting_body() {
        let mut decoder = FrameDecoder::new();
        let payload = b"this payload arrives in pieces";
        let bytes = build_frame(9, payload);

        let partial = HEADER_SIZE + 10;
        assert!(decoder.push(&bytes[..partial]).unwrap().is_empty());
        assert_eq!(
            decoder.state(),
            DecoderState::AwaitingBody {
                type_tag: 9,
                length: payload.len()
            }
        );
        // Header bytes are consumed, only body bytes remain buffered
        assert_eq!(decoder.buffered(), 10);

        // Re-entering without new bytes must not re-parse anything
        assert!(decoder.decode().unwrap().is_none());
        assert_eq!(decoder.buffered(), 10);

        let frames = decoder.push(&bytes[partial..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_tag(), 9);
        assert_eq!(frames[0].payload(), payload);
        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);
    }

    #[test]
    fn test_empty_payload() {
        let mut decoder = FrameDecoder::new();

        let frames = decoder.push(&build_frame(TYPE_CALL, b"")).unwrap();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload().is_empty());
        assert_eq!(frames[0].length(), 0);
    }

    #[test]
    fn test_empty_payload_between_frames() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = build_frame(1, b"a");
        bytes.extend(build_frame(2, b""));
        bytes.extend(build_frame(3, b"c"));

        let frames = decoder.push(&bytes).unwrap();
        let tags: Vec<i32> = frames.iter().map(|f| f.type_tag()).collect();
        assert_eq!(tags, vec![1, 2, 3]);
        assert!(frames[1].payload().is_empty());
    }

    #[test]
    fn test_max_frame_size_violation() {
        let mut decoder = FrameDecoder::with_max_frame_size(100);

        let result = decoder.push(&Header::new(TYPE_CALL, 1000).encode());

        assert!(matches!(result, Err(RpcError::ProtocolViolation(_))));
    }

    #[test]
    fn test_negative_length_violation() {
        let mut decoder = FrameDecoder::new();
        let result = decoder.push(&Header::new(TYPE_CALL, -8).encode());
        assert!(result.unwrap_err().to_string().contains("Negative"));
    }

    #[test]
    fn test_oversized_claim_waits_without_panicking() {
        let mut decoder = FrameDecoder::new();

        let frames = decoder
            .push(&Header::new(TYPE_CALL, 1_000_000).encode())
            .unwrap();
        assert!(frames.is_empty());

        for _ in 0..10 {
            assert!(decoder.push(&[0u8; 512]).unwrap().is_empty());
        }
        assert_eq!(
            decoder.state(),
            DecoderState::AwaitingBody {
                type_tag: TYPE_CALL,
                length: 1_000_000
            }
        );
    }

    #[test]
    fn test_clear_resets_state() {
        let mut decoder = FrameDecoder::new();
        let bytes = build_frame(TYPE_CALL, b"test");

        decoder.push(&bytes[..HEADER_SIZE]).unwrap();
        assert!(matches!(decoder.state(), DecoderState::AwaitingBody { .. }));

        decoder.clear();

        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut decoder = FrameDecoder::new();

        let frame1 = build_frame(1, b"first");
        let frame2 = build_frame(2, b"second");

        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..5]);

        let frames = decoder.push(&data).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_tag(), 1);

        let frames = decoder.push(&frame2[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_tag(), 2);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut decoder = FrameDecoder::new();
        let bytes = build_frame(TYPE_CALL, b"hi");

        let mut all_frames = Vec::new();
        for (i, byte) in bytes.iter().enumerate() {
            let frames = decoder.push(&[*byte]).unwrap();
            if i + 1 < bytes.len() {
                assert!(frames.is_empty());
            }
            all_frames.extend(frames);
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload(), b"hi");
    }
}
