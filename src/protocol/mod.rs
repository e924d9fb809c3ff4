//! Protocol module - wire format, framing, and the call envelope.
//!
//! This module implements the binary protocol:
//! - 8-byte header encoding/decoding
//! - Stream decoder for accumulating partial reads
//! - Frame struct and encoder
//! - Call envelope shared by requests and responses

mod decoder;
mod frame;
mod message;
mod wire_format;

pub use decoder::{DecoderState, FrameDecoder};
pub use frame::{build_frame, Frame};
pub use message::{CallMessage, Fault, FaultKind, ParamTypeId, FAULT_PARAM_TYPE};
pub use wire_format::{
    Header, ABSOLUTE_MAX_FRAME_SIZE, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE, INT_FIELD_SIZE,
    TYPE_CALL,
};
