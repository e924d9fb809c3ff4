//! Call envelope carried inside a frame payload.
//!
//! Requests and responses share one record shape:
//!
//! ```text
//! { interface: str, method: str, param_type: int, params: bin }
//! ```
//!
//! `params` is owned by the parameter descriptor selected by `param_type`.
//! The id [`FAULT_PARAM_TYPE`] is reserved: a response carrying it has a
//! [`Fault`] in `params` instead of descriptor data.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::frame::Frame;
use super::wire_format::TYPE_CALL;
use crate::codec::MsgPackCodec;
use crate::error::{RpcError, Result};

/// Parameter-type identifier shared out of band by client and server.
pub type ParamTypeId = i32;

/// Reserved parameter-type id marking a fault response.
pub const FAULT_PARAM_TYPE: ParamTypeId = 0;

/// One call request or call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMessage {
    /// Advertised name of the target interface.
    pub interface: String,
    /// Target method name.
    pub method: String,
    /// Descriptor id for `params`.
    pub param_type: ParamTypeId,
    /// Descriptor-encoded arguments or outputs.
    #[serde(with = "serde_bytes")]
    pub params: Vec<u8>,
}

impl CallMessage {
    /// Create a new envelope.
    pub fn new(
        interface: impl Into<String>,
        method: impl Into<String>,
        param_type: ParamTypeId,
        params: Vec<u8>,
    ) -> Self {
        Self {
            interface: interface.into(),
            method: method.into(),
            param_type,
            params,
        }
    }

    /// Build a fault response for the given call.
    pub fn fault(
        interface: impl Into<String>,
        method: impl Into<String>,
        fault: &Fault,
    ) -> Result<Self> {
        Ok(Self::new(
            interface,
            method,
            FAULT_PARAM_TYPE,
            MsgPackCodec::encode(fault)?,
        ))
    }

    /// Check if this envelope carries a fault.
    #[inline]
    pub fn is_fault(&self) -> bool {
        self.param_type == FAULT_PARAM_TYPE
    }

    /// Decode the fault body of a fault envelope.
    pub fn decode_fault(&self) -> Result<Fault> {
        if !self.is_fault() {
            return Err(RpcError::ProtocolViolation(format!(
                "param type {} is not a fault",
                self.param_type
            )));
        }
        MsgPackCodec::decode(&self.params)
    }

    /// Encode into a `TYPE_CALL` frame.
    ///
    /// Fails with `ProtocolViolation` if the encoded envelope does not fit
    /// the length field.
    pub fn to_frame(&self) -> Result<Frame> {
        let payload = MsgPackCodec::encode(self)?;
        Frame::try_new(TYPE_CALL, Bytes::from(payload))
    }

    /// Decode from a frame payload.
    ///
    /// A frame with a foreign type tag or an undecodable payload is a
    /// protocol violation.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        if frame.type_tag() != TYPE_CALL {
            return Err(RpcError::ProtocolViolation(format!(
                "unexpected type tag {}",
                frame.type_tag()
            )));
        }
        MsgPackCodec::decode(frame.payload())
            .map_err(|e| RpcError::ProtocolViolation(format!("bad call envelope: {}", e)))
    }
}

/// Category of a server-side dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// The envelope could not be decoded.
    MalformedRequest,
    /// No implementation is bound to the interface name.
    UnknownService,
    /// The interface is bound but the method is not.
    UnknownMethod,
    /// No descriptor is registered for the parameter-type id.
    UnknownParamType,
    /// The descriptor rejected the arguments.
    InvalidArgument,
    /// The implementation returned an error or panicked.
    Invocation,
}

/// Body of a fault response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// What went wrong.
    pub kind: FaultKind,
    /// Human-readable detail.
    pub message: String,
}

impl Fault {
    /// Create a new fault.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<Fault> for RpcError {
    fn from(fault: Fault) -> Self {
        RpcError::RemoteFault {
            kind: fault.kind,
            message: fault.message,
        }
    }
}
