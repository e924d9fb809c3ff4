//! Error types for rpcwire.

use thiserror::Error;

use crate::protocol::FaultKind;

/// Main error type for all rpcwire operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Configuration could not be loaded or extracted.
    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Wrong arity or argument type presented to a parameter descriptor.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The method is not remotely invokable, or its interface is not a remote stub.
    #[error("Unsupported operation: {interface}.{method}")]
    UnsupportedOperation { interface: String, method: String },

    /// Static setup is inconsistent (unregistered descriptor, empty proxy, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No connection is established.
    #[error("Not connected")]
    NotConnected,

    /// Establishing the connection failed.
    #[error("Connect to {addr} failed: {reason}")]
    ConnectFailed { addr: String, reason: String },

    /// The peer sent bytes that violate the framing or envelope format.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The server reported a failure while dispatching the call.
    #[error("Remote fault ({kind:?}): {message}")]
    RemoteFault { kind: FaultKind, message: String },

    /// The call did not complete within the configured call timeout.
    #[error("Call timed out")]
    Timeout,

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl From<figment::Error> for RpcError {
    fn from(err: figment::Error) -> Self {
        RpcError::Config(Box::new(err))
    }
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;
