//! Transport module - TCP stream handling.
//!
//! Client and server code is written against [`Stream`], so any
//! bidirectional byte stream (a TCP connection, an in-memory duplex in
//! tests) can carry calls.

mod tcp;

pub use tcp::{TcpConnection, TcpServerListener};

use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream usable as a call connection.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased connection held by the client.
pub type BoxedStream = Box<dyn Stream>;
