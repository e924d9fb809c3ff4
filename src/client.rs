//! Client builder and call dispatch.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the target
//! server and the parameter registry. The [`RpcClient`] owns one connection
//! and runs calls over it in strict request/response alternation:
//! 1. Encode the request frame and write it
//! 2. Read until the decoder yields the next frame
//! 3. Hand that frame back as the response
//!
//! A `tokio::sync::Mutex` around the connection covers the whole
//! send+receive sequence, so at most one call is in flight per connection
//! no matter how many tasks share the client.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rpcwire::{ClientBuilder, ParamRegistry};
//!
//! # async fn example() -> rpcwire::error::Result<()> {
//! let mut registry = ParamRegistry::new();
//! registry.register_record::<String>(1, "greeting")?;
//!
//! let client = ClientBuilder::new()
//!     .host("127.0.0.1")
//!     .port(9080)
//!     .registry(Arc::new(registry))
//!     .build();
//! client.connect().await?;
//!
//! let mut name = String::from("world");
//! client.invoke("Greeter", "greet", 1, &mut [&mut name]).await?;
//! println!("{}", name);
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::error::{RpcError, Result};
use crate::params::{ParamRegistry, Value};
use crate::protocol::{CallMessage, Frame, FrameDecoder, ParamTypeId, HEADER_SIZE};
use crate::transport::{BoxedStream, Stream, TcpConnection};

/// Counters of connection activity.
///
/// Every byte the client writes or reads is counted here, so a call path
/// that must not touch the network can be checked by the counters staying
/// at zero.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    connects: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
}

impl ConnectionStats {
    /// Connections established or attached.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Request frames written.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Bytes written, headers included.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Response frames read.
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Bytes of complete response frames, headers included.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Check if nothing was ever connected, sent or received.
    pub fn is_idle(&self) -> bool {
        self.connects() == 0
            && self.frames_sent() == 0
            && self.bytes_sent() == 0
            && self.frames_received() == 0
            && self.bytes_received() == 0
    }

    fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn record_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// Builder for configuring and creating an [`RpcClient`].
pub struct ClientBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    call_timeout: Option<Duration>,
    receive_buffer_size: usize,
    max_frame_size: u32,
    registry: Arc<ParamRegistry>,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    /// Create a builder from loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            connect_timeout: config.connect_timeout(),
            call_timeout: config.call_timeout(),
            receive_buffer_size: config.receive_buffer_size.max(1),
            max_frame_size: config.max_frame_size,
            registry: Arc::new(ParamRegistry::new()),
        }
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout for one call, `None` to wait indefinitely.
    ///
    /// Default: 30 seconds
    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the number of bytes requested per socket read.
    ///
    /// Default: 2048
    pub fn receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size.max(1);
        self
    }

    /// Set the largest accepted response payload.
    ///
    /// Default: 16 MiB
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the parameter registry shared with the server out of band.
    pub fn registry(mut self, registry: Arc<ParamRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Build the client. No connection is made until [`RpcClient::connect`].
    pub fn build(self) -> RpcClient {
        RpcClient {
            addr: format!("{}:{}", self.host, self.port),
            connect_timeout: self.connect_timeout,
            call_timeout: self.call_timeout,
            receive_buffer_size: self.receive_buffer_size,
            max_frame_size: self.max_frame_size,
            registry: self.registry,
            connection: Mutex::new(None),
            stats: ConnectionStats::default(),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection state: the stream and its decoder session.
struct Connection {
    stream: BoxedStream,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl Connection {
    /// Write one frame, then read until the next frame is complete.
    async fn round_trip(&mut self, request: &Frame, stats: &ConnectionStats) -> Result<Frame> {
        let bytes = request.encode();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        stats.record_sent(bytes.len());

        loop {
            if let Some(frame) = self.decoder.decode()? {
                stats.record_received(HEADER_SIZE + frame.length());
                return Ok(frame);
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(RpcError::ConnectionClosed);
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }
}

/// An RPC client bound to one server address.
///
/// Share it between tasks behind an `Arc`; calls are serialized.
pub struct RpcClient {
    addr: String,
    connect_timeout: Duration,
    call_timeout: Option<Duration>,
    receive_buffer_size: usize,
    max_frame_size: u32,
    registry: Arc<ParamRegistry>,
    connection: Mutex<Option<Connection>>,
    stats: ConnectionStats,
}

impl RpcClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect to the configured server over TCP.
    ///
    /// Replaces any existing connection.
    pub async fn connect(&self) -> Result<()> {
        let stream = TcpConnection::connect(&self.addr, self.connect_timeout).await?;
        self.attach(stream).await;
        Ok(())
    }

    /// Use an already established stream as the connection.
    ///
    /// Replaces any existing connection.
    pub async fn attach<S: Stream>(&self, stream: S) {
        let connection = Connection {
            stream: Box::new(stream),
            decoder: FrameDecoder::with_max_frame_size(self.max_frame_size),
            read_buf: vec![0u8; self.receive_buffer_size],
        };

        let previous = self.connection.lock().await.replace(connection);
        if previous.is_some() {
            tracing::debug!("Replaced existing connection to {}", self.addr);
        }
        self.stats.record_connect();
    }

    /// Close the connection, if any.
    pub async fn close(&self) -> Result<()> {
        let taken = self.connection.lock().await.take();
        if let Some(mut connection) = taken {
            connection.stream.shutdown().await?;
            tracing::debug!("Closed connection to {}", self.addr);
        }
        Ok(())
    }

    /// Check if a connection is established.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Connection activity counters.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// The parameter registry.
    pub fn registry(&self) -> &Arc<ParamRegistry> {
        &self.registry
    }

    /// Server address in `host:port` form.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one frame and wait for the next frame on the connection.
    ///
    /// Fails with `NotConnected` before any I/O if there is no connection.
    /// On a timeout, transport error or protocol violation the connection
    /// is dropped.
    pub async fn call(&self, request: Frame) -> Result<Frame> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(RpcError::NotConnected)?;

        tracing::trace!("Calling {} with {} byte payload", self.addr, request.length());

        let outcome = match self.call_timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, connection.round_trip(&request, &self.stats))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(RpcError::Timeout),
                }
            }
            None => connection.round_trip(&request, &self.stats).await,
        };

        if let Err(e) = &outcome {
            tracing::warn!("Dropping connection to {}: {}", self.addr, e);
            *guard = None;
        }
        outcome
    }

    /// Invoke `interface.method` with the descriptor registered as
    /// `param_type`.
    ///
    /// The outputs of the server are written back into `args`; the formal
    /// result is returned (usually `None`).
    pub async fn invoke(
        &self,
        interface: &str,
        method: &str,
        param_type: ParamTypeId,
        args: &mut [&mut (dyn Any + Send)],
    ) -> Result<Option<Value>> {
        let request = {
            let descriptor = self.registry.require(param_type)?;
            let refs: Vec<&(dyn Any + Send)> = args.iter().map(|arg| &**arg).collect();
            let params = descriptor.build_request_payload(&refs)?;
            CallMessage::new(interface, method, param_type, params).to_frame()?
        };

        let response = self.call(request).await?;
        let message = CallMessage::from_frame(&response)?;

        if message.is_fault() {
            let fault = message.decode_fault()?;
            tracing::debug!(
                "{}.{} failed remotely: {:?} {}",
                interface,
                method,
                fault.kind,
                fault.message
            );
            return Err(fault.into());
        }

        let descriptor = self.registry.require(message.param_type)?;
        descriptor.apply_response(&message.params, args)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("addr", &self.addr)
            .field("call_timeout", &self.call_timeout)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Fault, FaultKind, TYPE_CALL};
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};
    use tokio::io::{duplex, DuplexStream};

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Counter {
        name: String,
        value: i64,
    }

    fn registry() -> Arc<ParamRegistry> {
        let mut registry = ParamRegistry::new();
        registry.register_record::<Counter>(3, "counter").unwrap();
        Arc::new(registry)
    }

    /// Read one frame from the peer side of a duplex.
    async fn read_frame(peer: &mut DuplexStream) -> Frame {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 256];
        loop {
            if let Some(frame) = decoder.decode().unwrap() {
                return frame;
            }
            let n = peer.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed early");
            decoder.extend(&buf[..n]);
        }
    }

    #[test]
    fn test_builder_configuration() {
        let client = ClientBuilder::new()
            .host("10.0.0.1")
            .port(7001)
            .call_timeout(None)
            .receive_buffer_size(0)
            .build();

        assert_eq!(client.addr(), "10.0.0.1:7001");
        assert!(client.call_timeout.is_none());
        assert_eq!(client.receive_buffer_size, 1);
    }

    #[test]
    fn test_builder_from_config() {
        let config = ClientConfig {
            port: 6000,
            call_timeout_ms: 250,
            ..ClientConfig::default()
        };
        let client = ClientBuilder::from_config(&config).build();

        assert_eq!(client.addr(), "127.0.0.1:6000");
        assert_eq!(client.call_timeout, Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_zero_receive_buffer_from_config() {
        let config = ClientConfig {
            receive_buffer_size: 0,
            ..ClientConfig::default()
        };
        let client = ClientBuilder::from_config(&config).build();
        assert_eq!(client.receive_buffer_size, 1);

        let (client_side, mut peer) = duplex(1024);
        client.attach(client_side).await;

        tokio::spawn(async move {
            let _ = read_frame(&mut peer).await;
            peer.write_all(&Frame::new(TYPE_CALL, Bytes::from_static(b"pong")).encode())
                .await
                .unwrap();
            peer
        });

        let response = client
            .call(Frame::new(TYPE_CALL, Bytes::from_static(b"ping")))
            .await
            .unwrap();
        assert_eq!(response.payload(), b"pong");
        assert!(client.is_connected().await);
    }

    #[tokio::test]
    async fn test_call_without_connection() {
        let client = ClientBuilder::new().build();

        let err = client
            .call(Frame::new(TYPE_CALL, Bytes::from_static(b"x")))
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::NotConnected));
        assert!(client.stats().is_idle());
    }

    #[tokio::test]
    async fn test_invoke_unregistered_param_type() {
        let client = ClientBuilder::new().build();
        let mut arg = 1i32;

        let err = client
            .invoke("Svc", "m", 42, &mut [&mut arg])
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invalid_argument_sends_nothing() {
        let client = ClientBuilder::new().registry(registry()).build();
        let (client_side, _peer) = duplex(1024);
        client.attach(client_side).await;

        let mut wrong = String::from("not a counter");
        let err = client
            .invoke("Svc", "m", 3, &mut [&mut wrong])
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::InvalidArgument(_)));
        assert_eq!(client.stats().frames_sent(), 0);
        assert!(client.is_connected().await);
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let client = ClientBuilder::new().build();
        let (client_side, mut peer) = duplex(1024);
        client.attach(client_side).await;

        let server = tokio::spawn(async move {
            let request = read_frame(&mut peer).await;
            assert_eq!(request.payload(), b"ping");
            peer.write_all(&Frame::new(TYPE_CALL, Bytes::from_static(b"pong")).encode())
                .await
                .unwrap();
            peer
        });

        let response = client
            .call(Frame::new(TYPE_CALL, Bytes::from_static(b"ping")))
            .await
            .unwrap();
        let _peer = server.await.unwrap();

        assert_eq!(response.payload(), b"pong");
        let stats = client.stats();
        assert_eq!(stats.connects(), 1);
        assert_eq!(stats.frames_sent(), 1);
        assert_eq!(stats.bytes_sent(), (HEADER_SIZE + 4) as u64);
        assert_eq!(stats.frames_received(), 1);
    }

    #[tokio::test]
    async fn test_invoke_mutates_argument() {
        let registry = registry();
        let client = ClientBuilder::new().registry(registry.clone()).build();
        let (client_side, mut peer) = duplex(1024);
        client.attach(client_side).await;

        tokio::spawn(async move {
            let request = CallMessage::from_frame(&read_frame(&mut peer).await).unwrap();
            let descriptor = registry.get(request.param_type).unwrap();
            let mut args = descriptor.extract_args(&request.params).unwrap();

            let counter = args[0].downcast_mut::<Counter>().unwrap();
            counter.value += 10;

            let params = {
                let refs: Vec<&(dyn Any + Send)> = args.iter().map(|a| &**a).collect();
                descriptor.build_response_payload(&refs, None).unwrap()
            };
            let response = CallMessage::new(request.interface, request.method, 3, params);
            peer.write_all(&response.to_frame().unwrap().encode())
                .await
                .unwrap();
            peer
        });

        let mut counter = Counter {
            name: "hits".into(),
            value: 5,
        };
        let result = client
            .invoke("Stats", "add", 3, &mut [&mut counter])
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(counter.value, 15);
        assert_eq!(counter.name, "hits");
    }

    #[tokio::test]
    async fn test_invoke_remote_fault() {
        let client = ClientBuilder::new().registry(registry()).build();
        let (client_side, mut peer) = duplex(1024);
        client.attach(client_side).await;

        tokio::spawn(async move {
            let request = CallMessage::from_frame(&read_frame(&mut peer).await).unwrap();
            let fault = Fault::new(FaultKind::UnknownService, "no such service");
            let response = CallMessage::fault(request.interface, request.method, &fault).unwrap();
            peer.write_all(&response.to_frame().unwrap().encode())
                .await
                .unwrap();
            peer
        });

        let mut counter = Counter {
            name: "x".into(),
            value: 0,
        };
        let err = client
            .invoke("Missing", "add", 3, &mut [&mut counter])
            .await
            .unwrap_err();

        match err {
            RpcError::RemoteFault { kind, message } => {
                assert_eq!(kind, FaultKind::UnknownService);
                assert_eq!(message, "no such service");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.value, 0);
        assert!(client.is_connected().await);
    }

    #[tokio::test]
    async fn test_call_timeout_drops_connection() {
        let client = ClientBuilder::new()
            .call_timeout(Some(Duration::from_millis(50)))
            .build();
        let (client_side, _peer) = duplex(1024);
        client.attach(client_side).await;

        let err = client
            .call(Frame::new(TYPE_CALL, Bytes::from_static(b"hello")))
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::Timeout));
        assert!(!client.is_connected().await);
        assert_eq!(client.stats().frames_sent(), 1);
    }

    #[tokio::test]
    async fn test_peer_close_is_connection_closed() {
        let client = ClientBuilder::new().build();
        let (client_side, mut peer) = duplex(1024);
        client.attach(client_side).await;

        tokio::spawn(async move {
            let _ = read_frame(&mut peer).await;
            drop(peer);
        });

        let err = client
            .call(Frame::new(TYPE_CALL, Bytes::from_static(b"hello")))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_oversized_response_is_protocol_violation() {
        let client = ClientBuilder::new().max_frame_size(16).build();
        let (client_side, mut peer) = duplex(1024);
        client.attach(client_side).await;

        tokio::spawn(async move {
            let _ = read_frame(&mut peer).await;
            peer.write_all(&Frame::new(TYPE_CALL, Bytes::from(vec![0u8; 64])).encode())
                .await
                .unwrap();
            peer
        });

        let err = client
            .call(Frame::new(TYPE_CALL, Bytes::from_static(b"hello")))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::ProtocolViolation(_)));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_close() {
        let client = ClientBuilder::new().build();
        let (client_side, _peer) = duplex(64);
        client.attach(client_side).await;
        assert!(client.is_connected().await);

        client.close().await.unwrap();
        assert!(!client.is_connected().await);
        // Closing twice is a no-op.
        client.close().await.unwrap();
    }
}
