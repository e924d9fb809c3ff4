//! TCP implementation.
//!
//! # Example
//!
//! ```no_run
//! use rpcwire::transport::{TcpConnection, TcpServerListener};
//! use std::time::Duration;
//!
//! # async fn example() -> rpcwire::error::Result<()> {
//! let listener = TcpServerListener::bind("127.0.0.1:0").await?;
//! let addr = listener.local_addr()?;
//!
//! let client = TcpConnection::connect(&addr.to_string(), Duration::from_secs(10)).await?;
//! let (server_side, peer) = listener.accept().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{RpcError, Result};

/// A connected TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl TcpConnection {
    /// Wrap an accepted or connected stream.
    ///
    /// Disables Nagle's algorithm: every call is a small request followed by
    /// a wait for the response.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        Ok(Self { stream, peer_addr })
    }

    /// Connect to `addr`, giving up after `timeout`.
    ///
    /// Every failure, including the timeout, is reported as `ConnectFailed`.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!("Connecting to {}", addr);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RpcError::ConnectFailed {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RpcError::ConnectFailed {
                    addr: addr.to_string(),
                    reason: format!("timed out after {:?}", timeout),
                })
            }
        };

        let conn = Self::from_stream(stream).map_err(|e| RpcError::ConnectFailed {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("Connected to {}", conn.peer_addr);
        Ok(conn)
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &TcpStream {
        &self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

impl AsyncRead for TcpConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpConnection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Listening socket for the server side.
#[derive(Debug)]
pub struct TcpServerListener {
    listener: TcpListener,
}

impl TcpServerListener {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::debug!("Bound listener on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// Accept a single connection.
    pub async fn accept(&self) -> Result<(TcpConnection, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        Ok((TcpConnection::from_stream(stream)?, addr))
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_connect_and_accept() {
        let listener = TcpServerListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let mut client = TcpConnection::connect(&addr.to_string(), Duration::from_secs(5))
            .await
            .unwrap();
        let (mut server, _) = accept.await.unwrap();

        assert_eq!(client.peer_addr(), addr);
        assert!(client.inner().nodelay().unwrap());

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_failed() {
        // Bind then drop to obtain a port with nothing listening.
        let addr = {
            let listener = TcpServerListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let err = TcpConnection::connect(&addr.to_string(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::ConnectFailed { .. }));
    }

    #[tokio::test]
    async fn test_connect_bad_address() {
        let err = TcpConnection::connect("not an address", Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            RpcError::ConnectFailed { addr, .. } => assert_eq!(addr, "not an address"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
