//! Server builder and accept loop.
//!
//! The [`ServerBuilder`] collects the parameter registry and the binding
//! table. The [`RpcServer`] manages the lifecycle:
//! 1. Bind the listening socket
//! 2. Accept connections, bounded by a semaphore
//! 3. Serve each connection in its own task with its own decoder
//!
//! # Example
//!
//! ```no_run
//! use rpcwire::{ParamRegistry, ServerBuilder, ServiceTable};
//!
//! #[tokio::main]
//! async fn main() -> rpcwire::error::Result<()> {
//!     let mut registry = ParamRegistry::new();
//!     registry.register_record::<String>(1, "greeting")?;
//!
//!     let mut services = ServiceTable::new();
//!     services.bind_record("Greeter", "greet", 1, |name: &mut String| {
//!         name.insert_str(0, "hello ");
//!         Ok(())
//!     });
//!
//!     let server = ServerBuilder::new()
//!         .listen_port(9080)
//!         .registry(registry)
//!         .services(services)
//!         .bind()
//!         .await?;
//!
//!     server.run().await
//! }
//! ```

mod connection;
mod dispatcher;

pub use connection::{serve_connection, ConnectionOptions};
pub use dispatcher::Dispatcher;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::params::ParamRegistry;
use crate::service::ServiceTable;
use crate::transport::{Stream, TcpServerListener};

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Builder for configuring and creating an [`RpcServer`].
pub struct ServerBuilder {
    listen_host: String,
    listen_port: u16,
    max_connections: usize,
    options: ConnectionOptions,
    registry: ParamRegistry,
    services: ServiceTable,
}

impl ServerBuilder {
    /// Create a new server builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    /// Create a builder from loaded configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            listen_host: config.listen_host.clone(),
            listen_port: config.listen_port,
            max_connections: config.max_connections,
            options: ConnectionOptions {
                receive_buffer_size: config.receive_buffer_size,
                max_frame_size: config.max_frame_size,
            },
            registry: ParamRegistry::new(),
            services: ServiceTable::new(),
        }
    }

    /// Set the interface to bind.
    pub fn listen_host(mut self, host: impl Into<String>) -> Self {
        self.listen_host = host.into();
        self
    }

    /// Set the port to bind. Port 0 picks a free port.
    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the number of connections served concurrently.
    ///
    /// Further connections wait in the listen backlog until a slot frees.
    /// Default: 64
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.max_connections = limit.max(1);
        self
    }

    /// Set the number of bytes requested per socket read.
    ///
    /// Default: 2048
    pub fn receive_buffer_size(mut self, size: usize) -> Self {
        self.options.receive_buffer_size = size.max(1);
        self
    }

    /// Set the largest accepted request payload.
    ///
    /// Default: 16 MiB
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.options.max_frame_size = size;
        self
    }

    /// Set the parameter registry shared with clients out of band.
    pub fn registry(mut self, registry: ParamRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the binding table.
    pub fn services(mut self, services: ServiceTable) -> Self {
        self.services = services;
        self
    }

    /// Build the dispatcher without binding a socket.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(Arc::new(self.registry), Arc::new(self.services))
    }

    /// Bind the listening socket.
    pub async fn bind(self) -> Result<RpcServer> {
        let addr = format!("{}:{}", self.listen_host, self.listen_port);
        let listener = TcpServerListener::bind(&addr).await?;

        if self.services.is_empty() {
            tracing::warn!("Server on {} has no bound services", addr);
        }

        Ok(RpcServer {
            listener,
            connections: Arc::new(Semaphore::new(self.max_connections)),
            options: self.options,
            dispatcher: Arc::new(Dispatcher::new(
                Arc::new(self.registry),
                Arc::new(self.services),
            )),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound RPC server.
pub struct RpcServer {
    listener: TcpServerListener,
    connections: Arc<Semaphore>,
    options: ConnectionOptions,
    dispatcher: Arc<Dispatcher>,
}

impl RpcServer {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The dispatcher shared by all connections.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Serve connections until the process ends.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve connections until `shutdown` completes.
    ///
    /// Stops accepting once `shutdown` fires; connections already being
    /// served run to completion in their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let addr = self.local_addr()?;
        tracing::info!("Serving RPC on {}", addr);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = self.connections.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        continue;
                    }
                },
            };

            tracing::info!("Accepted connection from {}", peer);
            let dispatcher = self.dispatcher.clone();
            let options = self.options;

            tokio::spawn(async move {
                let _permit = permit;
                match serve_connection(stream, &dispatcher, options).await {
                    Ok(()) => tracing::info!("Connection from {} closed", peer),
                    Err(e) => tracing::warn!("Connection from {} failed: {}", peer, e),
                }
            });
        }

        tracing::info!("Server on {} stopped accepting", addr);
        Ok(())
    }

    /// Serve a single already-established stream with this server's
    /// dispatcher and settings.
    pub async fn serve_connection<S: Stream>(&self, stream: S) -> Result<()> {
        serve_connection(stream, &self.dispatcher, self.options).await
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("listener", &self.listener)
            .field("options", &self.options)
            .field("available_slots", &self.connections.available_permits())
            .finish()
    }
}
