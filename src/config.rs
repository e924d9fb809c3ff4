//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - rpcwire.toml (default configuration)
//! - Environment variables (RPCWIRE_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # rpcwire.toml
//! [client]
//! host = "10.0.0.5"
//! port = 9080
//! connect_timeout_ms = 10000
//!
//! [server]
//! listen_port = 9080
//! max_connections = 128
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! RPCWIRE_CLIENT__HOST=10.0.0.7
//! RPCWIRE_SERVER__RECEIVE_BUFFER_SIZE=4096
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port, for both connecting and listening.
pub const DEFAULT_PORT: u16 = 9080;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default call timeout in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Default socket read size in bytes.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 2048;

/// Default limit on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Client-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target server host
    pub host: String,
    /// Target server port
    pub port: u16,
    /// Connect timeout
    pub connect_timeout_ms: u64,
    /// Timeout for one call (send + receive); 0 disables the timeout
    pub call_timeout_ms: u64,
    /// Bytes requested per socket read
    pub receive_buffer_size: usize,
    /// Largest accepted response payload
    pub max_frame_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// `host:port` of the target server.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// The call timeout, `None` if disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }
}

/// Server-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub listen_host: String,
    /// Port to bind (0 picks a free port)
    pub listen_port: u16,
    /// Bytes requested per socket read
    pub receive_buffer_size: usize,
    /// Connections served concurrently; further accepts wait for a slot
    pub max_connections: usize,
    /// Largest accepted request payload
    pub max_frame_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_host: DEFAULT_HOST.to_string(),
            listen_port: DEFAULT_PORT,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ServerConfig {
    /// `host:port` to listen on.
    pub fn address(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

impl RpcConfig {
    /// Load configuration from `rpcwire.toml` and the environment.
    pub fn load() -> Result<Self> {
        Ok(Self::figment(Toml::file("rpcwire.toml")).extract()?)
    }

    /// Load configuration from a specific file and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::figment(Toml::file(path.as_ref())).extract()?)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(RpcConfig::default()))
            .merge(file)
            .merge(Env::prefixed("RPCWIRE_").split("__"))
    }
}
