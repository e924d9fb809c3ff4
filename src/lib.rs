//! # rpcwire
//!
//! A minimal RPC framework over length-prefixed binary frames.
//!
//! A client invokes a method on a remote service; arguments are serialized
//! by a parameter descriptor chosen by an integer id that both peers agree
//! on out of band. The server decodes the call, runs the bound
//! implementation and sends the arguments back. The client writes the
//! returned values into the caller's own argument objects: results flow
//! back by in-place mutation, with a separate formal result that is usually
//! `None`.
//!
//! ## Architecture
//!
//! - **Framing**: `[type_tag: i32 BE][length: i32 BE][payload]`, reassembled
//!   from arbitrary partial reads by [`FrameDecoder`](protocol::FrameDecoder)
//! - **Envelope**: MessagePack `{interface, method, param_type, params}`
//! - **Parameters**: a [`ParamRegistry`] of descriptors keyed by id
//! - **Dispatch**: [`RpcClient`]/[`Proxy`] on one side, a static
//!   [`ServiceTable`] behind an [`RpcServer`] on the other
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rpcwire::{ClientBuilder, ParamRegistry, ServerBuilder, ServiceTable};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Report {
//!     id: String,
//!     count: i32,
//! }
//!
//! fn registry() -> ParamRegistry {
//!     let mut registry = ParamRegistry::new();
//!     registry.register_record::<Report>(7, "report").unwrap();
//!     registry
//! }
//!
//! #[tokio::main]
//! async fn main() -> rpcwire::error::Result<()> {
//!     let mut services = ServiceTable::new();
//!     services.bind_record("ReportService", "report", 7, |r: &mut Report| {
//!         r.id.push_str("-ACK");
//!         r.count += 1;
//!         Ok(())
//!     });
//!
//!     let server = ServerBuilder::new()
//!         .listen_port(0)
//!         .registry(registry())
//!         .services(services)
//!         .bind()
//!         .await?;
//!     let port = server.local_addr()?.port();
//!     tokio::spawn(server.run());
//!
//!     let client = ClientBuilder::new()
//!         .port(port)
//!         .registry(Arc::new(registry()))
//!         .build();
//!     client.connect().await?;
//!
//!     let mut report = Report { id: "abc".into(), count: 0 };
//!     client
//!         .invoke("ReportService", "report", 7, &mut [&mut report])
//!         .await?;
//!     assert_eq!(report.id, "abc-ACK");
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod params;
pub mod protocol;
pub mod server;
pub mod service;
pub mod transport;

mod client;
mod proxy;

pub use client::{ClientBuilder, ConnectionStats, RpcClient};
pub use config::RpcConfig;
pub use error::{Result, RpcError};
pub use params::{ParamDescriptor, ParamRegistry, RecordDescriptor};
pub use protocol::{CallMessage, Frame, FrameDecoder};
pub use proxy::Proxy;
pub use server::{Dispatcher, RpcServer, ServerBuilder};
pub use service::{InterfaceSpec, MethodSpec, ServiceTable};
