//! Service module - interface declarations and the server binding table.
//!
//! Provides:
//! - [`InterfaceSpec`] / [`MethodSpec`] - what a client stub may call
//! - [`ServiceTable`] - maps `(interface, method, param_type)` to handlers
//! - [`MethodHandler`] - a bound implementation

mod interface;
mod table;

pub use interface::{InterfaceSpec, MethodSpec};
pub use table::{FnHandler, HandlerResult, MethodHandler, RecordHandler, Resolution, ServiceTable};
