//! Remote interface declarations.
//!
//! An [`InterfaceSpec`] is the static description a client stub is built
//! from: the advertised interface name, whether the interface is a remote
//! stub at all, and which of its methods are remotely invokable (those with
//! a parameter-type id).
//!
//! # Example
//!
//! ```
//! use rpcwire::service::{InterfaceSpec, MethodSpec};
//!
//! static REPORT_SERVICE: InterfaceSpec = InterfaceSpec::remote(
//!     "ReportService",
//!     &[MethodSpec::remote("report", 7), MethodSpec::local("describe")],
//! );
//!
//! assert_eq!(REPORT_SERVICE.method("report").unwrap().param_type, Some(7));
//! assert!(!REPORT_SERVICE.method("describe").unwrap().is_remote());
//! ```

use crate::protocol::ParamTypeId;

/// One method of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    /// Method name sent on the wire.
    pub name: &'static str,
    /// Parameter-type id; `None` if the method is not remotely invokable.
    pub param_type: Option<ParamTypeId>,
}

impl MethodSpec {
    /// A remotely invokable method.
    pub const fn remote(name: &'static str, param_type: ParamTypeId) -> Self {
        Self {
            name,
            param_type: Some(param_type),
        }
    }

    /// A method that exists on the interface but is never sent over the wire.
    pub const fn local(name: &'static str) -> Self {
        Self {
            name,
            param_type: None,
        }
    }

    /// Check if calls to this method are sent to the server.
    #[inline]
    pub fn is_remote(&self) -> bool {
        self.param_type.is_some()
    }
}

/// A service interface as seen by client stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// Advertised interface name, also the key of the server binding table.
    pub name: &'static str,
    /// Remote-stub marker.
    pub remote: bool,
    /// Declared methods. Names are unique within one interface.
    pub methods: &'static [MethodSpec],
}

impl InterfaceSpec {
    /// An interface carrying the remote-stub marker.
    pub const fn remote(name: &'static str, methods: &'static [MethodSpec]) -> Self {
        Self {
            name,
            remote: true,
            methods,
        }
    }

    /// An interface without the remote-stub marker.
    pub const fn local(name: &'static str, methods: &'static [MethodSpec]) -> Self {
        Self {
            name,
            remote: false,
            methods,
        }
    }

    /// Find a declared method by name.
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }
}
