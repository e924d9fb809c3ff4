//! Client-side stub over one or more remote interfaces.
//!
//! A [`Proxy`] presents the methods declared by its [`InterfaceSpec`]s.
//! Methods carrying a parameter-type id are sent to the server; calls to
//! anything else fail with `UnsupportedOperation` without touching the
//! connection.
//!
//! Typed stubs wrap a proxy and forward each method to [`Proxy::invoke`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use rpcwire::service::{InterfaceSpec, MethodSpec};
//! use rpcwire::{Proxy, RpcClient};
//!
//! static GREETER: InterfaceSpec =
//!     InterfaceSpec::remote("Greeter", &[MethodSpec::remote("greet", 1)]);
//!
//! struct GreeterStub(Proxy);
//!
//! impl GreeterStub {
//!     async fn greet(&self, name: &mut String) -> rpcwire::error::Result<()> {
//!         self.0.invoke("greet", &mut [name]).await.map(|_| ())
//!     }
//! }
//!
//! # fn build(client: Arc<RpcClient>) -> rpcwire::error::Result<GreeterStub> {
//! let stub = GreeterStub(Proxy::new(client, &[&GREETER])?);
//! # Ok(stub)
//! # }
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::client::RpcClient;
use crate::error::{RpcError, Result};
use crate::params::Value;
use crate::service::{InterfaceSpec, MethodSpec};

/// Stub dispatching declared methods through an [`RpcClient`].
#[derive(Debug, Clone)]
pub struct Proxy {
    client: Arc<RpcClient>,
    interfaces: Vec<&'static InterfaceSpec>,
}

impl Proxy {
    /// Create a proxy implementing `interfaces`.
    ///
    /// An empty interface set is a configuration error.
    pub fn new(client: Arc<RpcClient>, interfaces: &[&'static InterfaceSpec]) -> Result<Self> {
        if interfaces.is_empty() {
            return Err(RpcError::Configuration(
                "proxy needs at least one interface".to_string(),
            ));
        }
        Ok(Self {
            client,
            interfaces: interfaces.to_vec(),
        })
    }

    /// The client calls are sent through.
    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    /// Interfaces this proxy implements, in declaration order.
    pub fn interfaces(&self) -> &[&'static InterfaceSpec] {
        &self.interfaces
    }

    /// Name the server binding table is keyed by: the first interface
    /// carrying the remote-stub marker.
    pub fn advertised_name(&self) -> Option<&'static str> {
        self.interfaces
            .iter()
            .find(|iface| iface.remote)
            .map(|iface| iface.name)
    }

    /// Resolve `method` to its advertised interface name and declaration.
    ///
    /// Performs no I/O.
    pub fn resolve(&self, method: &str) -> Result<(&'static str, &'static MethodSpec)> {
        let declared = self
            .interfaces
            .iter()
            .find_map(|&iface| iface.method(method).map(|decl| (iface, decl)));

        let Some((declaring, decl)) = declared else {
            return Err(self.unsupported(self.interfaces[0].name, method));
        };
        if !decl.is_remote() {
            return Err(self.unsupported(declaring.name, method));
        }
        let Some(advertised) = self.advertised_name() else {
            return Err(self.unsupported(declaring.name, method));
        };

        Ok((advertised, decl))
    }

    /// Invoke a declared method, mutating `args` with the server's outputs.
    pub async fn invoke(
        &self,
        method: &str,
        args: &mut [&mut (dyn Any + Send)],
    ) -> Result<Option<Value>> {
        let (interface, decl) = self.resolve(method)?;
        let param_type = decl.param_type.ok_or_else(|| self.unsupported(interface, method))?;
        self.client
            .invoke(interface, decl.name, param_type, args)
            .await
    }

    fn unsupported(&self, interface: &str, method: &str) -> RpcError {
        tracing::debug!("Rejecting local call {}.{}", interface, method);
        RpcError::UnsupportedOperation {
            interface: interface.to_string(),
            method: method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;

    static REMOTE: InterfaceSpec = InterfaceSpec::remote(
        "Billing",
        &[MethodSpec::remote("charge", 2), MethodSpec::local("describe")],
    );

    static PLAIN: InterfaceSpec =
        InterfaceSpec::local("Plain", &[MethodSpec::remote("charge", 2)]);

    fn client() -> Arc<RpcClient> {
        Arc::new(ClientBuilder::new().build())
    }

    fn assert_unsupported(err: RpcError, iface: &str, name: &str) {
        match err {
            RpcError::UnsupportedOperation { interface, method } => {
                assert_eq!(interface, iface);
                assert_eq!(method, name);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_interface_set() {
        let err = Proxy::new(client(), &[]).unwrap_err();
        assert!(matches!(err, RpcError::Configuration(_)));
    }

    #[test]
    fn test_resolve_remote_method() {
        let proxy = Proxy::new(client(), &[&REMOTE]).unwrap();
        let (interface, decl) = proxy.resolve("charge").unwrap();

        assert_eq!(interface, "Billing");
        assert_eq!(decl.param_type, Some(2));
    }

    #[test]
    fn test_resolve_across_interfaces() {
        let proxy = Proxy::new(client(), &[&PLAIN, &REMOTE]).unwrap();
        assert_eq!(proxy.advertised_name(), Some("Billing"));
        assert_eq!(proxy.resolve("charge").unwrap().0, "Billing");
    }

    #[tokio::test]
    async fn test_local_method_is_unsupported() {
        let client = client();
        let proxy = Proxy::new(client.clone(), &[&REMOTE]).unwrap();
        let mut arg = 0i32;

        let err = proxy.invoke("describe", &mut [&mut arg]).await.unwrap_err();

        assert_unsupported(err, "Billing", "describe");
        assert!(client.stats().is_idle());
    }

    #[tokio::test]
    async fn test_undeclared_method_is_unsupported() {
        let proxy = Proxy::new(client(), &[&REMOTE]).unwrap();
        let err = proxy.invoke("refund", &mut []).await.unwrap_err();
        assert_unsupported(err, "Billing", "refund");
    }

    #[tokio::test]
    async fn test_unmarked_interface_is_unsupported() {
        let client = client();
        let proxy = Proxy::new(client.clone(), &[&PLAIN]).unwrap();
        let mut arg = 0i32;

        let err = proxy.invoke("charge", &mut [&mut arg]).await.unwrap_err();

        assert_unsupported(err, "Plain", "charge");
        assert!(client.stats().is_idle());
    }
}
