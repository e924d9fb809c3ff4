//! Static binding table for server-side dispatch.
//!
//! Implementations are bound at startup under `(interface, method,
//! param_type)`. The server never discovers implementations dynamically:
//! anything not in the table resolves to a fault.
//!
//! # Example
//!
//! ```
//! use rpcwire::service::{Resolution, ServiceTable};
//!
//! let mut table = ServiceTable::new();
//! table.bind_record("Greeter", "greet", 1, |name: &mut String| {
//!     name.insert_str(0, "hello ");
//!     Ok(())
//! });
//!
//! assert!(matches!(table.resolve("Greeter", "greet", 1), Resolution::Found(_)));
//! assert!(matches!(table.resolve("Greeter", "wave", 1), Resolution::UnknownMethod));
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::params::Value;
use crate::protocol::ParamTypeId;

/// Result type for handler functions: formal result or a fault message.
pub type HandlerResult = std::result::Result<Option<Value>, String>;

/// Trait for bound method implementations.
///
/// Handlers receive the decoded arguments mutably: whatever they leave in
/// `args` is serialized back to the caller.
pub trait MethodHandler: Send + Sync + 'static {
    /// Invoke the method.
    fn invoke(&self, args: &mut [Value]) -> HandlerResult;
}

/// Handler over raw type-erased arguments.
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&mut [Value]) -> HandlerResult + Send + Sync + 'static,
{
    /// Wrap a closure over the extracted arguments.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> MethodHandler for FnHandler<F>
where
    F: Fn(&mut [Value]) -> HandlerResult + Send + Sync + 'static,
{
    fn invoke(&self, args: &mut [Value]) -> HandlerResult {
        (self.handler)(args)
    }
}

/// Wrapper that downcasts the single record argument before calling the
/// handler.
pub struct RecordHandler<F, A, R> {
    handler: F,
    _phantom: PhantomData<fn(A) -> R>,
}

impl<F, A, R> RecordHandler<F, A, R>
where
    F: Fn(&mut A) -> std::result::Result<Option<R>, String> + Send + Sync + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, A, R> MethodHandler for RecordHandler<F, A, R>
where
    F: Fn(&mut A) -> std::result::Result<Option<R>, String> + Send + Sync + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    fn invoke(&self, args: &mut [Value]) -> HandlerResult {
        if args.len() != 1 {
            return Err(format!("expected 1 argument, got {}", args.len()));
        }
        let record = args[0]
            .downcast_mut::<A>()
            .ok_or_else(|| format!("argument is not a {}", type_name::<A>()))?;

        let result = (self.handler)(record)?;
        Ok(result.map(|r| Box::new(r) as Value))
    }
}

/// Outcome of a binding lookup.
pub enum Resolution {
    /// A handler is bound.
    Found(Arc<dyn MethodHandler>),
    /// Nothing is bound under the interface name.
    UnknownService,
    /// The interface is bound but not this method/param-type pair.
    UnknownMethod,
}

/// Binding table: interface name → (method, param type) → handler.
#[derive(Default)]
pub struct ServiceTable {
    services: HashMap<String, HashMap<(String, ParamTypeId), Arc<dyn MethodHandler>>>,
}

impl ServiceTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Bind a handler. A later binding for the same key replaces the earlier one.
    pub fn bind(
        &mut self,
        interface: &str,
        method: &str,
        param_type: ParamTypeId,
        handler: Arc<dyn MethodHandler>,
    ) -> &mut Self {
        let previous = self
            .services
            .entry(interface.to_string())
            .or_default()
            .insert((method.to_string(), param_type), handler);
        if previous.is_some() {
            tracing::warn!(
                "Rebinding {}.{} (param type {})",
                interface,
                method,
                param_type
            );
        }
        self
    }

    /// Bind a closure over raw arguments.
    pub fn bind_fn<F>(
        &mut self,
        interface: &str,
        method: &str,
        param_type: ParamTypeId,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&mut [Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.bind(interface, method, param_type, Arc::new(FnHandler::new(handler)))
    }

    /// Bind a typed handler that mutates its record argument and returns no result.
    pub fn bind_record<A, F>(
        &mut self,
        interface: &str,
        method: &str,
        param_type: ParamTypeId,
        handler: F,
    ) -> &mut Self
    where
        A: Send + 'static,
        F: Fn(&mut A) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let typed = RecordHandler::<_, A, ()>::new(move |record: &mut A| {
            handler(record).map(|()| None)
        });
        self.bind(interface, method, param_type, Arc::new(typed))
    }

    /// Bind a typed handler that mutates its record argument and returns `R`.
    pub fn bind_record_with_result<A, R, F>(
        &mut self,
        interface: &str,
        method: &str,
        param_type: ParamTypeId,
        handler: F,
    ) -> &mut Self
    where
        A: Send + 'static,
        R: Send + 'static,
        F: Fn(&mut A) -> std::result::Result<R, String> + Send + Sync + 'static,
    {
        let typed = RecordHandler::<_, A, R>::new(move |record: &mut A| handler(record).map(Some));
        self.bind(interface, method, param_type, Arc::new(typed))
    }

    /// Look up the handler for a call.
    pub fn resolve(&self, interface: &str, method: &str, param_type: ParamTypeId) -> Resolution {
        let Some(methods) = self.services.get(interface) else {
            return Resolution::UnknownService;
        };
        match methods.get(&(method.to_string(), param_type)) {
            Some(handler) => Resolution::Found(handler.clone()),
            None => Resolution::UnknownMethod,
        }
    }

    /// Names of all bound interfaces.
    pub fn interfaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.services.values().map(HashMap::len).sum()
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
