//! Server-side call dispatch.
//!
//! For each inbound frame: decode the envelope, pick the descriptor,
//! extract the arguments, resolve the binding, invoke it and serialize the
//! (possibly mutated) arguments back. Every failure along the way becomes a
//! fault response, so a client blocked on its read always gets an answer.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;

use crate::params::{ParamRegistry, Value};
use crate::protocol::{CallMessage, Fault, FaultKind, Frame, TYPE_CALL};
use crate::service::{Resolution, ServiceTable};

/// Routes call frames to bound handlers.
pub struct Dispatcher {
    registry: Arc<ParamRegistry>,
    services: Arc<ServiceTable>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry and a binding table.
    pub fn new(registry: Arc<ParamRegistry>, services: Arc<ServiceTable>) -> Self {
        Self { registry, services }
    }

    /// The descriptors requests are decoded with.
    pub fn registry(&self) -> &ParamRegistry {
        &self.registry
    }

    /// The binding table.
    pub fn services(&self) -> &ServiceTable {
        &self.services
    }

    /// Dispatch one request frame and build its response frame.
    pub fn dispatch(&self, frame: &Frame) -> Frame {
        let request = match CallMessage::from_frame(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                let fault = Fault::new(FaultKind::MalformedRequest, e.to_string());
                return fault_frame("", "", fault);
            }
        };

        match self.execute(&request) {
            Ok(params) => {
                let response = CallMessage::new(
                    request.interface.as_str(),
                    request.method.as_str(),
                    request.param_type,
                    params,
                );
                match response.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => fault_frame(
                        &request.interface,
                        &request.method,
                        Fault::new(FaultKind::Invocation, e.to_string()),
                    ),
                }
            }
            Err(fault) => {
                tracing::warn!(
                    "{}.{} (param type {}) failed: {:?} {}",
                    request.interface,
                    request.method,
                    request.param_type,
                    fault.kind,
                    fault.message
                );
                fault_frame(&request.interface, &request.method, fault)
            }
        }
    }

    /// Run a decoded request, returning the response params.
    fn execute(&self, request: &CallMessage) -> Result<Vec<u8>, Fault> {
        let descriptor = self.registry.get(request.param_type).ok_or_else(|| {
            Fault::new(
                FaultKind::UnknownParamType,
                format!("param type {} is not registered", request.param_type),
            )
        })?;

        let mut args = descriptor
            .extract_args(&request.params)
            .map_err(|e| Fault::new(FaultKind::InvalidArgument, e.to_string()))?;

        let handler = match self
            .services
            .resolve(&request.interface, &request.method, request.param_type)
        {
            Resolution::Found(handler) => handler,
            Resolution::UnknownService => {
                return Err(Fault::new(
                    FaultKind::UnknownService,
                    format!("no service bound as {}", request.interface),
                ))
            }
            Resolution::UnknownMethod => {
                return Err(Fault::new(
                    FaultKind::UnknownMethod,
                    format!(
                        "{} has no method {} for param type {}",
                        request.interface, request.method, request.param_type
                    ),
                ))
            }
        };

        tracing::trace!("Invoking {}.{}", request.interface, request.method);

        let outcome = catch_unwind(AssertUnwindSafe(|| handler.invoke(&mut args)));
        let result: Option<Value> = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(message)) => return Err(Fault::new(FaultKind::Invocation, message)),
            Err(panic) => {
                return Err(Fault::new(
                    FaultKind::Invocation,
                    format!("handler panicked: {}", panic_message(&*panic)),
                ))
            }
        };

        let refs: Vec<&(dyn Any + Send)> = args.iter().map(|arg| &**arg).collect();
        descriptor
            .build_response_payload(&refs, result.as_deref())
            .map_err(|e| Fault::new(FaultKind::Invocation, e.to_string()))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("services", &self.services.interfaces())
            .finish()
    }
}

/// Build a fault response frame.
///
/// Falls back to an empty call frame if the fault itself cannot be encoded;
/// the client then fails decoding instead of waiting forever.
fn fault_frame(interface: &str, method: &str, fault: Fault) -> Frame {
    match CallMessage::fault(interface, method, &fault).and_then(|msg| msg.to_frame()) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("Failed to encode fault response: {}", e);
            Frame::new(TYPE_CALL, Bytes::new())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
