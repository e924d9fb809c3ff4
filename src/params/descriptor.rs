//! Parameter serialization descriptors.
//!
//! A descriptor converts call arguments to and from the `params` bytes of a
//! [`CallMessage`](crate::protocol::CallMessage). Arguments travel as
//! type-erased references so one registry can hold descriptors for any
//! argument shape.
//!
//! # Output arguments
//!
//! Results flow back by mutating the caller's own argument objects:
//! [`ParamDescriptor::apply_response`] writes the decoded outputs into the
//! `&mut` arguments it is given, and additionally returns the formal result
//! (usually `None`). Callers inspect their arguments after the call.

use std::any::{type_name, Any};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::MsgPackCodec;
use crate::error::{RpcError, Result};
use crate::protocol::ParamTypeId;

/// A type-erased argument or result.
pub type Value = Box<dyn Any + Send>;

/// Serializer/deserializer bound to one parameter-type id.
pub trait ParamDescriptor: Send + Sync + 'static {
    /// The parameter-type id.
    fn id(&self) -> ParamTypeId;

    /// Human-readable name for logs and errors.
    fn name(&self) -> &str;

    /// Number of arguments this descriptor expects.
    fn arity(&self) -> usize;

    /// Serialize call arguments into a request body.
    fn build_request_payload(&self, args: &[&(dyn Any + Send)]) -> Result<Vec<u8>>;

    /// Reconstruct call arguments from a request body.
    fn extract_args(&self, payload: &[u8]) -> Result<Vec<Value>>;

    /// Serialize the (possibly mutated) arguments and the result into a
    /// response body.
    fn build_response_payload(
        &self,
        args: &[&(dyn Any + Send)],
        result: Option<&(dyn Any + Send)>,
    ) -> Result<Vec<u8>>;

    /// Decode a response body, write outputs into `args` in place and return
    /// the formal result.
    fn apply_response(
        &self,
        payload: &[u8],
        args: &mut [&mut (dyn Any + Send)],
    ) -> Result<Option<Value>>;
}

/// Check that `actual` matches the descriptor arity.
pub fn check_arity(descriptor: &dyn ParamDescriptor, actual: usize) -> Result<()> {
    if actual != descriptor.arity() {
        return Err(RpcError::InvalidArgument(format!(
            "{} expects {} argument(s), got {}",
            descriptor.name(),
            descriptor.arity(),
            actual
        )));
    }
    Ok(())
}

/// Downcast argument `index` to `T`.
pub fn downcast_arg<'a, T: Any>(args: &[&'a (dyn Any + Send)], index: usize) -> Result<&'a T> {
    args.get(index)
        .and_then(|arg| (*arg).downcast_ref::<T>())
        .ok_or_else(|| mismatch::<T>(index))
}

/// Downcast argument `index` to `&mut T`.
pub fn downcast_arg_mut<'a, T: Any>(
    args: &'a mut [&mut (dyn Any + Send)],
    index: usize,
) -> Result<&'a mut T> {
    args.get_mut(index)
        .and_then(|arg| arg.downcast_mut::<T>())
        .ok_or_else(|| mismatch::<T>(index))
}

fn mismatch<T>(index: usize) -> RpcError {
    RpcError::InvalidArgument(format!(
        "argument {} is not a {}",
        index,
        type_name::<T>()
    ))
}

#[derive(Serialize)]
struct ReplyRef<'a, A, R> {
    args: &'a A,
    result: Option<&'a R>,
}

#[derive(Deserialize)]
struct ReplyOwned<A, R> {
    args: A,
    result: Option<R>,
}

/// Descriptor for calls taking one serde record `A` and returning an
/// optional `R`.
///
/// Request body: the record. Response body: `{ args: A, result: R? }`.
/// On the client, the decoded record replaces the caller's argument.
///
/// # Example
///
/// ```
/// use rpcwire::params::{ParamDescriptor, RecordDescriptor};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Report { id: String, count: i32 }
///
/// let descriptor = RecordDescriptor::<Report>::new(7, "report");
///
/// let mut request = Report { id: "abc".into(), count: 0 };
/// let response = descriptor
///     .build_response_payload(&[&Report { id: "abc-ACK".into(), count: 1 }], None)
///     .unwrap();
///
/// descriptor.apply_response(&response, &mut [&mut request]).unwrap();
/// assert_eq!(request, Report { id: "abc-ACK".into(), count: 1 });
/// ```
pub struct RecordDescriptor<A, R = ()> {
    id: ParamTypeId,
    name: String,
    _phantom: PhantomData<fn() -> (A, R)>,
}

impl<A, R> RecordDescriptor<A, R> {
    /// Create a descriptor for the given id.
    pub fn new(id: ParamTypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<A, R> ParamDescriptor for RecordDescriptor<A, R>
where
    A: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    fn id(&self) -> ParamTypeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        1
    }

    fn build_request_payload(&self, args: &[&(dyn Any + Send)]) -> Result<Vec<u8>> {
        check_arity(self, args.len())?;
        let record: &A = downcast_arg(args, 0)?;
        MsgPackCodec::encode(record)
    }

    fn extract_args(&self, payload: &[u8]) -> Result<Vec<Value>> {
        let record: A = MsgPackCodec::decode(payload)?;
        Ok(vec![Box::new(record)])
    }

    fn build_response_payload(
        &self,
        args: &[&(dyn Any + Send)],
        result: Option<&(dyn Any + Send)>,
    ) -> Result<Vec<u8>> {
        check_arity(self, args.len())?;
        let record: &A = downcast_arg(args, 0)?;
        let result = match result {
            Some(value) => Some(value.downcast_ref::<R>().ok_or_else(|| {
                RpcError::InvalidArgument(format!("result is not a {}", type_name::<R>()))
            })?),
            None => None,
        };

        MsgPackCodec::encode(&ReplyRef {
            args: record,
            result,
        })
    }

    fn apply_response(
        &self,
        payload: &[u8],
        args: &mut [&mut (dyn Any + Send)],
    ) -> Result<Option<Value>> {
        check_arity(self, args.len())?;
        let target: &mut A = downcast_arg_mut(args, 0)?;
        let reply: ReplyOwned<A, R> = MsgPackCodec::decode(payload)?;

        *target = reply.args;
        Ok(reply.result.map(|r| Box::new(r) as Value))
    }
}
