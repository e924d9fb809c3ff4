//! Parameter serialization registry.
//!
//! Provides:
//! - [`ParamDescriptor`] - converts arguments/results to and from payload bytes
//! - [`RecordDescriptor`] - descriptor for a single serde record argument
//! - [`ParamRegistry`] - maps parameter-type ids to descriptors

mod descriptor;
mod registry;

pub use descriptor::{
    check_arity, downcast_arg, downcast_arg_mut, ParamDescriptor, RecordDescriptor, Value,
};
pub use registry::ParamRegistry;
