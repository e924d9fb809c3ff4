//! Registry mapping parameter-type ids to descriptors.
//!
//! Both peers register the same descriptors under the same ids; nothing
//! about the mapping is negotiated on the wire. Build the registry at
//! startup, then share it behind an `Arc`: lookups take `&self` and need no
//! locking.
//!
//! # Example
//!
//! ```
//! use rpcwire::params::{ParamRegistry, RecordDescriptor};
//!
//! let mut registry = ParamRegistry::new();
//! registry
//!     .register_record::<String>(1, "greeting")
//!     .unwrap();
//!
//! assert!(registry.contains(1));
//! assert_eq!(registry.get(1).unwrap().name(), "greeting");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::descriptor::{ParamDescriptor, RecordDescriptor};
use crate::error::{RpcError, Result};
use crate::protocol::{ParamTypeId, FAULT_PARAM_TYPE};

/// Registry of parameter descriptors keyed by id.
#[derive(Default)]
pub struct ParamRegistry {
    descriptors: HashMap<ParamTypeId, Arc<dyn ParamDescriptor>>,
}

impl ParamRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register a descriptor under its own id.
    ///
    /// The reserved fault id and duplicate ids are configuration errors.
    pub fn register(&mut self, descriptor: Arc<dyn ParamDescriptor>) -> Result<()> {
        let id = descriptor.id();
        if id == FAULT_PARAM_TYPE {
            return Err(RpcError::Configuration(format!(
                "param type {} is reserved for faults",
                id
            )));
        }
        if let Some(existing) = self.descriptors.get(&id) {
            return Err(RpcError::Configuration(format!(
                "param type {} already registered as {}",
                id,
                existing.name()
            )));
        }

        tracing::debug!("Registered param type {} ({})", id, descriptor.name());
        self.descriptors.insert(id, descriptor);
        Ok(())
    }

    /// Register a [`RecordDescriptor`] without a result.
    pub fn register_record<A>(&mut self, id: ParamTypeId, name: &str) -> Result<()>
    where
        A: Serialize + DeserializeOwned + Send + 'static,
    {
        self.register(Arc::new(RecordDescriptor::<A>::new(id, name)))
    }

    /// Register a [`RecordDescriptor`] with a result of type `R`.
    pub fn register_record_with_result<A, R>(&mut self, id: ParamTypeId, name: &str) -> Result<()>
    where
        A: Serialize + DeserializeOwned + Send + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        self.register(Arc::new(RecordDescriptor::<A, R>::new(id, name)))
    }

    /// Get a descriptor by id.
    pub fn get(&self, id: ParamTypeId) -> Option<&dyn ParamDescriptor> {
        self.descriptors.get(&id).map(|d| d.as_ref())
    }

    /// Get a descriptor by id or fail with `Configuration`.
    pub fn require(&self, id: ParamTypeId) -> Result<&dyn ParamDescriptor> {
        self.get(id)
            .ok_or_else(|| RpcError::Configuration(format!("param type {} is not registered", id)))
    }

    /// Check if an id is registered.
    pub fn contains(&self, id: ParamTypeId) -> bool {
        self.descriptors.contains_key(&id)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<ParamTypeId> {
        let mut ids: Vec<_> = self.descriptors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for ParamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
