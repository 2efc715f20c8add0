//! Opaque Object Handles
//!
//! The external caller never sees host objects, only `u64` handles. The
//! registry maps each live handle to a strong reference of its object.
//!
//! - Ids start at 1 and only grow, so an id is never issued twice.
//! - `0` is never issued and is the failure value of handle-returning calls.
//! - The registry is sharded (`DashMap`), so resolve and destroy on
//!   unrelated handles do not contend.

use std::any::{type_name, Any};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{BridgeError, BridgeResult};

/// Handle value as seen by the caller
pub type RawHandle = u64;

/// Never issued; returned on failure
pub const NULL_HANDLE: RawHandle = 0;

type Entry = Arc<dyn Any + Send + Sync>;

/// Table of live host objects addressed by handle
pub struct HandleRegistry {
    objects: DashMap<RawHandle, Entry>,
    next_id: AtomicU64,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    /// An empty registry with the default shard count
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// An empty registry with `shard_amount` shards. Values that are not a
    /// power of two above one fall back to the default.
    pub fn with_shard_amount(shard_amount: usize) -> Self {
        if shard_amount < 2 || !shard_amount.is_power_of_two() {
            warn!(shard_amount, "invalid shard amount, using default");
            return Self::new();
        }
        Self {
            objects: DashMap::with_shard_amount(shard_amount),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an object and return its new handle
    pub fn create<T: Any + Send + Sync>(&self, object: T) -> RawHandle {
        self.create_shared(Arc::new(object))
    }

    /// Register an already shared object
    pub fn create_shared<T: Any + Send + Sync>(&self, object: Arc<T>) -> RawHandle {
        let handle = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.objects.insert(handle, object);
        debug!(handle, kind = type_name::<T>(), "handle created");
        handle
    }

    /// Look up a live handle as an object of type `T`
    pub fn resolve<T: Any + Send + Sync>(&self, handle: RawHandle) -> BridgeResult<Arc<T>> {
        let entry = self
            .objects
            .get(&handle)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BridgeError::invalid_handle(handle, "unknown or destroyed"))?;
        entry.downcast::<T>().map_err(|_| {
            BridgeError::invalid_handle(handle, format!("not a {}", short_type_name::<T>()))
        })
    }

    /// Drop the registry's reference. The object itself lives on while any
    /// in-flight call still holds it.
    pub fn destroy(&self, handle: RawHandle) -> BridgeResult<()> {
        match self.objects.remove(&handle) {
            Some(_) => {
                debug!(handle, "handle destroyed");
                Ok(())
            }
            None => Err(BridgeError::invalid_handle(handle, "unknown or destroyed")),
        }
    }

    pub fn contains(&self, handle: RawHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every live handle, returning how many were still registered
    pub fn clear(&self) -> usize {
        let leaked = self.objects.len();
        if leaked > 0 {
            let mut handles: Vec<RawHandle> = self.objects.iter().map(|e| *e.key()).collect();
            handles.sort_unstable();
            warn!(leaked, ?handles, "handles still live at teardown");
        }
        self.objects.clear();
        leaked
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
