//! Runtime Lifecycle
//!
//! The [`Runtime`] is the execution context every entry point receives first.
//! It is created and destroyed explicitly by the caller and owns the
//! configuration snapshot and the handle registry.

use std::path::Path;
use std::sync::Arc;

use libc::c_char;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::exception;
use crate::ffi::{borrow_optional_str, ExceptionHandler};
use crate::handle::{HandleRegistry, RawHandle};
use crate::logging;
use crate::network::NetworkObject;

/// Version of the C interface. Bumped on any ABI change.
pub const API_VERSION: u32 = 1;

/// Process state shared by all entry points
pub struct Runtime {
    config: BridgeConfig,
    handles: HandleRegistry,
}

impl Runtime {
    /// Build a runtime from an already validated configuration
    pub fn new(config: BridgeConfig) -> Self {
        let handles = HandleRegistry::with_shard_amount(config.registry.shard_amount);
        Self { config, handles }
    }

    /// Load the configuration (defaults when `path` is `None`), install the
    /// tracing subscriber and build the runtime
    pub fn from_config_path(path: Option<&Path>) -> BridgeResult<Self> {
        let config = BridgeConfig::load_or_default(path)?;
        if logging::init(&config.logging) {
            debug!("tracing subscriber installed");
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Resolve a handle that must refer to a network
    pub fn network(&self, handle: RawHandle) -> BridgeResult<Arc<NetworkObject>> {
        self.handles.resolve::<NetworkObject>(handle)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let leaked = self.handles.clear();
        info!(leaked, "runtime destroyed");
    }
}

/// Borrow the runtime behind a caller pointer.
///
/// # Safety
/// `ptr` must be null or come from [`gridbridge_runtime_create`] and not be
/// destroyed yet.
pub(crate) unsafe fn runtime<'a>(ptr: *const Runtime) -> BridgeResult<&'a Runtime> {
    if ptr.is_null() {
        return Err(BridgeError::NullPointer("runtime"));
    }
    Ok(unsafe { &*ptr })
}

// =============================================================================
// Entry points
// =============================================================================

/// Version of the C interface
#[no_mangle]
pub extern "C" fn gridbridge_api_version() -> u32 {
    API_VERSION
}

/// Create a runtime. `config_path` may be null for defaults.
///
/// # Safety
/// `config_path` must be null or a NUL-terminated string; `exception` must be
/// null or a valid slot.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_runtime_create(
    config_path: *const c_char,
    exception: *mut ExceptionHandler,
) -> *mut Runtime {
    exception::call(exception, || {
        let path = unsafe { borrow_optional_str(config_path, "config path") }?;
        let runtime = Runtime::from_config_path(path.map(Path::new))?;
        info!(config = ?path, "runtime created");
        Ok(Box::into_raw(Box::new(runtime)))
    })
}

/// Destroy a runtime and every handle still registered in it. Null is
/// ignored.
///
/// # Safety
/// `runtime` must be null or come from [`gridbridge_runtime_create`]; no other
/// call may use it concurrently or afterwards.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_runtime_destroy(
    runtime: *mut Runtime,
    exception: *mut ExceptionHandler,
) {
    exception::call(exception, || {
        if !runtime.is_null() {
            drop(unsafe { Box::from_raw(runtime) });
        }
        Ok(())
    })
}

/// Number of live handles
///
/// # Safety
/// See [`gridbridge_runtime_destroy`] for `runtime`.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_live_handle_count(
    runtime: *const Runtime,
    exception: *mut ExceptionHandler,
) -> i64 {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        Ok(runtime.handles.len() as i64)
    })
}

/// Release a handle. Destroying an unknown or already destroyed handle fails.
///
/// # Safety
/// See [`gridbridge_runtime_destroy`] for `runtime`.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_destroy_handle(
    runtime: *const Runtime,
    handle: RawHandle,
    exception: *mut ExceptionHandler,
) {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        runtime.handles.destroy(handle)
    })
}
