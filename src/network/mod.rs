//! Grid Model Collaborator
//!
//! A deliberately small power network model that the entry points operate
//! on: elements, their dataframe mappings, and JSON/TOML import and export.
//! Callers hold a [`NetworkObject`] through an opaque handle.

pub mod dataframes;
pub mod element;
pub mod io;
pub mod model;

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

pub use element::{Element, ElementType};
pub use io::NetworkFormat;
pub use model::{Bus, Generator, Line, Load, Network, ReactiveLimits};

/// Grid model errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("element id '{0}' is already used")]
    DuplicateId(String),

    #[error("{element_type} '{id}' does not exist")]
    UnknownElement { element_type: ElementType, id: String },

    #[error("element '{element_id}' references unknown bus '{bus_id}'")]
    UnknownBus { element_id: String, bus_id: String },

    #[error("bus '{bus_id}' is still used by '{element_id}'")]
    BusInUse { bus_id: String, element_id: String },

    #[error("invalid network: {0}")]
    Invalid(String),

    #[error("Failed to read network file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON network: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML network: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to write TOML network: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

/// Result type for grid model operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// A network shared with the caller through a handle.
///
/// The lock keeps each call memory safe. It gives no consistency guarantee
/// across calls; the concurrent-access flag is stored for the caller and not
/// interpreted here.
#[derive(Debug)]
pub struct NetworkObject {
    network: RwLock<Network>,
    allow_concurrent_access: AtomicBool,
}

impl NetworkObject {
    pub fn new(network: Network) -> Self {
        Self {
            network: RwLock::new(network),
            allow_concurrent_access: AtomicBool::new(false),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Network> {
        self.network.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Network> {
        self.network.write()
    }

    pub fn set_concurrent_access(&self, allow: bool) {
        self.allow_concurrent_access.store(allow, Ordering::Release);
    }

    pub fn is_concurrent_access(&self) -> bool {
        self.allow_concurrent_access.load(Ordering::Acquire)
    }
}
