//! gridbridge - Columnar FFI Boundary for a Grid Model
//!
//! Exposes tabular grid data and opaque object references to an external,
//! dynamically-typed caller through a flat, C-compatible memory protocol.
//!
//! # Features
//!
//! - **Dataframes**: typed columns (string, double, int, boolean) passed as one
//!   contiguous buffer each, in both directions, with zero-copy reads
//! - **Opaque handles**: `u64` references to host objects in a sharded registry
//! - **Exception channel**: one message slot per call; failures never unwind
//!   across the boundary
//! - **Paired ownership**: every allocating entry point has exactly one `free`
//!
//! # Example
//!
//! ```rust
//! use gridbridge::dataframe::{free_dataframe, DataframeMapper, DataframeReader};
//!
//! struct Reading { id: String, value: Option<f64> }
//!
//! let mapper = DataframeMapper::builder()
//!     .index("id", |r: &Reading| r.id.as_str())
//!     .doubles("value", |r: &Reading| r.value)
//!     .build();
//!
//! let records = vec![
//!     Reading { id: "a".into(), value: Some(1.0) },
//!     Reading { id: "b".into(), value: None },
//! ];
//! let raw = mapper.build(&records).unwrap().into_ffi().unwrap();
//!
//! let reader = unsafe { DataframeReader::from_raw(raw) }.unwrap();
//! let values = reader.required_doubles("value").unwrap();
//! assert_eq!(values[0], 1.0);
//! assert!(values[1].is_nan());
//!
//! unsafe { free_dataframe(raw) };
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  External caller│  C structs, u64 handles, exception slot
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  api            │  extern "C" entry points, exception::call
//! └────────┬────────┘
//!          │
//!     ┌────┴─────┬──────────┐
//!     ▼          ▼          ▼
//! ┌────────┐ ┌────────┐ ┌──────────┐
//! │dataframe│ │ handle │ │ network  │
//! └────────┘ └────────┘ └──────────┘
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod dataframe;
pub mod error;
pub mod exception;
pub mod ffi;
pub mod handle;
pub mod logging;
pub mod network;

// Re-export commonly used types
pub use api::{Runtime, API_VERSION};
pub use config::{BridgeConfig, ConfigError, ConfigResult};
pub use dataframe::{
    ColumnData, ColumnType, Dataframe, DataframeMapper, DataframeReader, Series, Sentinel,
};
pub use error::{BridgeError, BridgeResult};
pub use exception::{ChannelState, FailureValue};
pub use ffi::{ArrayFfi, DataframeArrayFfi, DataframeFfi, ExceptionHandler, SeriesFfi};
pub use handle::{HandleRegistry, RawHandle, NULL_HANDLE};
pub use network::{ElementType, Network, NetworkError, NetworkFormat, NetworkObject};
