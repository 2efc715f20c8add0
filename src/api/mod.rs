//! C Entry Points
//!
//! The `extern "C"` surface of the library. Every function is a thin shell
//! around [`crate::exception::call`]: borrow the inputs, resolve handles, do
//! the work through the dataframe and network modules, hand the result over.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`runtime`] | runtime create/destroy, handle count and release |
//! | [`network`] | network lifecycle and element dataframes |
//! | [`memory`] | `free` functions for everything returned |

pub mod memory;
pub mod network;
pub mod runtime;

pub use memory::*;
pub use network::*;
pub use runtime::{
    gridbridge_api_version, gridbridge_destroy_handle, gridbridge_live_handle_count,
    gridbridge_runtime_create, gridbridge_runtime_destroy, Runtime, API_VERSION,
};
