//! FFI Wire Layer for gridbridge
//!
//! Flat, `#[repr(C)]` structures exchanged with the external caller, plus
//! the C string helpers every entry point needs.
//!
//! # Layout
//!
//! ```text
//! DataframeArrayFfi { dataframes, count }
//!         │
//!         ▼
//! DataframeFfi { series, series_count }
//!         │
//!         ▼
//! SeriesFfi { name, index, type, data: ArrayFfi<void> }
//!         │
//!         ▼
//! [f64] | [i32] | [u8] | [char*] ──► "NUL-terminated UTF-8"
//! ```
//!
//! # Ownership
//!
//! Anything the host returns from an entry point is owned by the caller until
//! it is passed back to the paired `gridbridge_free_*` function. Anything the
//! caller passes in stays owned by the caller; the host only borrows it for
//! the duration of the call.

mod strings;
mod types;

pub use strings::{
    borrow_optional_str, borrow_str, borrow_str_array, free_c_string, free_string_array,
    into_c_string, string_array_into_ffi,
};
pub use types::{wire_len, ArrayFfi, DataframeArrayFfi, DataframeFfi, ExceptionHandler, SeriesFfi};
