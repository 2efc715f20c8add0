//! FFI Wire Types
//!
//! `#[repr(C)]` structures shared with the caller. These mirror
//! `include/gridbridge.h` field for field; changing either side breaks the ABI.

use std::ffi::c_void;
use std::ptr;

use libc::{c_char, c_int};

use crate::error::{BridgeError, BridgeResult};

/// Generic flat array envelope: pointer plus element count
#[repr(C)]
#[derive(Debug)]
pub struct ArrayFfi<T> {
    pub ptr: *mut T,
    pub length: c_int,
}

impl<T> Clone for ArrayFfi<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayFfi<T> {}

impl<T> ArrayFfi<T> {
    /// An empty array with a null pointer
    pub const fn empty() -> Self {
        Self {
            ptr: ptr::null_mut(),
            length: 0,
        }
    }

    /// Element count, rejecting negative lengths
    pub fn checked_len(&self) -> BridgeResult<usize> {
        usize::try_from(self.length)
            .map_err(|_| BridgeError::InvalidInput(format!("negative array length {}", self.length)))
    }

    /// Borrow the elements as a slice.
    ///
    /// A zero-length array may carry a null pointer; any other null pointer is
    /// rejected.
    ///
    /// # Safety
    /// `ptr` must point to `length` initialised elements of `T` that stay
    /// valid for `'a`.
    pub unsafe fn as_slice<'a>(&self) -> BridgeResult<&'a [T]> {
        let len = self.checked_len()?;
        if len == 0 {
            return Ok(&[]);
        }
        if self.ptr.is_null() {
            return Err(BridgeError::NullPointer("array data"));
        }
        if (self.ptr as usize) % std::mem::align_of::<T>() != 0 {
            return Err(BridgeError::InvalidInput("misaligned array data".to_string()));
        }
        // SAFETY: non-null and aligned, caller guarantees `len` valid elements
        Ok(unsafe { std::slice::from_raw_parts(self.ptr as *const T, len) })
    }

    /// Reinterpret the element pointer without touching the data
    pub fn cast<U>(self) -> ArrayFfi<U> {
        ArrayFfi {
            ptr: self.ptr as *mut U,
            length: self.length,
        }
    }
}

/// One named, typed column
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeriesFfi {
    /// NUL-terminated UTF-8 name
    pub name: *mut c_char,
    /// Whether this series is the row index
    pub index: bool,
    /// Column type tag: 0=string, 1=double, 2=int, 3=boolean
    pub type_: c_int,
    /// Element buffer, layout determined by `type_`
    pub data: ArrayFfi<c_void>,
}

/// A table: ordered series sharing one row count
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DataframeFfi {
    pub series: *mut SeriesFfi,
    pub series_count: c_int,
}

impl DataframeFfi {
    pub const fn empty() -> Self {
        Self {
            series: ptr::null_mut(),
            series_count: 0,
        }
    }
}

/// Several tables returned by one call
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DataframeArrayFfi {
    pub dataframes: *mut DataframeFfi,
    pub count: c_int,
}

/// Per-call failure slot. A null `message` after the call means success.
#[repr(C)]
#[derive(Debug)]
pub struct ExceptionHandler {
    pub message: *mut c_char,
}

impl ExceptionHandler {
    /// A cleared slot
    pub const fn new() -> Self {
        Self {
            message: ptr::null_mut(),
        }
    }
}

impl Default for ExceptionHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a host length into the wire's `int` length field
pub fn wire_len(len: usize) -> BridgeResult<c_int> {
    c_int::try_from(len)
        .map_err(|_| BridgeError::Encoding(format!("length {} does not fit the wire format", len)))
}
