//! C String Helpers
//!
//! Conversions between Rust strings and the NUL-terminated UTF-8 buffers
//! that cross the boundary.

use std::ffi::{CStr, CString};
use std::ptr;

use libc::{c_char, c_int};

use super::types::{wire_len, ArrayFfi};
use crate::error::{BridgeError, BridgeResult};

/// Allocate a caller-owned C string. Release with [`free_c_string`].
pub fn into_c_string(s: &str) -> BridgeResult<*mut c_char> {
    CString::new(s)
        .map(CString::into_raw)
        .map_err(|e| BridgeError::Encoding(format!("string contains NUL at byte {}", e.nul_position())))
}

/// Release a string produced by [`into_c_string`]. Null is ignored.
///
/// # Safety
/// `ptr` must come from [`into_c_string`] (or `CString::into_raw`) and must
/// not be used again.
pub unsafe fn free_c_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr) });
}

/// Borrow a caller-supplied C string as `&str`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer valid for `'a`.
pub unsafe fn borrow_str<'a>(ptr: *const c_char, what: &'static str) -> BridgeResult<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::NullPointer(what));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BridgeError::InvalidInput(format!("{} is not valid UTF-8", what)))
}

/// Like [`borrow_str`] but a null pointer means "not given".
///
/// # Safety
/// Same as [`borrow_str`].
pub unsafe fn borrow_optional_str<'a>(
    ptr: *const c_char,
    what: &'static str,
) -> BridgeResult<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { borrow_str(ptr, what) }.map(Some)
}

/// Borrow a caller-supplied array of C strings.
///
/// # Safety
/// `ptr` must point to `count` C string pointers, each valid for `'a`.
pub unsafe fn borrow_str_array<'a>(
    ptr: *const *const c_char,
    count: c_int,
    what: &'static str,
) -> BridgeResult<Vec<&'a str>> {
    let array = ArrayFfi {
        ptr: ptr as *mut *const c_char,
        length: count,
    };
    let pointers = unsafe { array.as_slice() }?;
    pointers
        .iter()
        .map(|&p| unsafe { borrow_str(p, what) })
        .collect()
}

/// Move a list of strings into a caller-owned string array.
///
/// All strings are encoded before anything is handed out, so an encoding
/// failure leaks nothing. Release with [`free_string_array`].
pub fn string_array_into_ffi(values: Vec<String>) -> BridgeResult<*mut ArrayFfi<*mut c_char>> {
    let length = wire_len(values.len())?;
    let encoded = values
        .into_iter()
        .map(|s| {
            CString::new(s)
                .map_err(|e| BridgeError::Encoding(format!("string contains NUL at byte {}", e.nul_position())))
        })
        .collect::<BridgeResult<Vec<_>>>()?;

    let pointers: Box<[*mut c_char]> = encoded.into_iter().map(CString::into_raw).collect();
    let array = ArrayFfi {
        ptr: Box::into_raw(pointers) as *mut *mut c_char,
        length,
    };
    Ok(Box::into_raw(Box::new(array)))
}

/// Release an array produced by [`string_array_into_ffi`]: each string, then
/// the pointer array, then the envelope. Null is ignored.
///
/// # Safety
/// `array` must come from [`string_array_into_ffi`] and must not be used again.
pub unsafe fn free_string_array(array: *mut ArrayFfi<*mut c_char>) {
    if array.is_null() {
        return;
    }
    let envelope = unsafe { Box::from_raw(array) };
    let len = envelope.length.max(0) as usize;
    if envelope.ptr.is_null() {
        return;
    }
    let pointers = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(envelope.ptr, len)) };
    for &s in pointers.iter() {
        unsafe { free_c_string(s) };
    }
}
