//! Release Entry Points
//!
//! One `free` per allocating entry point. Each takes back exactly what its
//! partner handed out, releasing leaves before containers. Null is always
//! ignored; any other pointer must not be used again.

use libc::c_char;
use tracing::trace;

use crate::dataframe::{free_dataframe, free_dataframe_array};
use crate::ffi::{free_c_string, free_string_array, ArrayFfi, DataframeArrayFfi, DataframeFfi};

/// Release a string returned by the library, including exception messages
///
/// # Safety
/// `ptr` must be null or a string returned by this library.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_free_string(ptr: *mut c_char) {
    trace!(?ptr, "free string");
    unsafe { free_c_string(ptr) }
}

/// Release a dataframe
///
/// # Safety
/// `ptr` must be null or come from an entry point documented to return a
/// dataframe.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_free_dataframe(ptr: *mut DataframeFfi) {
    trace!(?ptr, "free dataframe");
    unsafe { free_dataframe(ptr) }
}

/// Release a dataframe array and every dataframe in it
///
/// # Safety
/// `ptr` must be null or come from `gridbridge_get_network_elements_multi`.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_free_dataframe_array(ptr: *mut DataframeArrayFfi) {
    trace!(?ptr, "free dataframe array");
    unsafe { free_dataframe_array(ptr) }
}

/// Release a string array and every string in it
///
/// # Safety
/// `ptr` must be null or come from `gridbridge_get_network_element_ids`.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_free_string_array(ptr: *mut ArrayFfi<*mut c_char>) {
    trace!(?ptr, "free string array");
    unsafe { free_string_array(ptr) }
}
