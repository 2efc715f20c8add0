//! Network Entry Points
//!
//! All functions follow `(runtime, inputs..., exception) -> result`. On
//! failure the exception slot is set and the result is the failure value
//! (`0`, `false` or null) and must be ignored.

use libc::{c_char, c_int};

use super::runtime::{runtime, Runtime};
use crate::dataframe::{dataframes_into_ffi, DataframeReader};
use crate::error::BridgeResult;
use crate::exception;
use crate::ffi::{
    borrow_str, borrow_str_array, into_c_string, string_array_into_ffi, wire_len, ArrayFfi,
    DataframeArrayFfi, DataframeFfi, ExceptionHandler,
};
use crate::handle::RawHandle;
use crate::network::{dataframes, io, ElementType, Network, NetworkFormat, NetworkObject};

/// Create an empty network and return its handle
///
/// # Safety
/// `runtime` must be a live runtime, `id` a NUL-terminated string and
/// `exception` null or a valid slot. The same applies to every function in
/// this module.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_create_network(
    runtime: *const Runtime,
    id: *const c_char,
    exception: *mut ExceptionHandler,
) -> RawHandle {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let id = unsafe { borrow_str(id, "network id") }?;
        let network = Network::new(id);
        network.validate()?;
        Ok(runtime.handles().create(NetworkObject::new(network)))
    })
}

/// Parse a serialized network and return its handle
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_load_network(
    runtime: *const Runtime,
    text: *const c_char,
    format: c_int,
    exception: *mut ExceptionHandler,
) -> RawHandle {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let format = NetworkFormat::try_from(format)?;
        let text = unsafe { borrow_str(text, "network text") }?;
        let network = io::load(text, format)?;
        Ok(runtime.handles().create(NetworkObject::new(network)))
    })
}

/// Serialize a network. Release the string with `gridbridge_free_string`.
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_dump_network(
    runtime: *const Runtime,
    network: RawHandle,
    format: c_int,
    exception: *mut ExceptionHandler,
) -> *mut c_char {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let format = NetworkFormat::try_from(format)?;
        let object = runtime.network(network)?;
        let text = io::dump(&object.read(), format)?;
        into_c_string(&text)
    })
}

/// All elements of one type. Release with `gridbridge_free_dataframe`.
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_get_network_elements(
    runtime: *const Runtime,
    network: RawHandle,
    element_type: c_int,
    exception: *mut ExceptionHandler,
) -> *mut DataframeFfi {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let element_type = ElementType::try_from(element_type)?;
        let object = runtime.network(network)?;
        let include_properties = runtime.config().dataframes.include_properties;
        let dataframe =
            dataframes::elements_dataframe(&object.read(), element_type, include_properties)?;
        dataframe.into_ffi()
    })
}

/// Elements of several types in one call, in the order requested. Release
/// with `gridbridge_free_dataframe_array`.
///
/// # Safety
/// See [`gridbridge_create_network`]; `element_types` must point to `count`
/// ints.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_get_network_elements_multi(
    runtime: *const Runtime,
    network: RawHandle,
    element_types: *const c_int,
    count: c_int,
    exception: *mut ExceptionHandler,
) -> *mut DataframeArrayFfi {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let tags = ArrayFfi {
            ptr: element_types as *mut c_int,
            length: count,
        };
        let element_types = unsafe { tags.as_slice() }?
            .iter()
            .map(|&tag| ElementType::try_from(tag))
            .collect::<BridgeResult<Vec<_>>>()?;
        let object = runtime.network(network)?;
        let include_properties = runtime.config().dataframes.include_properties;
        let frames = {
            let network = object.read();
            element_types
                .into_iter()
                .map(|ty| dataframes::elements_dataframe(&network, ty, include_properties))
                .collect::<BridgeResult<Vec<_>>>()?
        };
        dataframes_into_ffi(frames)
    })
}

/// Ids of all elements of one type. Release with
/// `gridbridge_free_string_array`.
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_get_network_element_ids(
    runtime: *const Runtime,
    network: RawHandle,
    element_type: c_int,
    exception: *mut ExceptionHandler,
) -> *mut ArrayFfi<*mut c_char> {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let element_type = ElementType::try_from(element_type)?;
        let object = runtime.network(network)?;
        let ids = object.read().ids(element_type);
        string_array_into_ffi(ids)
    })
}

/// Series description of one element type: `name`, `type`, `is_index` and
/// `modifiable`. Release with `gridbridge_free_dataframe`.
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_get_series_metadata(
    runtime: *const Runtime,
    element_type: c_int,
    exception: *mut ExceptionHandler,
) -> *mut DataframeFfi {
    exception::call(exception, || {
        unsafe { self::runtime(runtime) }?;
        let element_type = ElementType::try_from(element_type)?;
        dataframes::series_metadata(element_type)?.into_ffi()
    })
}

/// Write caller values into existing elements, matched by the index series.
/// Returns the number of rows applied; nothing changes on failure.
///
/// # Safety
/// See [`gridbridge_create_network`]; `dataframe` stays owned by the caller.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_update_network_elements(
    runtime: *const Runtime,
    network: RawHandle,
    element_type: c_int,
    dataframe: *const DataframeFfi,
    exception: *mut ExceptionHandler,
) -> c_int {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let element_type = ElementType::try_from(element_type)?;
        let reader = unsafe { DataframeReader::from_raw(dataframe) }?;
        let object = runtime.network(network)?;
        let updated = dataframes::update_elements(&mut object.write(), element_type, &reader)?;
        wire_len(updated)
    })
}

/// Create elements from caller rows. Returns the number created; nothing is
/// created on failure.
///
/// # Safety
/// See [`gridbridge_update_network_elements`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_create_network_elements(
    runtime: *const Runtime,
    network: RawHandle,
    element_type: c_int,
    dataframe: *const DataframeFfi,
    exception: *mut ExceptionHandler,
) -> c_int {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let element_type = ElementType::try_from(element_type)?;
        let reader = unsafe { DataframeReader::from_raw(dataframe) }?;
        let object = runtime.network(network)?;
        let created = dataframes::create_elements(&mut object.write(), element_type, &reader)?;
        wire_len(created)
    })
}

/// Remove elements by id. An unknown id fails the whole call.
///
/// # Safety
/// See [`gridbridge_create_network`]; `ids` must point to `count` strings.
#[no_mangle]
pub unsafe extern "C" fn gridbridge_remove_network_elements(
    runtime: *const Runtime,
    network: RawHandle,
    element_type: c_int,
    ids: *const *const c_char,
    count: c_int,
    exception: *mut ExceptionHandler,
) -> c_int {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        let element_type = ElementType::try_from(element_type)?;
        let ids = unsafe { borrow_str_array(ids, count, "element id") }?;
        let object = runtime.network(network)?;
        let removed = object.write().remove(element_type, &ids)?;
        wire_len(removed)
    })
}

/// Store the caller's concurrent-access preference on a network
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_set_concurrent_access(
    runtime: *const Runtime,
    network: RawHandle,
    allow: bool,
    exception: *mut ExceptionHandler,
) {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        runtime.network(network)?.set_concurrent_access(allow);
        Ok(())
    })
}

/// Read back the concurrent-access preference
///
/// # Safety
/// See [`gridbridge_create_network`].
#[no_mangle]
pub unsafe extern "C" fn gridbridge_is_concurrent_access(
    runtime: *const Runtime,
    network: RawHandle,
    exception: *mut ExceptionHandler,
) -> bool {
    exception::call(exception, || {
        let runtime = unsafe { self::runtime(runtime) }?;
        Ok(runtime.network(network)?.is_concurrent_access())
    })
}
