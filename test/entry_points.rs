//! C Entry Point Tests
//!
//! Drives the `extern "C"` surface the way a foreign caller does: raw
//! pointers in, exception slot checked after every call, every returned
//! allocation released through the matching `free`.

use std::ffi::{CStr, CString};
use std::ptr;

use gridbridge::api::*;
use gridbridge::dataframe::{ColumnData, ColumnType, Dataframe, DataframeReader, Series};
use gridbridge::ffi::{DataframeFfi, ExceptionHandler};
use gridbridge::network::{ElementType, NetworkFormat};
use gridbridge::NULL_HANDLE;
use libc::{c_char, c_int};

const NETWORK_JSON: &str = r#"{
    "id": "three-bus",
    "buses": [
        {"id": "b1", "nominal_v": 400.0, "v_mag": 402.1},
        {"id": "b2", "nominal_v": 400.0},
        {"id": "b3", "nominal_v": 225.0, "properties": {"zone": "east"}}
    ],
    "generators": [
        {"id": "g1", "bus_id": "b1", "target_p": 300.0, "voltage_regulator_on": true},
        {"id": "g2", "bus_id": "b3", "target_p": 50.0, "target_q": 10.0}
    ],
    "loads": [
        {"id": "l1", "bus_id": "b2", "p0": 250.0, "q0": 20.0},
        {"id": "l2", "bus_id": "b3", "p0": 95.0}
    ],
    "lines": [
        {"id": "ln1", "bus1_id": "b1", "bus2_id": "b2", "r": 0.5, "x": 10.0},
        {"id": "ln2", "bus1_id": "b2", "bus2_id": "b3", "r": 1.0, "x": 20.0}
    ]
}"#;

// ============================================================================
// Helpers
// ============================================================================

/// Take the slot's message, releasing it through the library
fn take_message(exc: &mut ExceptionHandler) -> Option<String> {
    if exc.message.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(exc.message) }
        .to_string_lossy()
        .into_owned();
    unsafe { gridbridge_free_string(exc.message) };
    exc.message = ptr::null_mut();
    Some(text)
}

fn assert_ok(exc: &mut ExceptionHandler) {
    if let Some(message) = take_message(exc) {
        panic!("call failed: {message}");
    }
}

struct Fixture {
    runtime: *mut Runtime,
    network: u64,
}

impl Fixture {
    fn new() -> Self {
        let mut exc = ExceptionHandler::new();
        let runtime = unsafe { gridbridge_runtime_create(ptr::null(), &mut exc) };
        assert_ok(&mut exc);
        assert!(!runtime.is_null());

        let text = CString::new(NETWORK_JSON).unwrap();
        let network = unsafe {
            gridbridge_load_network(runtime, text.as_ptr(), NetworkFormat::Json.tag(), &mut exc)
        };
        assert_ok(&mut exc);
        assert_ne!(network, NULL_HANDLE);
        Self { runtime, network }
    }

    /// Fetch one element dataframe and hand a reader over it to `f`
    fn with_elements<R>(&self, ty: ElementType, f: impl FnOnce(&DataframeReader<'_>) -> R) -> R {
        let mut exc = ExceptionHandler::new();
        let raw = unsafe {
            gridbridge_get_network_elements(self.runtime, self.network, ty.tag(), &mut exc)
        };
        assert_ok(&mut exc);
        let result = {
            let reader = unsafe { DataframeReader::from_raw(raw) }.unwrap();
            f(&reader)
        };
        unsafe { gridbridge_free_dataframe(raw) };
        result
    }

    fn ids(&self, ty: ElementType) -> Vec<String> {
        let mut exc = ExceptionHandler::new();
        let raw = unsafe {
            gridbridge_get_network_element_ids(self.runtime, self.network, ty.tag(), &mut exc)
        };
        assert_ok(&mut exc);
        let ids = unsafe {
            (*raw)
                .as_slice()
                .unwrap()
                .iter()
                .map(|&p| CStr::from_ptr(p).to_str().unwrap().to_string())
                .collect()
        };
        unsafe { gridbridge_free_string_array(raw) };
        ids
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let mut exc = ExceptionHandler::new();
        unsafe { gridbridge_runtime_destroy(self.runtime, &mut exc) };
        assert!(exc.message.is_null());
    }
}

/// Run `f` over a library-allocated copy of `frame`, freed afterwards
fn with_frame<R>(frame: Dataframe, f: impl FnOnce(*const DataframeFfi) -> R) -> R {
    let raw = frame.into_ffi().unwrap();
    let result = f(raw);
    unsafe { gridbridge_free_dataframe(raw) };
    result
}

// ============================================================================
// Runtime and handles
// ============================================================================

#[test]
fn test_api_version() {
    assert_eq!(gridbridge_api_version(), API_VERSION);
}

#[test]
fn test_null_runtime_reports_through_slot() {
    let mut exc = ExceptionHandler::new();
    let count = unsafe { gridbridge_live_handle_count(ptr::null(), &mut exc) };
    assert_eq!(count, 0);
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("null pointer passed for runtime")
    );
}

#[test]
fn test_missing_config_file() {
    let mut exc = ExceptionHandler::new();
    let path = c"/definitely/not/here/gridbridge.toml";
    let runtime = unsafe { gridbridge_runtime_create(path.as_ptr(), &mut exc) };
    assert!(runtime.is_null());
    assert!(take_message(&mut exc)
        .unwrap()
        .contains("Config file not found"));
}

#[test]
fn test_handle_lifecycle() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();

    let empty = unsafe { gridbridge_create_network(fx.runtime, c"empty".as_ptr(), &mut exc) };
    assert_ok(&mut exc);
    assert_ne!(empty, fx.network);
    assert_eq!(unsafe { gridbridge_live_handle_count(fx.runtime, &mut exc) }, 2);

    unsafe { gridbridge_destroy_handle(fx.runtime, empty, &mut exc) };
    assert_ok(&mut exc);
    assert_eq!(unsafe { gridbridge_live_handle_count(fx.runtime, &mut exc) }, 1);

    unsafe { gridbridge_destroy_handle(fx.runtime, empty, &mut exc) };
    assert!(take_message(&mut exc)
        .unwrap()
        .starts_with("invalid handle"));
}

#[test]
fn test_destroyed_handle_is_invalid() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();

    unsafe { gridbridge_destroy_handle(fx.runtime, fx.network, &mut exc) };
    assert_ok(&mut exc);

    let raw = unsafe {
        gridbridge_get_network_elements(fx.runtime, fx.network, ElementType::Bus.tag(), &mut exc)
    };
    assert!(raw.is_null());
    assert_eq!(
        take_message(&mut exc),
        Some(format!("invalid handle {}: unknown or destroyed", fx.network))
    );

    let raw = unsafe {
        gridbridge_get_network_elements(fx.runtime, NULL_HANDLE, ElementType::Bus.tag(), &mut exc)
    };
    assert!(raw.is_null());
    assert!(take_message(&mut exc).is_some());
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_get_generators() {
    let fx = Fixture::new();
    fx.with_elements(ElementType::Generator, |reader| {
        assert_eq!(reader.row_count(), 2);
        assert_eq!(reader.index_series().unwrap().name, "id");
        assert_eq!(reader.index().unwrap().to_vec().unwrap(), vec!["g1", "g2"]);
        assert_eq!(reader.required_doubles("target_p").unwrap(), &[300.0, 50.0]);

        let target_q = reader.required_doubles("target_q").unwrap();
        assert!(target_q[0].is_nan());
        assert_eq!(target_q[1], 10.0);

        let regulating = reader.required_booleans("voltage_regulator_on").unwrap();
        assert_eq!(regulating.to_vec(), vec![true, false]);

        let bus = reader.required_strings("bus_id").unwrap();
        assert_eq!(bus.to_vec().unwrap(), vec!["b1", "b3"]);
    });
}

#[test]
fn test_property_columns() {
    let fx = Fixture::new();
    fx.with_elements(ElementType::Bus, |reader| {
        let zone = reader.required_strings("zone").unwrap();
        assert_eq!(zone.get_opt(0).unwrap(), None);
        assert_eq!(zone.get_opt(2).unwrap(), Some("east"));
        assert_eq!(reader.int_opt("island", 0).unwrap(), None);
    });
}

#[test]
fn test_unsupported_element_type() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let raw = unsafe { gridbridge_get_network_elements(fx.runtime, fx.network, 9, &mut exc) };
    assert!(raw.is_null());
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("unsupported element type value: 9")
    );

    let text = unsafe { gridbridge_dump_network(fx.runtime, fx.network, -1, &mut exc) };
    assert!(text.is_null());
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("unsupported network format value: -1")
    );
}

#[test]
fn test_get_elements_multi() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let types: [c_int; 3] = [
        ElementType::Line.tag(),
        ElementType::Bus.tag(),
        ElementType::Load.tag(),
    ];
    let raw = unsafe {
        gridbridge_get_network_elements_multi(
            fx.runtime,
            fx.network,
            types.as_ptr(),
            types.len() as c_int,
            &mut exc,
        )
    };
    assert_ok(&mut exc);

    unsafe {
        assert_eq!((*raw).count, 3);
        let rows: Vec<usize> = (0..3)
            .map(|i| {
                DataframeReader::from_raw((*raw).dataframes.add(i))
                    .unwrap()
                    .row_count()
            })
            .collect();
        assert_eq!(rows, vec![2, 3, 2]);

        let lines = DataframeReader::from_raw((*raw).dataframes).unwrap();
        assert!(lines.contains("bus1_id"));
        gridbridge_free_dataframe_array(raw);
    }

    // One bad tag fails the whole call
    let bad: [c_int; 2] = [ElementType::Bus.tag(), 42];
    let raw = unsafe {
        gridbridge_get_network_elements_multi(fx.runtime, fx.network, bad.as_ptr(), 2, &mut exc)
    };
    assert!(raw.is_null());
    assert!(take_message(&mut exc).is_some());
}

#[test]
fn test_element_ids() {
    let fx = Fixture::new();
    assert_eq!(fx.ids(ElementType::Load), vec!["l1", "l2"]);
    assert_eq!(fx.ids(ElementType::Bus), vec!["b1", "b2", "b3"]);
}

#[test]
fn test_series_metadata() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let raw = unsafe {
        gridbridge_get_series_metadata(fx.runtime, ElementType::Generator.tag(), &mut exc)
    };
    assert_ok(&mut exc);

    let reader = unsafe { DataframeReader::from_raw(raw) }.unwrap();
    let positions = reader.index_positions().unwrap();
    let types = reader.required_ints("type").unwrap();
    let is_index = reader.required_booleans("is_index").unwrap();
    let modifiable = reader.required_booleans("modifiable").unwrap();

    assert_eq!(is_index.get(positions["id"]), Some(true));
    assert_eq!(modifiable.get(positions["id"]), Some(false));
    assert_eq!(types[positions["target_p"]], ColumnType::Double.tag());
    assert_eq!(modifiable.get(positions["target_p"]), Some(true));
    assert_eq!(modifiable.get(positions["min_q"]), Some(false));
    assert_eq!(types[positions["connected"]], ColumnType::Boolean.tag());

    unsafe { gridbridge_free_dataframe(raw) };
}

#[test]
fn test_dump_and_reload() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let text = unsafe {
        gridbridge_dump_network(fx.runtime, fx.network, NetworkFormat::Toml.tag(), &mut exc)
    };
    assert_ok(&mut exc);

    let copy = unsafe {
        gridbridge_load_network(fx.runtime, text, NetworkFormat::Toml.tag(), &mut exc)
    };
    assert_ok(&mut exc);
    unsafe { gridbridge_free_string(text) };

    let raw = unsafe {
        gridbridge_get_network_element_ids(fx.runtime, copy, ElementType::Line.tag(), &mut exc)
    };
    assert_ok(&mut exc);
    unsafe {
        assert_eq!((*raw).length, 2);
        gridbridge_free_string_array(raw);
    }

    let garbage = c"id = ";
    let handle = unsafe {
        gridbridge_load_network(fx.runtime, garbage.as_ptr(), NetworkFormat::Toml.tag(), &mut exc)
    };
    assert_eq!(handle, NULL_HANDLE);
    assert!(take_message(&mut exc)
        .unwrap()
        .starts_with("Failed to parse TOML network"));
}

#[test]
fn test_json_dump_reloads() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let text = unsafe {
        gridbridge_dump_network(fx.runtime, fx.network, NetworkFormat::Json.tag(), &mut exc)
    };
    assert_ok(&mut exc);

    let copy = unsafe {
        gridbridge_load_network(fx.runtime, text, NetworkFormat::Json.tag(), &mut exc)
    };
    assert_ok(&mut exc);
    assert_ne!(copy, NULL_HANDLE);
    unsafe { gridbridge_free_string(text) };
}

#[test]
fn test_non_finite_import_fails() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let text = c"id = \"n\"\n\n[[buses]]\nid = \"b1\"\nnominal_v = inf\n";
    let handle = unsafe {
        gridbridge_load_network(fx.runtime, text.as_ptr(), NetworkFormat::Toml.tag(), &mut exc)
    };
    assert_eq!(handle, NULL_HANDLE);
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("invalid network: nominal_v of 'b1' must be finite, got inf")
    );
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn test_update_without_id_column() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let frame = Dataframe::new(vec![Series::new(
        "target_p",
        ColumnData::Double(vec![1.0]),
    )])
    .unwrap();

    let updated = with_frame(frame, |df| unsafe {
        gridbridge_update_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Generator.tag(),
            df,
            &mut exc,
        )
    });
    assert_eq!(updated, 0);
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("missing required column 'id'")
    );

    fx.with_elements(ElementType::Generator, |reader| {
        assert_eq!(reader.required_doubles("target_p").unwrap(), &[300.0, 50.0]);
    });
}

#[test]
fn test_update_generators() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let frame = Dataframe::new(vec![
        Series::index("id", ColumnData::String(vec!["g2".into()])),
        Series::new("target_p", ColumnData::Double(vec![75.0])),
        Series::new("target_q", ColumnData::Double(vec![f64::NAN])),
        Series::new("connected", ColumnData::Boolean(vec![false])),
    ])
    .unwrap();

    let updated = with_frame(frame, |df| unsafe {
        gridbridge_update_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Generator.tag(),
            df,
            &mut exc,
        )
    });
    assert_ok(&mut exc);
    assert_eq!(updated, 1);

    fx.with_elements(ElementType::Generator, |reader| {
        assert_eq!(reader.required_doubles("target_p").unwrap(), &[300.0, 75.0]);
        assert_eq!(reader.double_opt("target_q", 1).unwrap(), None);
        let connected = reader.required_booleans("connected").unwrap();
        assert_eq!(connected.to_vec(), vec![true, false]);
    });
}

#[test]
fn test_update_read_only_series_fails() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let frame = Dataframe::new(vec![
        Series::index("id", ColumnData::String(vec!["b1".into()])),
        Series::new("nominal_v", ColumnData::Double(vec![63.0])),
    ])
    .unwrap();

    let updated = with_frame(frame, |df| unsafe {
        gridbridge_update_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Bus.tag(),
            df,
            &mut exc,
        )
    });
    assert_eq!(updated, 0);
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("invalid input: series 'nominal_v' is not modifiable")
    );
}

#[test]
fn test_create_without_id_column() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let frame = Dataframe::new(vec![
        Series::new("bus_id", ColumnData::String(vec!["b1".into()])),
        Series::new("p0", ColumnData::Double(vec![10.0])),
    ])
    .unwrap();

    let created = with_frame(frame, |df| unsafe {
        gridbridge_create_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Load.tag(),
            df,
            &mut exc,
        )
    });
    assert_eq!(created, 0);
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("missing required column 'id'")
    );
    assert_eq!(fx.ids(ElementType::Load), vec!["l1", "l2"]);
}

#[test]
fn test_create_and_remove() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    let frame = Dataframe::new(vec![
        Series::index("id", ColumnData::String(vec!["l3".into(), "l4".into()])),
        Series::new("bus_id", ColumnData::String(vec!["b1".into(), "b2".into()])),
        Series::new("p0", ColumnData::Double(vec![12.0, 8.5])),
    ])
    .unwrap();

    let created = with_frame(frame, |df| unsafe {
        gridbridge_create_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Load.tag(),
            df,
            &mut exc,
        )
    });
    assert_ok(&mut exc);
    assert_eq!(created, 2);
    assert_eq!(fx.ids(ElementType::Load), vec!["l1", "l2", "l3", "l4"]);

    let ids: [*const c_char; 2] = [c"l1".as_ptr(), c"l4".as_ptr()];
    let removed = unsafe {
        gridbridge_remove_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Load.tag(),
            ids.as_ptr(),
            2,
            &mut exc,
        )
    };
    assert_ok(&mut exc);
    assert_eq!(removed, 2);
    assert_eq!(fx.ids(ElementType::Load), vec!["l2", "l3"]);

    // An unknown id removes nothing
    let ids: [*const c_char; 2] = [c"l2".as_ptr(), c"nope".as_ptr()];
    let removed = unsafe {
        gridbridge_remove_network_elements(
            fx.runtime,
            fx.network,
            ElementType::Load.tag(),
            ids.as_ptr(),
            2,
            &mut exc,
        )
    };
    assert_eq!(removed, 0);
    assert_eq!(
        take_message(&mut exc).as_deref(),
        Some("load 'nope' does not exist")
    );
    assert_eq!(fx.ids(ElementType::Load), vec!["l2", "l3"]);
}

#[test]
fn test_concurrent_access_flag() {
    let fx = Fixture::new();
    let mut exc = ExceptionHandler::new();
    assert!(!unsafe { gridbridge_is_concurrent_access(fx.runtime, fx.network, &mut exc) });
    assert_ok(&mut exc);

    unsafe { gridbridge_set_concurrent_access(fx.runtime, fx.network, true, &mut exc) };
    assert_ok(&mut exc);
    assert!(unsafe { gridbridge_is_concurrent_access(fx.runtime, fx.network, &mut exc) });

    unsafe { gridbridge_set_concurrent_access(fx.runtime, 999_999, true, &mut exc) };
    assert!(take_message(&mut exc).is_some());
}

#[test]
fn test_free_functions_ignore_null() {
    unsafe {
        gridbridge_free_string(ptr::null_mut());
        gridbridge_free_dataframe(ptr::null_mut());
        gridbridge_free_dataframe_array(ptr::null_mut());
        gridbridge_free_string_array(ptr::null_mut());
    }
}
