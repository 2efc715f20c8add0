//! Zero-Copy Dataframe Reader
//!
//! [`DataframeReader`] wraps a caller-supplied [`DataframeFfi`] and exposes
//! typed views over its buffers without copying. The structure is validated
//! once, up front; after that every accessor is a bounds-checked slice read.
//! The reader never frees caller memory.

use std::collections::HashMap;
use std::ffi::CStr;

use libc::c_char;

use super::column::ColumnType;
use super::sentinel::{str_present, Sentinel};
use crate::error::{BridgeError, BridgeResult};
use crate::ffi::{borrow_str, ArrayFfi, DataframeFfi, SeriesFfi};

/// Name of the series used as key when none is flagged as index
pub const DEFAULT_INDEX: &str = "id";

// =============================================================================
// Views
// =============================================================================

/// Borrowed string column. Each row is validated as UTF-8 when read.
#[derive(Debug, Clone, Copy)]
pub struct StringView<'a> {
    name: &'a str,
    values: &'a [*const c_char],
}

impl<'a> StringView<'a> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row value, with `""` kept as is
    pub fn get(&self, row: usize) -> BridgeResult<&'a str> {
        let ptr = *self.values.get(row).ok_or_else(|| {
            BridgeError::InvalidInput(format!(
                "row {} out of range for series '{}' ({} rows)",
                row,
                self.name,
                self.values.len()
            ))
        })?;
        if ptr.is_null() {
            return Err(BridgeError::InvalidInput(format!(
                "null string at row {} of series '{}'",
                row, self.name
            )));
        }
        // SAFETY: the caller guarantees every non-null entry is a valid C string
        unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| {
            BridgeError::InvalidInput(format!(
                "series '{}' row {} is not valid UTF-8",
                self.name, row
            ))
        })
    }

    /// Row value with the absent sentinel mapped to `None`
    pub fn get_opt(&self, row: usize) -> BridgeResult<Option<&'a str>> {
        self.get(row).map(str_present)
    }

    pub fn iter(&self) -> impl Iterator<Item = BridgeResult<&'a str>> + '_ {
        (0..self.len()).map(move |row| self.get(row))
    }

    /// Decode every row, failing on the first invalid one
    pub fn to_vec(&self) -> BridgeResult<Vec<&'a str>> {
        self.iter().collect()
    }
}

/// Borrowed boolean column stored one byte per row
#[derive(Debug, Clone, Copy)]
pub struct BooleanView<'a> {
    bytes: &'a [u8],
}

impl<'a> BooleanView<'a> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Any non-zero byte reads as `true`
    pub fn get(&self, row: usize) -> Option<bool> {
        self.bytes.get(row).map(|&b| b != 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + 'a {
        let bytes = self.bytes;
        bytes.iter().map(|&b| b != 0)
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }
}

/// Typed view over one column buffer
#[derive(Debug, Clone, Copy)]
pub enum ColumnView<'a> {
    String(StringView<'a>),
    Double(&'a [f64]),
    Int(&'a [i32]),
    Boolean(BooleanView<'a>),
}

impl<'a> ColumnView<'a> {
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnView::String(_) => ColumnType::String,
            ColumnView::Double(_) => ColumnType::Double,
            ColumnView::Int(_) => ColumnType::Int,
            ColumnView::Boolean(_) => ColumnType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnView::String(v) => v.len(),
            ColumnView::Double(v) => v.len(),
            ColumnView::Int(v) => v.len(),
            ColumnView::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One validated series of a caller dataframe
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    pub name: &'a str,
    pub index: bool,
    pub data: ColumnView<'a>,
}

impl<'a> SeriesView<'a> {
    /// Validate one wire series.
    ///
    /// # Safety
    /// `raw` must describe buffers that stay valid for `'a`.
    unsafe fn from_raw(raw: &SeriesFfi) -> BridgeResult<Self> {
        let name: &'a str = unsafe { borrow_str(raw.name, "series name") }?;
        let column_type = ColumnType::try_from(raw.type_)?;
        let data = match column_type {
            ColumnType::String => {
                let values = unsafe { raw.data.cast::<*const c_char>().as_slice() }?;
                ColumnView::String(StringView { name, values })
            }
            ColumnType::Double => ColumnView::Double(unsafe { raw.data.cast::<f64>().as_slice() }?),
            ColumnType::Int => ColumnView::Int(unsafe { raw.data.cast::<i32>().as_slice() }?),
            ColumnType::Boolean => {
                let bytes = unsafe { raw.data.cast::<u8>().as_slice() }?;
                ColumnView::Boolean(BooleanView { bytes })
            }
        };
        Ok(Self {
            name,
            index: raw.index,
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    fn wrong_type(&self, expected: ColumnType) -> BridgeError {
        BridgeError::WrongColumnType {
            name: self.name.to_string(),
            expected,
            actual: self.column_type(),
        }
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Validated, read-only access to a caller dataframe
#[derive(Debug)]
pub struct DataframeReader<'a> {
    series: Vec<SeriesView<'a>>,
    row_count: usize,
}

impl<'a> DataframeReader<'a> {
    /// Validate a caller dataframe.
    ///
    /// Rejects a null envelope, negative counts, unknown type tags, non-UTF-8
    /// or duplicate names, null data behind a non-zero length and series of
    /// unequal length.
    ///
    /// # Safety
    /// `ptr` and everything it points to must stay valid and unmodified for
    /// `'a`.
    pub unsafe fn from_raw(ptr: *const DataframeFfi) -> BridgeResult<Self> {
        if ptr.is_null() {
            return Err(BridgeError::NullPointer("dataframe"));
        }
        let frame = unsafe { &*ptr };
        let raw_series = ArrayFfi {
            ptr: frame.series,
            length: frame.series_count,
        };
        let raw_series: &'a [SeriesFfi] = unsafe { raw_series.as_slice() }?;

        let mut series: Vec<SeriesView<'a>> = Vec::with_capacity(raw_series.len());
        for raw in raw_series {
            let view = unsafe { SeriesView::from_raw(raw) }?;
            if series.iter().any(|s| s.name == view.name) {
                return Err(BridgeError::InvalidInput(format!(
                    "duplicate series name '{}'",
                    view.name
                )));
            }
            series.push(view);
        }

        let row_count = series.first().map_or(0, SeriesView::len);
        if let Some(bad) = series.iter().find(|s| s.len() != row_count) {
            return Err(BridgeError::InvalidInput(format!(
                "series '{}' has {} rows, expected {}",
                bad.name,
                bad.len(),
                row_count
            )));
        }

        Ok(Self { series, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// All series in wire order
    pub fn all_series(&self) -> &[SeriesView<'a>] {
        &self.series
    }

    /// Series by name. `None` means absent, `Some` with zero rows means
    /// present but empty.
    pub fn series(&self, name: &str) -> Option<&SeriesView<'a>> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series(name).is_some()
    }

    // -------------------------------------------------------------------------
    // Typed access
    // -------------------------------------------------------------------------

    pub fn optional_strings(&self, name: &str) -> BridgeResult<Option<StringView<'a>>> {
        match self.series(name) {
            None => Ok(None),
            Some(SeriesView {
                data: ColumnView::String(v),
                ..
            }) => Ok(Some(*v)),
            Some(s) => Err(s.wrong_type(ColumnType::String)),
        }
    }

    pub fn optional_doubles(&self, name: &str) -> BridgeResult<Option<&'a [f64]>> {
        match self.series(name) {
            None => Ok(None),
            Some(SeriesView {
                data: ColumnView::Double(v),
                ..
            }) => Ok(Some(*v)),
            Some(s) => Err(s.wrong_type(ColumnType::Double)),
        }
    }

    pub fn optional_ints(&self, name: &str) -> BridgeResult<Option<&'a [i32]>> {
        match self.series(name) {
            None => Ok(None),
            Some(SeriesView {
                data: ColumnView::Int(v),
                ..
            }) => Ok(Some(*v)),
            Some(s) => Err(s.wrong_type(ColumnType::Int)),
        }
    }

    pub fn optional_booleans(&self, name: &str) -> BridgeResult<Option<BooleanView<'a>>> {
        match self.series(name) {
            None => Ok(None),
            Some(SeriesView {
                data: ColumnView::Boolean(v),
                ..
            }) => Ok(Some(*v)),
            Some(s) => Err(s.wrong_type(ColumnType::Boolean)),
        }
    }

    pub fn required_strings(&self, name: &str) -> BridgeResult<StringView<'a>> {
        self.optional_strings(name)?
            .ok_or_else(|| BridgeError::MissingColumn(name.to_string()))
    }

    pub fn required_doubles(&self, name: &str) -> BridgeResult<&'a [f64]> {
        self.optional_doubles(name)?
            .ok_or_else(|| BridgeError::MissingColumn(name.to_string()))
    }

    pub fn required_ints(&self, name: &str) -> BridgeResult<&'a [i32]> {
        self.optional_ints(name)?
            .ok_or_else(|| BridgeError::MissingColumn(name.to_string()))
    }

    pub fn required_booleans(&self, name: &str) -> BridgeResult<BooleanView<'a>> {
        self.optional_booleans(name)?
            .ok_or_else(|| BridgeError::MissingColumn(name.to_string()))
    }

    /// Double at `row` with `NaN` mapped to `None`
    pub fn double_opt(&self, name: &str, row: usize) -> BridgeResult<Option<f64>> {
        Ok(self
            .optional_doubles(name)?
            .and_then(|v| v.get(row).copied())
            .and_then(Sentinel::present))
    }

    /// Int at `row` with the int sentinel mapped to `None`
    pub fn int_opt(&self, name: &str, row: usize) -> BridgeResult<Option<i32>> {
        Ok(self
            .optional_ints(name)?
            .and_then(|v| v.get(row).copied())
            .and_then(Sentinel::present))
    }

    // -------------------------------------------------------------------------
    // Index
    // -------------------------------------------------------------------------

    /// The key series: the one flagged as index, else the one named `id`
    pub fn index_series(&self) -> BridgeResult<&SeriesView<'a>> {
        self.series
            .iter()
            .find(|s| s.index)
            .or_else(|| self.series(DEFAULT_INDEX))
            .ok_or_else(|| BridgeError::MissingColumn(DEFAULT_INDEX.to_string()))
    }

    /// Key values as a string view
    pub fn index(&self) -> BridgeResult<StringView<'a>> {
        let series = self.index_series()?;
        match series.data {
            ColumnView::String(v) => Ok(v),
            _ => Err(series.wrong_type(ColumnType::String)),
        }
    }

    /// Key of one row
    pub fn index_value(&self, row: usize) -> BridgeResult<&'a str> {
        self.index()?.get(row)
    }

    /// Map from key to row. Duplicate keys are rejected.
    pub fn index_positions(&self) -> BridgeResult<HashMap<&'a str, usize>> {
        let index = self.index()?;
        let mut positions = HashMap::with_capacity(index.len());
        for row in 0..index.len() {
            let key = index.get(row)?;
            if positions.insert(key, row).is_some() {
                return Err(BridgeError::InvalidInput(format!(
                    "duplicate index value '{}'",
                    key
                )));
            }
        }
        Ok(positions)
    }
}
