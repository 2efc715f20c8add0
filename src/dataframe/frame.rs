//! Owned Dataframes and Their Wire Form
//!
//! A [`Dataframe`] is built on the host, converted in one step into a
//! caller-owned [`DataframeFfi`], and later released with
//! [`free_dataframe`]. Conversion encodes every column first, so a failure
//! never leaves a half-built structure behind.

use std::collections::HashSet;
use std::ffi::CString;
use std::ptr;

use tracing::warn;

use super::column::{ColumnBuffer, ColumnData, ColumnType};
use crate::error::{BridgeError, BridgeResult};
use crate::ffi::{wire_len, DataframeArrayFfi, DataframeFfi, SeriesFfi};

// =============================================================================
// Series
// =============================================================================

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub index: bool,
    pub data: ColumnData,
}

impl Series {
    /// A regular data series
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            index: false,
            data,
        }
    }

    /// A series flagged as the row index
    pub fn index(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            index: true,
            data,
        }
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
}

/// A series encoded for the wire but not yet handed out
struct SeriesBuffer {
    name: CString,
    index: bool,
    buffer: ColumnBuffer,
}

impl SeriesBuffer {
    fn encode(series: Series) -> BridgeResult<Self> {
        let name = CString::new(series.name)
            .map_err(|_| BridgeError::Encoding("series name contains NUL".to_string()))?;
        Ok(Self {
            name,
            index: series.index,
            buffer: ColumnBuffer::encode(series.data)?,
        })
    }

    fn into_raw(self) -> SeriesFfi {
        SeriesFfi {
            name: self.name.into_raw(),
            index: self.index,
            type_: self.buffer.column_type().tag(),
            data: self.buffer.into_raw(),
        }
    }

    /// # Safety
    /// `raw` must come from [`SeriesBuffer::into_raw`].
    unsafe fn from_raw(raw: SeriesFfi) -> Option<Self> {
        let column_type = match ColumnType::try_from(raw.type_) {
            Ok(ty) => ty,
            Err(_) => {
                warn!(tag = raw.type_, "refusing to free series with unknown type tag");
                return None;
            }
        };
        let name = if raw.name.is_null() {
            CString::default()
        } else {
            unsafe { CString::from_raw(raw.name) }
        };
        Some(Self {
            name,
            index: raw.index,
            buffer: unsafe { ColumnBuffer::from_raw(column_type, raw.data) },
        })
    }
}

// =============================================================================
// Dataframe
// =============================================================================

/// Ordered series sharing one row count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataframe {
    series: Vec<Series>,
}

impl Dataframe {
    /// Assemble a dataframe, checking that row counts agree, names are unique
    /// and at most one series is the index.
    pub fn new(series: Vec<Series>) -> BridgeResult<Self> {
        if let Some(first) = series.first() {
            let rows = first.len();
            if let Some(bad) = series.iter().find(|s| s.len() != rows) {
                return Err(BridgeError::InvalidInput(format!(
                    "series '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    rows
                )));
            }
        }

        let mut names = HashSet::new();
        for s in &series {
            if !names.insert(s.name.as_str()) {
                return Err(BridgeError::InvalidInput(format!(
                    "duplicate series name '{}'",
                    s.name
                )));
            }
        }

        if series.iter().filter(|s| s.index).count() > 1 {
            return Err(BridgeError::InvalidInput(
                "more than one series flagged as index".to_string(),
            ));
        }

        Ok(Self { series })
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Look up a series by name
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.series.first().map_or(0, Series::len)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Move the dataframe to the caller. Release with [`free_dataframe`].
    pub fn into_ffi(self) -> BridgeResult<*mut DataframeFfi> {
        let prepared = PreparedDataframe::encode(self)?;
        Ok(Box::into_raw(Box::new(prepared.into_raw())))
    }
}

/// A dataframe whose columns are all encoded
struct PreparedDataframe {
    series: Vec<SeriesBuffer>,
}

impl PreparedDataframe {
    fn encode(dataframe: Dataframe) -> BridgeResult<Self> {
        wire_len(dataframe.series.len())?;
        let series = dataframe
            .series
            .into_iter()
            .map(SeriesBuffer::encode)
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(Self { series })
    }

    fn into_raw(self) -> DataframeFfi {
        let series_count = self.series.len() as i32;
        let series: Box<[SeriesFfi]> = self.series.into_iter().map(SeriesBuffer::into_raw).collect();
        DataframeFfi {
            series: Box::into_raw(series) as *mut SeriesFfi,
            series_count,
        }
    }
}

/// Release the series held by a dataframe: leaves, then the series array.
///
/// # Safety
/// `dataframe` must come from this module and must not be released twice.
unsafe fn release_series(dataframe: DataframeFfi) {
    if dataframe.series.is_null() {
        return;
    }
    let count = dataframe.series_count.max(0) as usize;
    let series = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(dataframe.series, count)) };
    for &raw in series.iter() {
        drop(unsafe { SeriesBuffer::from_raw(raw) });
    }
}

/// Release a dataframe returned by [`Dataframe::into_ffi`]. Null is ignored.
///
/// # Safety
/// `ptr` must come from [`Dataframe::into_ffi`] and must not be used again.
pub unsafe fn free_dataframe(ptr: *mut DataframeFfi) {
    if ptr.is_null() {
        return;
    }
    let envelope = unsafe { Box::from_raw(ptr) };
    unsafe { release_series(*envelope) };
}

// =============================================================================
// Dataframe Arrays
// =============================================================================

/// Move several dataframes to the caller as one array. Release with
/// [`free_dataframe_array`].
pub fn dataframes_into_ffi(dataframes: Vec<Dataframe>) -> BridgeResult<*mut DataframeArrayFfi> {
    let count = wire_len(dataframes.len())?;
    let prepared = dataframes
        .into_iter()
        .map(PreparedDataframe::encode)
        .collect::<BridgeResult<Vec<_>>>()?;
    let raw: Box<[DataframeFfi]> = prepared.into_iter().map(PreparedDataframe::into_raw).collect();
    Ok(Box::into_raw(Box::new(DataframeArrayFfi {
        dataframes: Box::into_raw(raw) as *mut DataframeFfi,
        count,
    })))
}

/// Release an array returned by [`dataframes_into_ffi`]. Null is ignored.
///
/// # Safety
/// `ptr` must come from [`dataframes_into_ffi`] and must not be used again.
pub unsafe fn free_dataframe_array(ptr: *mut DataframeArrayFfi) {
    if ptr.is_null() {
        return;
    }
    let envelope = unsafe { Box::from_raw(ptr) };
    if envelope.dataframes.is_null() {
        return;
    }
    let count = envelope.count.max(0) as usize;
    let dataframes =
        unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(envelope.dataframes, count)) };
    for &dataframe in dataframes.iter() {
        unsafe { release_series(dataframe) };
    }
}
