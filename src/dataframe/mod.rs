//! Columnar Data Exchange
//!
//! Typed tables ("dataframes") made of named columns ("series") cross the
//! boundary in a flat layout: a series count plus an array of series, each a
//! name, an index flag, a type tag and one contiguous buffer.
//!
//! - [`column`]: column types and the only alloc/free paths for buffers
//! - [`frame`]: owned dataframes and their hand-off to the caller
//! - [`builder`]: records to dataframes, and caller dataframes back to records
//! - [`reader`]: zero-copy validated views over caller dataframes
//! - [`sentinel`]: absent-value sentinels

pub mod builder;
pub mod column;
pub mod frame;
pub mod reader;
pub mod sentinel;

pub use builder::{DataframeMapper, DataframeMapperBuilder, SeriesMetadata};
pub use column::{ColumnData, ColumnType};
pub use frame::{dataframes_into_ffi, free_dataframe, free_dataframe_array, Dataframe, Series};
pub use reader::{BooleanView, ColumnView, DataframeReader, SeriesView, StringView};
pub use sentinel::{
    str_present, Sentinel, BOOLEAN_ABSENT, DOUBLE_ABSENT, INT_ABSENT, STRING_ABSENT,
};
