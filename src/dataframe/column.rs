//! Typed Column Buffers
//!
//! [`ColumnData`] is the host-side form of a column. `ColumnBuffer` is the
//! same data laid out for the wire. `ColumnBuffer::into_raw` and
//! `ColumnBuffer::from_raw` are the only allocation and release paths for
//! column memory, and both are a single exhaustive match over [`ColumnType`].

use std::ffi::{c_void, CString};
use std::fmt;
use std::ptr;

use libc::{c_char, c_int};

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::{wire_len, ArrayFfi};

// =============================================================================
// Column Type
// =============================================================================

/// Column element type, as tagged on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ColumnType {
    /// Pointer to a NUL-terminated UTF-8 string
    String = 0,
    /// 64-bit float
    Double = 1,
    /// 32-bit signed integer
    Int = 2,
    /// One byte, 0 or 1
    Boolean = 3,
}

impl ColumnType {
    /// Every column type, in tag order
    pub const ALL: [ColumnType; 4] = [
        ColumnType::String,
        ColumnType::Double,
        ColumnType::Int,
        ColumnType::Boolean,
    ];

    /// Wire tag
    pub fn tag(self) -> c_int {
        self as c_int
    }

    /// Lowercase name used in messages and metadata
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Double => "double",
            ColumnType::Int => "int",
            ColumnType::Boolean => "boolean",
        }
    }

    /// Size in bytes of one element in the data buffer
    pub fn element_size(self) -> usize {
        match self {
            ColumnType::String => std::mem::size_of::<*mut c_char>(),
            ColumnType::Double => std::mem::size_of::<f64>(),
            ColumnType::Int => std::mem::size_of::<i32>(),
            ColumnType::Boolean => 1,
        }
    }
}

impl TryFrom<c_int> for ColumnType {
    type Error = BridgeError;

    fn try_from(tag: c_int) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ColumnType::String),
            1 => Ok(ColumnType::Double),
            2 => Ok(ColumnType::Int),
            3 => Ok(ColumnType::Boolean),
            other => Err(BridgeError::unsupported("column type", other)),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Host-side Column Data
// =============================================================================

/// Values of one column, owned by the host
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    String(Vec<String>),
    Double(Vec<f64>),
    Int(Vec<i32>),
    Boolean(Vec<bool>),
}

impl ColumnData {
    /// Empty column of the given type with room for `capacity` rows
    pub fn with_capacity(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::String => ColumnData::String(Vec::with_capacity(capacity)),
            ColumnType::Double => ColumnData::Double(Vec::with_capacity(capacity)),
            ColumnType::Int => ColumnData::Int(Vec::with_capacity(capacity)),
            ColumnType::Boolean => ColumnData::Boolean(Vec::with_capacity(capacity)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::String(_) => ColumnType::String,
            ColumnData::Double(_) => ColumnType::Double,
            ColumnData::Int(_) => ColumnType::Int,
            ColumnData::Boolean(_) => ColumnType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::String(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Native Column Buffer
// =============================================================================

/// Column data in wire layout, still owned by Rust.
///
/// Dropping a `ColumnBuffer` frees everything it owns. Ownership moves to the
/// caller with [`ColumnBuffer::into_raw`] and comes back with
/// [`ColumnBuffer::from_raw`]. Those two and [`ColumnBuffer::encode`] are the
/// only constructors, so every buffer length fits the wire's `int`.
#[derive(Debug)]
pub(crate) enum ColumnBuffer {
    String(Vec<CString>),
    Double(Box<[f64]>),
    Int(Box<[i32]>),
    Boolean(Box<[u8]>),
}

impl ColumnBuffer {
    /// Encode host data. Fails only on strings with interior NUL bytes or
    /// lengths that overflow the wire format; nothing is handed out on failure.
    pub(crate) fn encode(data: ColumnData) -> BridgeResult<Self> {
        wire_len(data.len())?;
        Ok(match data {
            ColumnData::String(values) => ColumnBuffer::String(
                values
                    .into_iter()
                    .map(|s| {
                        CString::new(s).map_err(|e| {
                            BridgeError::Encoding(format!(
                                "string value contains NUL at byte {}",
                                e.nul_position()
                            ))
                        })
                    })
                    .collect::<BridgeResult<Vec<_>>>()?,
            ),
            ColumnData::Double(values) => ColumnBuffer::Double(values.into_boxed_slice()),
            ColumnData::Int(values) => ColumnBuffer::Int(values.into_boxed_slice()),
            ColumnData::Boolean(values) => {
                ColumnBuffer::Boolean(values.into_iter().map(u8::from).collect())
            }
        })
    }

    pub(crate) fn column_type(&self) -> ColumnType {
        match self {
            ColumnBuffer::String(_) => ColumnType::String,
            ColumnBuffer::Double(_) => ColumnType::Double,
            ColumnBuffer::Int(_) => ColumnType::Int,
            ColumnBuffer::Boolean(_) => ColumnType::Boolean,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnBuffer::String(v) => v.len(),
            ColumnBuffer::Double(v) => v.len(),
            ColumnBuffer::Int(v) => v.len(),
            ColumnBuffer::Boolean(v) => v.len(),
        }
    }

    /// Hand the buffer over to the caller.
    ///
    /// The length was checked by [`ColumnBuffer::encode`].
    pub(crate) fn into_raw(self) -> ArrayFfi<c_void> {
        debug_assert!(wire_len(self.len()).is_ok());
        let length = self.len() as c_int;
        let ptr = match self {
            ColumnBuffer::String(values) => {
                let pointers: Box<[*mut c_char]> =
                    values.into_iter().map(CString::into_raw).collect();
                Box::into_raw(pointers) as *mut c_void
            }
            ColumnBuffer::Double(values) => Box::into_raw(values) as *mut c_void,
            ColumnBuffer::Int(values) => Box::into_raw(values) as *mut c_void,
            ColumnBuffer::Boolean(values) => Box::into_raw(values) as *mut c_void,
        };
        ArrayFfi { ptr, length }
    }

    /// Take back a buffer produced by [`ColumnBuffer::into_raw`].
    ///
    /// # Safety
    /// `data` must come from `into_raw` on a buffer of `column_type`, and must
    /// not be reclaimed twice.
    pub(crate) unsafe fn from_raw(column_type: ColumnType, data: ArrayFfi<c_void>) -> Self {
        let len = data.length.max(0) as usize;
        if data.ptr.is_null() {
            return match column_type {
                ColumnType::String => ColumnBuffer::String(Vec::new()),
                ColumnType::Double => ColumnBuffer::Double(Box::default()),
                ColumnType::Int => ColumnBuffer::Int(Box::default()),
                ColumnType::Boolean => ColumnBuffer::Boolean(Box::default()),
            };
        }
        match column_type {
            ColumnType::String => {
                let pointers = unsafe {
                    Box::from_raw(ptr::slice_from_raw_parts_mut(data.ptr as *mut *mut c_char, len))
                };
                ColumnBuffer::String(
                    pointers
                        .iter()
                        .map(|&p| unsafe { CString::from_raw(p) })
                        .collect(),
                )
            }
            ColumnType::Double => ColumnBuffer::Double(unsafe {
                Box::from_raw(ptr::slice_from_raw_parts_mut(data.ptr as *mut f64, len))
            }),
            ColumnType::Int => ColumnBuffer::Int(unsafe {
                Box::from_raw(ptr::slice_from_raw_parts_mut(data.ptr as *mut i32, len))
            }),
            ColumnType::Boolean => ColumnBuffer::Boolean(unsafe {
                Box::from_raw(ptr::slice_from_raw_parts_mut(data.ptr as *mut u8, len))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_tags() {
        for ty in ColumnType::ALL {
            assert_eq!(ColumnType::try_from(ty.tag()).unwrap(), ty);
        }
        assert_eq!(ColumnType::String.tag(), 0);
        assert_eq!(ColumnType::Double.tag(), 1);
        assert_eq!(ColumnType::Int.tag(), 2);
        assert_eq!(ColumnType::Boolean.tag(), 3);
    }

    #[test]
    fn test_column_type_out_of_range() {
        for tag in [-1, 4, 99] {
            let err = ColumnType::try_from(tag).unwrap_err();
            assert!(matches!(err, BridgeError::UnsupportedVariant { .. }));
        }
    }

    #[test]
    fn test_encode_rejects_nul() {
        let data = ColumnData::String(vec!["ok".to_string(), "bad\0".to_string()]);
        let err = ColumnBuffer::encode(data).unwrap_err();
        assert!(matches!(err, BridgeError::Encoding(_)));
    }

    #[test]
    fn test_boolean_layout() {
        let buffer = ColumnBuffer::encode(ColumnData::Boolean(vec![true, false, true])).unwrap();
        assert_eq!(buffer.column_type().element_size(), 1);
        let raw = buffer.into_raw();
        assert_eq!(raw.length, 3);
        let bytes = unsafe { std::slice::from_raw_parts(raw.ptr as *const u8, 3) };
        assert_eq!(bytes, &[1, 0, 1]);
        drop(unsafe { ColumnBuffer::from_raw(ColumnType::Boolean, raw) });
    }

    #[test]
    fn test_string_into_raw_and_back() {
        let values = vec!["a".to_string(), "".to_string(), "ünï".to_string()];
        let buffer = ColumnBuffer::encode(ColumnData::String(values.clone())).unwrap();
        let raw = buffer.into_raw();
        let back = unsafe { ColumnBuffer::from_raw(ColumnType::String, raw) };
        match back {
            ColumnBuffer::String(strings) => {
                let decoded: Vec<String> = strings
                    .into_iter()
                    .map(|s| s.into_string().unwrap())
                    .collect();
                assert_eq!(decoded, values);
            }
            other => panic!("Expected string buffer, got {:?}", other.column_type()),
        }
    }

    #[test]
    fn test_empty_buffers() {
        for ty in ColumnType::ALL {
            let buffer = ColumnBuffer::encode(ColumnData::with_capacity(ty, 0)).unwrap();
            assert_eq!(buffer.len(), 0);
            let raw = buffer.into_raw();
            assert_eq!(raw.length, 0);
            let back = unsafe { ColumnBuffer::from_raw(ty, raw) };
            assert_eq!(back.column_type(), ty);
        }
    }

    #[test]
    fn test_into_raw_length_is_wire_length() {
        let columns = vec![
            ColumnData::String(vec!["x".to_string(); 5]),
            ColumnData::Double(vec![1.0; 17]),
            ColumnData::Int(vec![3; 2]),
            ColumnData::Boolean(vec![true; 9]),
        ];
        for data in columns {
            let ty = data.column_type();
            let expected = wire_len(data.len()).unwrap();
            let raw = ColumnBuffer::encode(data).unwrap().into_raw();
            assert_eq!(raw.length, expected);
            drop(unsafe { ColumnBuffer::from_raw(ty, raw) });
        }
    }
}
