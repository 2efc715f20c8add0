//! Absent-Value Sentinels
//!
//! The wire format has no null bit. A value that does not exist on the host
//! side is written as the sentinel of its column type, and read back as
//! "absent". This module is the only place those sentinels are defined.
//!
//! | Type    | Sentinel |
//! |---------|----------|
//! | double  | `NaN`    |
//! | int     | `-99999` |
//! | string  | `""`     |
//! | boolean | `false`  |

/// Written for an absent double
pub const DOUBLE_ABSENT: f64 = f64::NAN;

/// Written for an absent int
pub const INT_ABSENT: i32 = -99999;

/// Written for an absent string
pub const STRING_ABSENT: &str = "";

/// Written for an absent boolean. Booleans cannot signal absence on read.
pub const BOOLEAN_ABSENT: bool = false;

/// A column value type with a designated absent sentinel
pub trait Sentinel: Sized {
    /// The sentinel value
    fn absent() -> Self;

    /// Whether `self` is the sentinel
    fn is_absent(&self) -> bool;

    /// Substitute the sentinel for `None`
    fn or_absent(value: Option<Self>) -> Self {
        value.unwrap_or_else(Self::absent)
    }

    /// Map the sentinel back to `None`
    fn present(self) -> Option<Self> {
        if self.is_absent() {
            None
        } else {
            Some(self)
        }
    }
}

impl Sentinel for f64 {
    fn absent() -> Self {
        DOUBLE_ABSENT
    }

    fn is_absent(&self) -> bool {
        self.is_nan()
    }
}

impl Sentinel for i32 {
    fn absent() -> Self {
        INT_ABSENT
    }

    fn is_absent(&self) -> bool {
        *self == INT_ABSENT
    }
}

impl Sentinel for String {
    fn absent() -> Self {
        STRING_ABSENT.to_string()
    }

    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl Sentinel for bool {
    fn absent() -> Self {
        BOOLEAN_ABSENT
    }

    fn is_absent(&self) -> bool {
        false
    }
}

/// Sentinel check for borrowed strings read from the wire
pub fn str_present(value: &str) -> Option<&str> {
    if value == STRING_ABSENT {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sentinel() {
        assert!(f64::or_absent(None).is_nan());
        assert_eq!(f64::or_absent(Some(1.5)), 1.5);
        assert_eq!(f64::NAN.present(), None);
        assert_eq!(2.0f64.present(), Some(2.0));
    }

    #[test]
    fn test_int_sentinel() {
        assert_eq!(i32::or_absent(None), -99999);
        assert_eq!(INT_ABSENT.present(), None);
        assert_eq!(0i32.present(), Some(0));
    }

    #[test]
    fn test_string_sentinel() {
        assert_eq!(String::or_absent(None), "");
        assert_eq!(String::new().present(), None);
        assert_eq!(str_present("bus1"), Some("bus1"));
        assert_eq!(str_present(""), None);
    }

    #[test]
    fn test_boolean_never_absent() {
        assert!(!bool::or_absent(None));
        assert_eq!(false.present(), Some(false));
    }
}
