//! Boundary Error Taxonomy
//!
//! Every failure that can reach the external caller is a [`BridgeError`].
//! Entry points never let one escape as a panic; the exception channel turns
//! it into a message string (see [`crate::exception`]).

use thiserror::Error;

use crate::config::ConfigError;
use crate::dataframe::ColumnType;
use crate::handle::RawHandle;
use crate::network::NetworkError;

/// Errors surfaced through the exception channel.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Handle is unknown, already destroyed, or refers to another kind of object
    #[error("invalid handle {handle}: {reason}")]
    InvalidHandle { handle: RawHandle, reason: String },

    /// A series required by the entry point is not in the caller's dataframe
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// A series exists but carries a different type tag than expected
    #[error("column '{name}' has type {actual}, expected {expected}")]
    WrongColumnType {
        name: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    /// An enum or type tag outside the handled set
    #[error("unsupported {kind} value: {value}")]
    UnsupportedVariant { kind: &'static str, value: i64 },

    /// Caller input is malformed (bad counts, unknown series, invalid UTF-8)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A pointer argument that must be set was null
    #[error("null pointer passed for {0}")]
    NullPointer(&'static str),

    /// Failure reported by the grid model
    #[error(transparent)]
    Domain(#[from] NetworkError),

    /// Failure loading the runtime configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A value could not be materialised in a native buffer
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A panic was caught at the boundary
    #[error("internal error: {0}")]
    Panic(String),
}

/// Result type for boundary operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Invalid handle helper.
    pub fn invalid_handle(handle: RawHandle, reason: impl Into<String>) -> Self {
        BridgeError::InvalidHandle {
            handle,
            reason: reason.into(),
        }
    }

    /// Unsupported variant helper.
    pub fn unsupported(kind: &'static str, value: impl Into<i64>) -> Self {
        BridgeError::UnsupportedVariant {
            kind,
            value: value.into(),
        }
    }

    /// Short name of the error kind, used when a message would otherwise be empty.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::InvalidHandle { .. } => "invalid handle",
            BridgeError::MissingColumn(_) => "missing column",
            BridgeError::WrongColumnType { .. } => "wrong column type",
            BridgeError::UnsupportedVariant { .. } => "unsupported variant",
            BridgeError::InvalidInput(_) => "invalid input",
            BridgeError::NullPointer(_) => "null pointer",
            BridgeError::Domain(_) => "domain error",
            BridgeError::Config(_) => "configuration error",
            BridgeError::Encoding(_) => "encoding error",
            BridgeError::Panic(_) => "internal error",
        }
    }
}
