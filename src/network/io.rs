//! Network Import and Export
//!
//! Text serialization of a whole [`Network`] through serde, as JSON or TOML.
//! Imported networks are validated before they are handed out.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use libc::c_int;

use super::model::Network;
use super::{NetworkError, NetworkResult};
use crate::error::BridgeError;

/// Text format of a serialized network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NetworkFormat {
    Json = 0,
    Toml = 1,
}

impl NetworkFormat {
    pub const ALL: [NetworkFormat; 2] = [NetworkFormat::Json, NetworkFormat::Toml];

    pub fn tag(self) -> c_int {
        self as c_int
    }

    pub fn name(self) -> &'static str {
        match self {
            NetworkFormat::Json => "json",
            NetworkFormat::Toml => "toml",
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl TryFrom<c_int> for NetworkFormat {
    type Error = BridgeError;

    fn try_from(tag: c_int) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(NetworkFormat::Json),
            1 => Ok(NetworkFormat::Toml),
            other => Err(BridgeError::unsupported("network format", other)),
        }
    }
}

impl FromStr for NetworkFormat {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NetworkError::Invalid(format!("unknown network format '{}'", s)))
    }
}

impl fmt::Display for NetworkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse and validate a network
pub fn load(text: &str, format: NetworkFormat) -> NetworkResult<Network> {
    let network: Network = match format {
        NetworkFormat::Json => serde_json::from_str(text)?,
        NetworkFormat::Toml => toml::from_str(text)?,
    };
    network.validate()?;
    Ok(network)
}

/// Read a network file, taking the format from its extension unless given
pub fn load_file(path: &Path, format: Option<NetworkFormat>) -> NetworkResult<Network> {
    let format = match format.or_else(|| NetworkFormat::from_path(path)) {
        Some(format) => format,
        None => {
            return Err(NetworkError::Invalid(format!(
                "cannot infer network format of {}",
                path.display()
            )))
        }
    };
    let text = std::fs::read_to_string(path)?;
    load(&text, format)
}

/// Serialize a network
pub fn dump(network: &Network, format: NetworkFormat) -> NetworkResult<String> {
    network.check_values()?;
    Ok(match format {
        NetworkFormat::Json => serde_json::to_string_pretty(network)?,
        NetworkFormat::Toml => toml::to_string_pretty(network)?,
    })
}
