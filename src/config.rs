//! gridbridge Runtime Configuration
//!
//! Handles parsing of gridbridge.toml configuration files. Every section and
//! field is optional; a missing file path means all defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default file name looked up next to the caller's working directory.
pub const CONFIG_FILE_NAME: &str = "gridbridge.toml";

/// Root configuration structure matching gridbridge.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Handle registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Dataframe output settings
    #[serde(default)]
    pub dataframes: DataframesConfig,
}

impl BridgeConfig {
    /// Load and validate configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the runtime cannot use.
    pub fn validate(&self) -> ConfigResult<()> {
        let shards = self.registry.shard_amount;
        if shards < 2 || !shards.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "registry.shard_amount must be a power of two greater than 1, got {}",
                shards
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "gridbridge=debug"
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Colour escape codes in output
    #[serde(default)]
    pub ansi: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Compact,
            ansi: false,
        }
    }
}

/// Handle registry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Number of map shards
    #[serde(default = "default_shard_amount")]
    pub shard_amount: usize,
}

fn default_shard_amount() -> usize {
    16
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shard_amount: default_shard_amount(),
        }
    }
}

/// Dataframe output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataframesConfig {
    /// Append one string series per element property key
    #[serde(default = "default_true")]
    pub include_properties: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DataframesConfig {
    fn default() -> Self {
        Self {
            include_properties: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.registry.shard_amount, 16);
        assert!(config.dataframes.include_properties);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[logging]
level = "gridbridge=debug"
format = "json"

[registry]
shard_amount = 64

[dataframes]
include_properties = false
"#;
        let config = BridgeConfig::parse(toml_str).unwrap();
        assert_eq!(config.logging.level, "gridbridge=debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.logging.ansi);
        assert_eq!(config.registry.shard_amount, 64);
        assert!(!config.dataframes.include_properties);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = BridgeConfig::parse("[logging]\nansi = true\n").unwrap();
        assert!(config.logging.ansi);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn test_invalid_shard_amount() {
        for bad in ["0", "1", "12"] {
            let text = format!("[registry]\nshard_amount = {}\n", bad);
            let err = BridgeConfig::parse(&text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{} accepted", bad);
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = BridgeConfig::parse("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry]\nshard_amount = 8").unwrap();
        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.registry.shard_amount, 8);
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::load(Path::new("/nonexistent/gridbridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(BridgeConfig::load_or_default(None).is_ok());
    }
}
