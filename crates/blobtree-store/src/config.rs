use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Name reported by a driver built from the default configuration.
pub const DRIVER_NAME: &str = "inmemory";

/// Configuration for [`InMemoryDriver`](crate::InMemoryDriver).
///
/// Every field is optional in TOML; missing fields take their defaults and
/// unknown keys are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Name returned by `StorageDriver::name`.
    pub name: String,
    /// Bytes reserved up front for each write session's staging buffer.
    pub write_buffer_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: DRIVER_NAME.to_string(),
            write_buffer_capacity: 0,
        }
    }
}

impl DriverConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        toml::from_str(text).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
