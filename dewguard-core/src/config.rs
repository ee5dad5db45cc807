//! Device and persisted output configuration
//!
//! [`DeviceConfig`] holds the tunables of a device context. [`OutputConfig`]
//! is the saved state of every output: a JSON array with one element per
//! channel, each shaped like an output command. The registry snapshot is
//! itself a valid element, so saving is just rendering the snapshot.
//!
//! ```json
//! [
//!   {"index":0,"mode":"dewpoint","max_duty":1,"dewpoint_offset":3,"apply_at_startup":true},
//!   {"index":1,"mode":"off","apply_at_startup":false}
//! ]
//! ```
//!
//! Storage belongs to the firmware. The core parses what it is handed and
//! renders what should be written back.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::OutputCommandPayload;
use crate::constants::{CONTROL_INTERVAL_SECS, DEFAULT_HISTORY_SIZE, HISTORY_INTERVAL_SECS};
use crate::errors::ConfigError;
use crate::output::OutputSnapshot;

/// Tunables of a device context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// History capacity (entries)
    pub history_max_size: usize,
    /// Seconds between control ticks
    pub control_interval_secs: u32,
    /// Seconds between history ticks
    pub history_interval_secs: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            history_max_size: DEFAULT_HISTORY_SIZE,
            control_interval_secs: CONTROL_INTERVAL_SECS,
            history_interval_secs: HISTORY_INTERVAL_SECS,
        }
    }
}

impl DeviceConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Saved output states, indexed by channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputConfig {
    elements: Vec<Value>,
}

impl OutputConfig {
    /// Parse a saved document.
    ///
    /// Only the array shape is checked here; elements are decoded one by one
    /// with [`element`](Self::element) so a bad element affects its own
    /// channel only.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(elements) => Ok(Self { elements }),
            _ => Err(ConfigError::NotAnArray),
        }
    }

    /// Load a saved document from `path`. A missing file is `Ok(None)`.
    #[cfg(feature = "std")]
    pub fn load_file(path: impl AsRef<std::path::Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log_info!("[PWMOutputs] no configuration file at {}", path.display());
            return Ok(None);
        }
        let json = std::fs::read_to_string(path).map_err(|_err| {
            log_error!("[PWMOutputs] Error opening pwmOutputs configuration file: {}", _err);
            ConfigError::Io
        })?;
        Self::parse(&json).map(Some)
    }

    /// Build from a registry snapshot
    pub fn from_snapshot(snapshot: &[OutputSnapshot]) -> Result<Self, ConfigError> {
        let elements = snapshot
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { elements })
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Decode the element for channel `index`
    pub fn element(&self, index: usize) -> Result<OutputCommandPayload, ConfigError> {
        let element = self.elements.get(index).ok_or(ConfigError::MissingOutput { index })?;
        Ok(OutputCommandPayload::deserialize(element)?)
    }

    /// Render as the JSON array to store
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(&self.elements)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_defaults_fill_missing_fields() {
        let config = DeviceConfig::from_json(r#"{"history_max_size":50}"#).unwrap();
        assert_eq!(config.history_max_size, 50);
        assert_eq!(config.control_interval_secs, CONTROL_INTERVAL_SECS);
        assert_eq!(DeviceConfig::from_json("{}").unwrap(), DeviceConfig::default());
    }

    #[test]
    fn rejects_non_arrays() {
        assert_eq!(OutputConfig::parse(r#"{"index":0}"#), Err(ConfigError::NotAnArray));
        assert!(matches!(OutputConfig::parse("[{"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn elements_decode_independently() {
        let config = OutputConfig::parse(r#"[{"index":0,"mode":"fixed","max_duty":0.5},{"index":"one"}]"#).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.element(0).unwrap().max_duty, Some(0.5));
        assert!(matches!(config.element(1), Err(ConfigError::Parse { .. })));
        assert_eq!(config.element(2), Err(ConfigError::MissingOutput { index: 2 }));
    }

    #[cfg(feature = "std")]
    #[test]
    fn loads_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"index":0,"mode":"off","apply_at_startup":true}}]"#).unwrap();

        let config = OutputConfig::load_file(file.path()).unwrap().unwrap();
        assert_eq!(config.element(0).unwrap().apply_at_startup, Some(true));

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(OutputConfig::load_file(dir.path().join("missing.json")), Ok(None));
    }
}
