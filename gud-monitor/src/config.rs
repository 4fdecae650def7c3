//! Monitor configuration
//!
//! Loaded from an optional TOML file; command line flags override it.
//!
//! ```toml
//! busnum = 3
//! wait_threshold_us = 1500
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ring buffer size requested from usbmon
pub const DEFAULT_RING_SIZE: usize = 20 * 1024;

/// Control transfers taking longer than this waited on the previous update
pub const DEFAULT_WAIT_THRESHOLD_US: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// USB bus to capture, 0 captures all buses
    pub busnum: u16,
    /// Device to follow; discovered from GET_DESCRIPTOR when unset
    pub devnum: Option<u8>,
    pub ring_size: usize,
    pub wait_threshold_us: u64,
    /// Verbosity, same as repeating `-d`
    pub debug: u8,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            busnum: 0,
            devnum: None,
            ring_size: DEFAULT_RING_SIZE,
            wait_threshold_us: DEFAULT_WAIT_THRESHOLD_US,
            debug: 0,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn wait_threshold(&self) -> Duration {
        Duration::from_micros(self.wait_threshold_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.busnum, 0);
        assert_eq!(config.devnum, None);
        assert_eq!(config.ring_size, 20 * 1024);
        assert_eq!(config.wait_threshold(), Duration::from_millis(1));
    }

    #[test]
    fn test_parse_partial() {
        let config = MonitorConfig::parse(
            r#"
            busnum = 3
            devnum = 7
            wait_threshold_us = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.busnum, 3);
        assert_eq!(config.devnum, Some(7));
        assert_eq!(config.wait_threshold_us, 2500);
        assert_eq!(config.ring_size, DEFAULT_RING_SIZE);
    }

    #[test]
    fn test_parse_rejects_unknown_types() {
        assert!(matches!(
            MonitorConfig::parse("busnum = \"three\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MonitorConfig::load(Path::new("/nonexistent/gud-monitor.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
