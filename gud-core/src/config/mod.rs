//! Driver configuration
//!
//! Deserializable with serde so applications can embed it in their own
//! TOML or JSON config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host-side cap on the SET_BUFFER transfer size
pub const DEFAULT_MAX_BUFFER_CAP: u32 = 4 * 1024 * 1024;

/// Default USB transfer timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Driver tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Upper bound for one flush chunk, also used when the device reports 0
    pub max_buffer_cap: u32,
    /// Use LZ4 when the device supports it
    pub compression: bool,
    /// Transfer timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_buffer_cap: DEFAULT_MAX_BUFFER_CAP,
            compression: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DriverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Effective chunk limit for a device reporting `device_max`
    pub fn max_buffer_size(&self, device_max: u32) -> usize {
        match device_max {
            0 => self.max_buffer_cap as usize,
            max => max.min(self.max_buffer_cap) as usize,
        }
    }
}
