//! Telemetry collection settings

use serde::{Deserialize, Serialize};

/// Settings for the periodic telemetry collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Whether periodic collection is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Polling interval in seconds (1–60)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u8,
    /// Poll per-core CPU usage
    #[serde(default = "default_true")]
    pub include_cpu: bool,
    /// Poll per-interface network throughput
    #[serde(default = "default_true")]
    pub include_network: bool,
    /// Poll per-device disk I/O
    #[serde(default = "default_true")]
    pub include_disk: bool,
}

const fn default_interval_secs() -> u8 {
    3
}

const fn default_true() -> bool {
    true
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            include_cpu: true,
            include_network: true,
            include_disk: true,
        }
    }
}

impl MonitoringSettings {
    /// Returns the interval clamped to the valid range (1–60 seconds)
    #[must_use]
    pub const fn effective_interval_secs(&self) -> u8 {
        if self.interval_secs == 0 {
            1
        } else if self.interval_secs > 60 {
            60
        } else {
            self.interval_secs
        }
    }
}
