//! Data models for remote telemetry
//!
//! Counter types carry raw monotonic values for delta computation; rate types
//! carry derived per-second figures. All types are transport-free and
//! serializable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of tick categories the kernel reports per core
pub const CPU_STATES: usize = 5;

/// CPU tick counters for one core, in kernel report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoreTicks {
    /// Time in user mode
    pub user: u64,
    /// Time in user mode at reduced priority
    pub nice: u64,
    /// Time in kernel mode
    pub system: u64,
    /// Time servicing interrupts
    pub interrupt: u64,
    /// Idle time
    pub idle: u64,
}

impl CoreTicks {
    /// Total ticks across all five categories
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.interrupt + self.idle
    }

    /// Busy percentage since a previous snapshot.
    ///
    /// Each category delta is clamped to zero when the counter did not grow
    /// (reset, reboot, or overflow), so the result is never negative. A zero
    /// total delta reports 0% rather than dividing by zero.
    #[must_use]
    pub fn busy_percent_since(&self, prev: &Self) -> f32 {
        let d_user = self.user.saturating_sub(prev.user);
        let d_nice = self.nice.saturating_sub(prev.nice);
        let d_system = self.system.saturating_sub(prev.system);
        let d_interrupt = self.interrupt.saturating_sub(prev.interrupt);
        let d_idle = self.idle.saturating_sub(prev.idle);

        let busy = d_user + d_nice + d_system + d_interrupt;
        let total = busy + d_idle;
        if total == 0 {
            return 0.0;
        }
        (busy as f32 / total as f32) * 100.0
    }
}

/// Cumulative byte counters for one network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    /// Interface name (e.g. "em0")
    pub name: String,
    /// Total bytes received
    pub bytes_in: u64,
    /// Total bytes sent
    pub bytes_out: u64,
}

/// Instantaneous throughput for one network interface, in bytes per second
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRate {
    /// Interface name
    pub name: String,
    /// Receive rate (bytes/sec)
    pub in_rate: f64,
    /// Transmit rate (bytes/sec)
    pub out_rate: f64,
}

/// Instantaneous I/O rates for one disk device, in bytes per second
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskIo {
    /// Device name (e.g. "ada0")
    pub name: String,
    /// Read rate (bytes/sec)
    pub read_rate: f64,
    /// Write rate (bytes/sec)
    pub write_rate: f64,
}

impl DiskIo {
    /// Combined read + write rate
    #[must_use]
    pub fn combined_rate(&self) -> f64 {
        self.read_rate + self.write_rate
    }
}

/// Static facts about the connected host, fetched once per connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Remote hostname
    pub hostname: String,
    /// OS name and release (e.g. "FreeBSD 14.2-RELEASE")
    pub os_release: String,
    /// Seconds since boot
    pub uptime_secs: u64,
    /// Number of CPU cores
    pub cpu_cores: usize,
}

/// One dashboard refresh worth of telemetry.
///
/// The three families are polled independently; a failed poll leaves its slot
/// `None` without discarding the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Per-core CPU usage percentages
    pub cpu_core_usage: Option<Vec<f32>>,
    /// Per-interface throughput
    pub interfaces: Option<Vec<InterfaceRate>>,
    /// Per-device disk I/O
    pub disks: Option<Vec<DiskIo>>,
    /// When this snapshot was assembled
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Whether every family failed this cycle
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cpu_core_usage.is_none() && self.interfaces.is_none() && self.disks.is_none()
    }
}

/// Formats a byte rate into a human-scaled unit, dividing by 1024 up through
/// GB/s.
#[must_use]
pub fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];
    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
