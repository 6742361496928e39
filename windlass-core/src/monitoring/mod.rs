//! Remote host telemetry
//!
//! Agentless metrics collection over the command executor: per-core CPU usage
//! and per-interface network throughput derived by differencing monotonic
//! kernel counters, and per-device disk I/O taken from the remote's own
//! instantaneous figures. This module owns no transport state — it reaches
//! the remote only through the [`crate::exec::CommandRunner`] seam.

pub mod collector;
mod engine;
mod metrics;
mod parser;
mod settings;

pub use collector::{
    CollectorHandle, MAX_CONSECUTIVE_ERRORS, TelemetryEvent, start_collector,
};
pub use engine::{CpuSampler, DiskSampler, NetSampler, TelemetryEngine};
pub use metrics::{
    CPU_STATES, CoreTicks, DiskIo, HostInfo, InterfaceCounters, InterfaceRate, StatusSnapshot,
    format_rate,
};
pub use parser::{
    CORE_COUNT_COMMAND, CP_TIMES_COMMAND, DISK_IO_COMMAND, HOST_INFO_COMMAND, MonitoringError,
    MonitoringResult, NET_COUNTERS_COMMAND, TelemetryParser,
};
pub use settings::MonitoringSettings;
