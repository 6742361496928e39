//! Parsers for remote counter command output
//!
//! The remote side is a non-cooperating process emitting plain text; every
//! parser here validates column counts before indexing and drops lines that
//! do not match the expected shape instead of failing the whole poll.

use thiserror::Error;

use super::metrics::{CPU_STATES, CoreTicks, DiskIo, HostInfo, InterfaceCounters};

/// Reads the flat per-core CPU tick vector (five categories per core)
pub const CP_TIMES_COMMAND: &str = "sysctl -n kern.cp_times";
/// Reads the authoritative core count
pub const CORE_COUNT_COMMAND: &str = "sysctl -n hw.ncpu";
/// Reads cumulative per-interface byte counters
pub const NET_COUNTERS_COMMAND: &str = "netstat -ibn";
/// Reads instantaneous per-device I/O rates
pub const DISK_IO_COMMAND: &str = "iostat -dx";

/// Collects static host facts in one marker-delimited invocation
pub const HOST_INFO_COMMAND: &str = concat!(
    "echo '---WINDLASS_HOSTNAME---';",
    "hostname;",
    "echo '---WINDLASS_RELEASE---';",
    "uname -sr;",
    "echo '---WINDLASS_BOOTTIME---';",
    "sysctl -n kern.boottime;",
    "echo '---WINDLASS_NCPU---';",
    "sysctl -n hw.ncpu;",
    "echo '---WINDLASS_END---'",
);

/// Errors that can occur while collecting telemetry
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// The remote output could not be parsed at all
    #[error("Failed to parse telemetry output: {0}")]
    ParseFailed(String),

    /// The counter vector does not cover the reported core count
    #[error("CPU counter vector has {actual} entries, expected {expected}")]
    CounterVectorMismatch {
        /// Entries required for the reported core count
        expected: usize,
        /// Entries actually received
        actual: usize,
    },

    /// The telemetry command itself failed to execute
    #[error("Telemetry command failed: {0}")]
    CommandFailed(String),
}

/// Result type for telemetry operations
pub type MonitoringResult<T> = Result<T, MonitoringError>;

/// Stateless parser for remote counter output
pub struct TelemetryParser;

impl TelemetryParser {
    /// Parses the output of [`CORE_COUNT_COMMAND`].
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::ParseFailed`] when the output is not a
    /// positive integer.
    pub fn parse_core_count(output: &str) -> MonitoringResult<usize> {
        let cores: usize = output
            .trim()
            .parse()
            .map_err(|_| MonitoringError::ParseFailed(format!("Bad core count: {output:?}")))?;
        if cores == 0 {
            return Err(MonitoringError::ParseFailed(
                "Remote reported zero CPU cores".into(),
            ));
        }
        Ok(cores)
    }

    /// Parses the flat tick vector of [`CP_TIMES_COMMAND`] into per-core
    /// counters, reconciled against the authoritative core count.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::CounterVectorMismatch`] when the vector is
    /// shorter than `cores × 5` — truncating cores silently would misreport
    /// the host — and [`MonitoringError::ParseFailed`] on non-numeric ticks.
    pub fn parse_cp_times(output: &str, cores: usize) -> MonitoringResult<Vec<CoreTicks>> {
        let mut ticks = Vec::with_capacity(cores * CPU_STATES);
        for token in output.split_whitespace() {
            let value: u64 = token.parse().map_err(|_| {
                MonitoringError::ParseFailed(format!("Bad tick counter: {token:?}"))
            })?;
            ticks.push(value);
        }

        let expected = cores * CPU_STATES;
        if ticks.len() < expected {
            return Err(MonitoringError::CounterVectorMismatch {
                expected,
                actual: ticks.len(),
            });
        }

        Ok(ticks[..expected]
            .chunks_exact(CPU_STATES)
            .map(|c| CoreTicks {
                user: c[0],
                nice: c[1],
                system: c[2],
                interrupt: c[3],
                idle: c[4],
            })
            .collect())
    }

    /// Parses [`NET_COUNTERS_COMMAND`] output into cumulative per-interface
    /// counters.
    ///
    /// Only the `<Link#…>` rows carry interface-level byte counters; per-address
    /// rows, the loopback interface, short lines, and non-numeric counters are
    /// all dropped silently.
    #[must_use]
    pub fn parse_interface_counters(output: &str) -> Vec<InterfaceCounters> {
        let mut counters: Vec<InterfaceCounters> = Vec::new();
        for line in output.lines() {
            let cols: Vec<&str> = line.split_whitespace().collect();
            // Name Mtu Network Address Ipkts Ierrs Idrop Ibytes Opkts Oerrs Obytes Coll
            // The Address column is absent on interfaces without a link-level
            // address (loopback), shifting everything left by one.
            if cols.len() < 11 || !cols[2].starts_with("<Link") {
                continue;
            }
            let name = cols[0].trim_end_matches('*');
            if name.starts_with("lo") {
                continue;
            }
            if counters.iter().any(|c| c.name == name) {
                continue;
            }
            let (in_idx, out_idx) = if cols.len() >= 12 { (7, 10) } else { (6, 9) };
            let (Ok(bytes_in), Ok(bytes_out)) =
                (cols[in_idx].parse::<u64>(), cols[out_idx].parse::<u64>())
            else {
                continue;
            };
            counters.push(InterfaceCounters {
                name: name.to_string(),
                bytes_in,
                bytes_out,
            });
        }
        counters
    }

    /// Parses [`DISK_IO_COMMAND`] extended statistics into per-device rates.
    ///
    /// The source already reports instantaneous KB/s figures, so no delta
    /// state is involved. CAM pass-through devices (`pass0`, `pass1`, …) are
    /// not physical disks and are excluded.
    #[must_use]
    pub fn parse_disk_io(output: &str) -> Vec<DiskIo> {
        let mut devices = Vec::new();
        let mut in_table = false;
        for line in output.lines() {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.first().is_some_and(|c| *c == "device") {
                in_table = true;
                continue;
            }
            if !in_table || cols.len() < 5 {
                continue;
            }
            let name = cols[0];
            if name.starts_with("pass") {
                continue;
            }
            // device r/s w/s kr/s kw/s ...
            let (Ok(read_kbps), Ok(write_kbps)) = (cols[3].parse::<f64>(), cols[4].parse::<f64>())
            else {
                continue;
            };
            devices.push(DiskIo {
                name: name.to_string(),
                read_rate: read_kbps * 1024.0,
                write_rate: write_kbps * 1024.0,
            });
        }
        devices
    }

    /// Parses [`HOST_INFO_COMMAND`] output.
    ///
    /// `now_unix` is supplied by the caller so uptime reconstruction stays a
    /// pure function of its inputs.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::ParseFailed`] when a required section is
    /// missing.
    pub fn parse_host_info(output: &str, now_unix: u64) -> MonitoringResult<HostInfo> {
        let hostname = Self::section(output, "---WINDLASS_HOSTNAME---", "---WINDLASS_RELEASE---")
            .ok_or_else(|| MonitoringError::ParseFailed("Missing hostname section".into()))?
            .to_string();
        let os_release = Self::section(output, "---WINDLASS_RELEASE---", "---WINDLASS_BOOTTIME---")
            .ok_or_else(|| MonitoringError::ParseFailed("Missing release section".into()))?
            .to_string();

        let boot_sec = Self::section(output, "---WINDLASS_BOOTTIME---", "---WINDLASS_NCPU---")
            .and_then(Self::extract_boottime_secs)
            .unwrap_or(now_unix);
        let uptime_secs = now_unix.saturating_sub(boot_sec);

        let cpu_cores = Self::section(output, "---WINDLASS_NCPU---", "---WINDLASS_END---")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);

        Ok(HostInfo {
            hostname,
            os_release,
            uptime_secs,
            cpu_cores,
        })
    }

    /// Extracts text between two marker lines
    fn section<'a>(output: &'a str, start: &str, end: &str) -> Option<&'a str> {
        let start_idx = output.find(start).map(|i| i + start.len())?;
        let end_idx = output[start_idx..].find(end).map(|i| start_idx + i)?;
        Some(output[start_idx..end_idx].trim())
    }

    /// Pulls the `sec = N` value out of `kern.boottime` output
    /// (`{ sec = 1712345678, usec = 123456 } Sat Apr  6 ...`)
    fn extract_boottime_secs(boottime: &str) -> Option<u64> {
        let rest = boottime.split("sec =").nth(1)?;
        rest.trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok()
    }
}
