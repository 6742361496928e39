//! Delta telemetry engine
//!
//! Turns monotonic counters into instantaneous rates with one uniform
//! sample–delta–time algorithm. Each metric family owns exactly one
//! "previous sample + timestamp" slot, overwritten on every poll whether or
//! not the rate computation succeeds, so a failed poll cannot corrupt the
//! next delta's baseline. The engine owns no transport state; it speaks to
//! the remote only through [`CommandRunner`].

use std::time::Instant;

use chrono::Utc;

use crate::exec::CommandRunner;

use super::metrics::{CoreTicks, DiskIo, InterfaceCounters, InterfaceRate, StatusSnapshot};
use super::parser::{
    CORE_COUNT_COMMAND, CP_TIMES_COMMAND, DISK_IO_COMMAND, MonitoringError, MonitoringResult,
    NET_COUNTERS_COMMAND, TelemetryParser,
};

fn command_failed(err: impl std::fmt::Display) -> MonitoringError {
    MonitoringError::CommandFailed(err.to_string())
}

/// Per-core CPU usage sampler
#[derive(Debug, Default)]
pub struct CpuSampler {
    prev: Option<Vec<CoreTicks>>,
    cores: Option<usize>,
}

impl CpuSampler {
    /// Creates a sampler with no stored baseline
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prev: None,
            cores: None,
        }
    }

    /// Polls tick counters and returns per-core usage percentages.
    ///
    /// The first poll after (re)connection stores the baseline and reports 0%
    /// for every core. A core-count change against the stored sample (e.g.
    /// reconnected to a different host without a reset) also re-baselines
    /// instead of computing nonsense deltas.
    ///
    /// # Errors
    ///
    /// Fails when the command fails, the counter vector is shorter than the
    /// authoritative core count requires, or the output is non-numeric. On
    /// failure the stored baseline is cleared.
    pub async fn poll(&mut self, runner: &dyn CommandRunner) -> MonitoringResult<Vec<f32>> {
        let cores = match self.cores {
            Some(n) => n,
            None => match self.query_core_count(runner).await {
                Ok(n) => {
                    self.cores = Some(n);
                    n
                }
                Err(err) => {
                    self.prev = None;
                    return Err(err);
                }
            },
        };

        let output = match runner.run(CP_TIMES_COMMAND).await {
            Ok(output) => output,
            Err(err) => {
                self.prev = None;
                return Err(command_failed(err));
            }
        };
        match TelemetryParser::parse_cp_times(&output, cores) {
            Ok(current) => {
                let usage = match self.prev.take() {
                    Some(prev) if prev.len() == current.len() => current
                        .iter()
                        .zip(&prev)
                        .map(|(cur, old)| cur.busy_percent_since(old))
                        .collect(),
                    _ => vec![0.0; current.len()],
                };
                self.prev = Some(current);
                Ok(usage)
            }
            Err(err) => {
                self.prev = None;
                Err(err)
            }
        }
    }

    async fn query_core_count(&self, runner: &dyn CommandRunner) -> MonitoringResult<usize> {
        let output = runner
            .run(CORE_COUNT_COMMAND)
            .await
            .map_err(command_failed)?;
        TelemetryParser::parse_core_count(&output)
    }

    /// Clears the stored baseline and cached core count (e.g. on reconnect)
    pub fn reset(&mut self) {
        self.prev = None;
        self.cores = None;
    }
}

/// Per-interface network throughput sampler
#[derive(Debug, Default)]
pub struct NetSampler {
    prev: Option<(Vec<InterfaceCounters>, Instant)>,
}

impl NetSampler {
    /// Creates a sampler with no stored baseline
    #[must_use]
    pub const fn new() -> Self {
        Self { prev: None }
    }

    /// Polls byte counters and returns per-interface rates.
    ///
    /// The first poll reports every discovered interface at a zero rate so
    /// the UI can show them immediately instead of after a warm-up tick.
    /// Counter regressions clamp to zero rather than going negative.
    ///
    /// # Errors
    ///
    /// Fails when the counter command fails; the stored baseline is cleared.
    pub async fn poll(&mut self, runner: &dyn CommandRunner) -> MonitoringResult<Vec<InterfaceRate>> {
        let output = match runner.run(NET_COUNTERS_COMMAND).await {
            Ok(output) => output,
            Err(err) => {
                self.prev = None;
                return Err(command_failed(err));
            }
        };
        let current = TelemetryParser::parse_interface_counters(&output);
        let now = Instant::now();

        let rates = match self.prev.take() {
            Some((prev, sampled_at)) => {
                let elapsed = now.duration_since(sampled_at).as_secs_f64();
                current
                    .iter()
                    .map(|cur| {
                        let (in_rate, out_rate) = prev
                            .iter()
                            .find(|old| old.name == cur.name)
                            .filter(|_| elapsed > 0.0)
                            .map_or((0.0, 0.0), |old| {
                                (
                                    cur.bytes_in.saturating_sub(old.bytes_in) as f64 / elapsed,
                                    cur.bytes_out.saturating_sub(old.bytes_out) as f64 / elapsed,
                                )
                            });
                        InterfaceRate {
                            name: cur.name.clone(),
                            in_rate,
                            out_rate,
                        }
                    })
                    .collect()
            }
            None => current
                .iter()
                .map(|cur| InterfaceRate {
                    name: cur.name.clone(),
                    in_rate: 0.0,
                    out_rate: 0.0,
                })
                .collect(),
        };

        self.prev = Some((current, now));
        Ok(rates)
    }

    /// Clears the stored baseline (e.g. on reconnect)
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Disk I/O sampler.
///
/// Stateless: the underlying source already reports instantaneous rates, so
/// this path only parses and filters.
pub struct DiskSampler;

impl DiskSampler {
    /// Polls per-device I/O rates.
    ///
    /// # Errors
    ///
    /// Fails when the command fails.
    pub async fn poll(runner: &dyn CommandRunner) -> MonitoringResult<Vec<DiskIo>> {
        let output = runner.run(DISK_IO_COMMAND).await.map_err(command_failed)?;
        Ok(TelemetryParser::parse_disk_io(&output))
    }
}

/// The three samplers behind one facade, matching the dashboard's refresh
/// cycle
#[derive(Debug, Default)]
pub struct TelemetryEngine {
    cpu: CpuSampler,
    net: NetSampler,
}

impl TelemetryEngine {
    /// Creates an engine with empty sample slots
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cpu: CpuSampler::new(),
            net: NetSampler::new(),
        }
    }

    /// Polls per-core CPU usage. See [`CpuSampler::poll`].
    ///
    /// # Errors
    ///
    /// Propagates the sampler's failure modes.
    pub async fn poll_cpu_cores(&mut self, runner: &dyn CommandRunner) -> MonitoringResult<Vec<f32>> {
        self.cpu.poll(runner).await
    }

    /// Polls per-interface throughput. See [`NetSampler::poll`].
    ///
    /// # Errors
    ///
    /// Propagates the sampler's failure modes.
    pub async fn poll_network_interfaces(
        &mut self,
        runner: &dyn CommandRunner,
    ) -> MonitoringResult<Vec<InterfaceRate>> {
        self.net.poll(runner).await
    }

    /// Polls per-device disk I/O. See [`DiskSampler::poll`].
    ///
    /// # Errors
    ///
    /// Propagates the sampler's failure modes.
    pub async fn poll_disk_io(&self, runner: &dyn CommandRunner) -> MonitoringResult<Vec<DiskIo>> {
        DiskSampler::poll(runner).await
    }

    /// Polls all three families concurrently and assembles a snapshot.
    ///
    /// The polls are independent — each acquires its own gate ticket through
    /// the runner and their completion order is unspecified. A family that
    /// fails leaves its slot `None`; the others are kept.
    pub async fn poll_snapshot(&mut self, runner: &dyn CommandRunner) -> StatusSnapshot {
        let Self { cpu, net } = self;
        let (cpu_result, net_result, disk_result) =
            tokio::join!(cpu.poll(runner), net.poll(runner), DiskSampler::poll(runner));

        for err in [
            cpu_result.as_ref().err(),
            net_result.as_ref().err(),
            disk_result.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        {
            tracing::debug!(error = %err, "Telemetry family poll failed");
        }

        StatusSnapshot {
            cpu_core_usage: cpu_result.ok(),
            interfaces: net_result.ok(),
            disks: disk_result.ok(),
            timestamp: Utc::now(),
        }
    }

    /// Clears every stored baseline (e.g. on reconnect)
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.net.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecError, ExecResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Runner returning canned output per command, with per-command queues so
    /// consecutive polls can see different counter values
    #[derive(Default)]
    struct ScriptedRunner {
        responses: Mutex<HashMap<&'static str, Vec<Result<String, String>>>>,
    }

    impl ScriptedRunner {
        fn respond(self, command: &'static str, output: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(command)
                .or_default()
                .push(Ok(output.to_string()));
            self
        }

        fn fail(self, command: &'static str, error: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(command)
                .or_default()
                .push(Err(error.to_string()));
            self
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &str) -> ExecResult<String> {
            let mut responses = self.responses.lock().unwrap();
            let queue = responses
                .get_mut(command)
                .unwrap_or_else(|| panic!("unexpected command: {command}"));
            assert!(!queue.is_empty(), "ran out of responses for {command}");
            match queue.remove(0) {
                Ok(output) => Ok(output),
                Err(text) => Err(ExecError::Transport(
                    crate::transport::TransportError::ChannelFailed(text),
                )),
            }
        }
    }

    #[tokio::test]
    async fn test_first_cpu_poll_reports_zeros_per_core() {
        let runner = ScriptedRunner::default()
            .respond(CORE_COUNT_COMMAND, "2\n")
            .respond(CP_TIMES_COMMAND, "100 0 50 0 850 300 0 40 0 660\n");
        let mut sampler = CpuSampler::new();
        let usage = sampler.poll(&runner).await.unwrap();
        assert_eq!(usage, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_second_cpu_poll_computes_rates() {
        let runner = ScriptedRunner::default()
            .respond(CORE_COUNT_COMMAND, "1\n")
            .respond(CP_TIMES_COMMAND, "100 0 50 0 850\n")
            .respond(CP_TIMES_COMMAND, "110 0 60 0 880\n");
        let mut sampler = CpuSampler::new();
        assert_eq!(sampler.poll(&runner).await.unwrap(), vec![0.0]);
        let usage = sampler.poll(&runner).await.unwrap();
        // busy delta 20 over total delta 50
        assert!((usage[0] - 40.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_cpu_short_vector_reports_no_data() {
        let runner = ScriptedRunner::default()
            .respond(CORE_COUNT_COMMAND, "4\n")
            .respond(CP_TIMES_COMMAND, "100 0 50 0 850\n");
        let mut sampler = CpuSampler::new();
        assert!(matches!(
            sampler.poll(&runner).await,
            Err(MonitoringError::CounterVectorMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_cpu_failed_poll_rebaselines() {
        let runner = ScriptedRunner::default()
            .respond(CORE_COUNT_COMMAND, "1\n")
            .respond(CP_TIMES_COMMAND, "100 0 50 0 850\n")
            .fail(CP_TIMES_COMMAND, "connection dropped")
            .respond(CP_TIMES_COMMAND, "500 0 90 0 910\n");
        let mut sampler = CpuSampler::new();
        assert_eq!(sampler.poll(&runner).await.unwrap(), vec![0.0]);
        assert!(sampler.poll(&runner).await.is_err());
        // The poll after a failure is a fresh baseline, not a delta against
        // the pre-failure sample
        assert_eq!(sampler.poll(&runner).await.unwrap(), vec![0.0]);
    }

    const NETSTAT_T0: &str = "\
Name    Mtu Network       Address              Ipkts Ierrs Idrop     Ibytes    Opkts Oerrs     Obytes  Coll
em0    1500 <Link#1>      58:9c:fc:10:ff:a1     1000     0     0    1000000     2000     0    2000000     0
";
    const NETSTAT_T1: &str = "\
Name    Mtu Network       Address              Ipkts Ierrs Idrop     Ibytes    Opkts Oerrs     Obytes  Coll
em0    1500 <Link#1>      58:9c:fc:10:ff:a1     1500     0     0    2024000     2500     0    2512000     0
";
    const NETSTAT_REGRESSED: &str = "\
Name    Mtu Network       Address              Ipkts Ierrs Idrop     Ibytes    Opkts Oerrs     Obytes  Coll
em0    1500 <Link#1>      58:9c:fc:10:ff:a1       10     0     0        500        5     0        200     0
";

    #[tokio::test]
    async fn test_first_net_poll_lists_interfaces_at_zero() {
        let runner = ScriptedRunner::default().respond(NET_COUNTERS_COMMAND, NETSTAT_T0);
        let mut sampler = NetSampler::new();
        let rates = sampler.poll(&runner).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].name, "em0");
        assert!((rates[0].in_rate - 0.0).abs() < f64::EPSILON);
        assert!((rates[0].out_rate - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_second_net_poll_reports_positive_rates() {
        let runner = ScriptedRunner::default()
            .respond(NET_COUNTERS_COMMAND, NETSTAT_T0)
            .respond(NET_COUNTERS_COMMAND, NETSTAT_T1);
        let mut sampler = NetSampler::new();
        sampler.poll(&runner).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let rates = sampler.poll(&runner).await.unwrap();
        assert!(rates[0].in_rate > 0.0);
        assert!(rates[0].out_rate > 0.0);
    }

    #[tokio::test]
    async fn test_net_counter_regression_clamps_to_zero() {
        let runner = ScriptedRunner::default()
            .respond(NET_COUNTERS_COMMAND, NETSTAT_T1)
            .respond(NET_COUNTERS_COMMAND, NETSTAT_REGRESSED);
        let mut sampler = NetSampler::new();
        sampler.poll(&runner).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let rates = sampler.poll(&runner).await.unwrap();
        assert!((rates[0].in_rate - 0.0).abs() < f64::EPSILON);
        assert!((rates[0].out_rate - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_snapshot_tolerates_partial_failure() {
        let runner = ScriptedRunner::default()
            .fail(CORE_COUNT_COMMAND, "boom")
            .respond(NET_COUNTERS_COMMAND, NETSTAT_T0)
            .respond(
                DISK_IO_COMMAND,
                "device       r/s     w/s     kr/s     kw/s  ms/r  ms/w  ms/o  ms/t qlen  %b\n\
                 ada0           1       2     10.0     20.0     1     1     0     1    0   1\n",
            );
        let mut engine = TelemetryEngine::new();
        let snapshot = engine.poll_snapshot(&runner).await;
        assert!(snapshot.cpu_core_usage.is_none());
        assert_eq!(snapshot.interfaces.as_ref().unwrap().len(), 1);
        assert_eq!(snapshot.disks.as_ref().unwrap().len(), 1);
        assert!(!snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_baselines() {
        let runner = ScriptedRunner::default()
            .respond(CORE_COUNT_COMMAND, "1\n")
            .respond(CP_TIMES_COMMAND, "100 0 50 0 850\n")
            .respond(CORE_COUNT_COMMAND, "1\n")
            .respond(CP_TIMES_COMMAND, "110 0 60 0 880\n");
        let mut engine = TelemetryEngine::new();
        engine.poll_cpu_cores(&runner).await.unwrap();
        engine.reset();
        // After reset the next poll is a baseline poll again
        assert_eq!(engine.poll_cpu_cores(&runner).await.unwrap(), vec![0.0]);
    }
}
