//! Delta telemetry engine scenarios driven through the public API

use std::sync::Mutex;

use async_trait::async_trait;
use proptest::prelude::*;

use windlass_core::exec::{CommandRunner, ExecError, ExecResult};
use windlass_core::monitoring::{
    CORE_COUNT_COMMAND, CP_TIMES_COMMAND, CoreTicks, NET_COUNTERS_COMMAND, TelemetryEngine,
};
use windlass_core::transport::TransportError;

/// Runner that replays queued responses per command
#[derive(Default)]
struct ReplayRunner {
    responses: Mutex<Vec<(&'static str, Result<String, String>)>>,
}

impl ReplayRunner {
    fn push(&self, command: &'static str, output: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((command, Ok(output.into())));
    }
}

#[async_trait]
impl CommandRunner for ReplayRunner {
    async fn run(&self, command: &str) -> ExecResult<String> {
        let mut responses = self.responses.lock().unwrap();
        let idx = responses
            .iter()
            .position(|(c, _)| *c == command)
            .unwrap_or_else(|| panic!("no queued response for {command}"));
        match responses.remove(idx).1 {
            Ok(output) => Ok(output),
            Err(text) => Err(ExecError::Transport(TransportError::ChannelFailed(text))),
        }
    }
}

fn netstat_output(bytes_in: u64, bytes_out: u64) -> String {
    format!(
        "Name Mtu Network Address Ipkts Ierrs Idrop Ibytes Opkts Oerrs Obytes Coll\n\
         em0 1500 <Link#1> aa:bb:cc:dd:ee:ff 10 0 0 {bytes_in} 20 0 {bytes_out} 0\n"
    )
}

/// First CPU poll after connecting reports a zero for every reported core
#[tokio::test]
async fn first_cpu_poll_is_all_zeros_with_core_count_length() {
    let runner = ReplayRunner::default();
    runner.push(CORE_COUNT_COMMAND, "4\n");
    runner.push(
        CP_TIMES_COMMAND,
        "10 1 2 0 987 20 2 4 0 974 30 3 6 0 961 40 4 8 0 948\n",
    );

    let mut engine = TelemetryEngine::new();
    let usage = engine.poll_cpu_cores(&runner).await.unwrap();
    assert_eq!(usage, vec![0.0, 0.0, 0.0, 0.0]);
}

/// Busy delta 20 over total delta 50 comes out at exactly 40%
#[tokio::test]
async fn cpu_rate_matches_worked_example() {
    let runner = ReplayRunner::default();
    runner.push(CORE_COUNT_COMMAND, "1\n");
    runner.push(CP_TIMES_COMMAND, "100 0 50 0 850\n");
    runner.push(CP_TIMES_COMMAND, "110 0 60 0 880\n");

    let mut engine = TelemetryEngine::new();
    engine.poll_cpu_cores(&runner).await.unwrap();
    let usage = engine.poll_cpu_cores(&runner).await.unwrap();
    assert!((usage[0] - 40.0).abs() < 0.01);
}

/// An interface whose counters went backwards reports zero, never negative
#[tokio::test]
async fn network_counter_regression_clamps_to_zero() {
    let runner = ReplayRunner::default();
    runner.push(NET_COUNTERS_COMMAND, netstat_output(5_000_000, 3_000_000));
    runner.push(NET_COUNTERS_COMMAND, netstat_output(1_000, 500));

    let mut engine = TelemetryEngine::new();
    engine.poll_network_interfaces(&runner).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let rates = engine.poll_network_interfaces(&runner).await.unwrap();
    assert_eq!(rates.len(), 1);
    assert!(rates[0].in_rate >= 0.0);
    assert!(rates[0].out_rate >= 0.0);
    assert!((rates[0].in_rate - 0.0).abs() < f64::EPSILON);
}

proptest! {
    /// Usage is always within 0–100 regardless of counter movement,
    /// including regressions
    #[test]
    fn usage_is_always_a_percentage(
        prev in any::<[u32; 5]>(),
        curr in any::<[u32; 5]>(),
    ) {
        let prev = CoreTicks {
            user: u64::from(prev[0]),
            nice: u64::from(prev[1]),
            system: u64::from(prev[2]),
            interrupt: u64::from(prev[3]),
            idle: u64::from(prev[4]),
        };
        let curr = CoreTicks {
            user: u64::from(curr[0]),
            nice: u64::from(curr[1]),
            system: u64::from(curr[2]),
            interrupt: u64::from(curr[3]),
            idle: u64::from(curr[4]),
        };
        let pct = curr.busy_percent_since(&prev);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    /// With idle frozen and busy counters advancing, usage is 100%
    #[test]
    fn all_busy_delta_is_full_usage(advance in 1u64..10_000) {
        let prev = CoreTicks { user: 100, nice: 0, system: 100, interrupt: 0, idle: 500 };
        let curr = CoreTicks { user: 100 + advance, ..prev };
        prop_assert!((curr.busy_percent_since(&prev) - 100.0).abs() < 0.01);
    }
}
