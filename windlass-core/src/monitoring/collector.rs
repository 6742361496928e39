//! Periodic telemetry collector
//!
//! Drives the samplers on a fixed interval and emits [`TelemetryEvent`]s over
//! a channel. The three metric families are polled concurrently each tick,
//! each acquiring its own gate ticket through the runner; a cycle where every
//! enabled family fails counts toward a consecutive-error limit, after which
//! the collector gives up.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::exec::CommandRunner;

use super::engine::{CpuSampler, DiskSampler, NetSampler};
use super::metrics::{HostInfo, StatusSnapshot};
use super::parser::{HOST_INFO_COMMAND, TelemetryParser};
use super::settings::MonitoringSettings;

/// Maximum consecutive fully-failed cycles before the collector gives up
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Events emitted by the telemetry collector
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// New snapshot available
    Update(StatusSnapshot),
    /// Static host facts, collected once at start
    HostInfoReady(HostInfo),
    /// A cycle failed entirely (non-fatal until the error limit is reached)
    PollError(String),
    /// Collector stopped
    Stopped,
}

/// Handle to control a running collector
#[derive(Debug)]
pub struct CollectorHandle {
    stop_tx: mpsc::Sender<()>,
}

impl CollectorHandle {
    /// Signals the collector to stop
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }
}

/// Folds one family's poll result into the snapshot, recording the error text
fn keep<T>(
    result: Option<super::parser::MonitoringResult<T>>,
    errors: &mut Vec<String>,
) -> Option<T> {
    match result {
        Some(Ok(value)) => Some(value),
        Some(Err(err)) => {
            errors.push(err.to_string());
            None
        }
        None => None,
    }
}

/// Starts a telemetry collection loop.
///
/// Returns a handle to stop the collector and a receiver for its events. The
/// loop also ends on its own when the event receiver is dropped or after
/// [`MAX_CONSECUTIVE_ERRORS`] fully-failed cycles.
#[must_use]
pub fn start_collector(
    settings: MonitoringSettings,
    runner: Arc<dyn CommandRunner>,
) -> (CollectorHandle, mpsc::Receiver<TelemetryEvent>) {
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    let (event_tx, event_rx) = mpsc::channel::<TelemetryEvent>(8);

    let interval = Duration::from_secs(u64::from(settings.effective_interval_secs()));

    tokio::spawn(async move {
        let mut cpu = CpuSampler::new();
        let mut net = NetSampler::new();
        let mut ticker = tokio::time::interval(interval);
        let mut host_info_fetched = false;
        let mut consecutive_errors: u32 = 0;

        loop {
            tokio::select! {
                _ = stop_rx.recv() => {
                    let _ = event_tx.send(TelemetryEvent::Stopped).await;
                    break;
                }
                _ = ticker.tick() => {
                    if !host_info_fetched {
                        host_info_fetched = true;
                        let now_unix = SystemTime::now()
                            .duration_since(UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_secs();
                        if let Ok(output) = runner.run(HOST_INFO_COMMAND).await
                            && let Ok(info) = TelemetryParser::parse_host_info(&output, now_unix)
                        {
                            let _ = event_tx.send(TelemetryEvent::HostInfoReady(info)).await;
                        }
                    }

                    let mut errors: Vec<String> = Vec::new();
                    let (cpu_result, net_result, disk_result) = tokio::join!(
                        async {
                            if settings.include_cpu {
                                Some(cpu.poll(runner.as_ref()).await)
                            } else {
                                None
                            }
                        },
                        async {
                            if settings.include_network {
                                Some(net.poll(runner.as_ref()).await)
                            } else {
                                None
                            }
                        },
                        async {
                            if settings.include_disk {
                                Some(DiskSampler::poll(runner.as_ref()).await)
                            } else {
                                None
                            }
                        },
                    );

                    let snapshot = StatusSnapshot {
                        cpu_core_usage: keep(cpu_result, &mut errors),
                        interfaces: keep(net_result, &mut errors),
                        disks: keep(disk_result, &mut errors),
                        timestamp: Utc::now(),
                    };

                    let any_enabled = settings.include_cpu
                        || settings.include_network
                        || settings.include_disk;
                    if any_enabled && snapshot.is_empty() {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            tracing::warn!(
                                errors = consecutive_errors,
                                "Telemetry stopped after repeated failed cycles"
                            );
                            let _ = event_tx.send(TelemetryEvent::Stopped).await;
                            break;
                        }
                        let _ = event_tx
                            .send(TelemetryEvent::PollError(errors.join("; ")))
                            .await;
                    } else {
                        consecutive_errors = 0;
                        if event_tx.send(TelemetryEvent::Update(snapshot)).await.is_err() {
                            break; // receiver dropped
                        }
                    }
                }
            }
        }
    });

    (CollectorHandle { stop_tx }, event_rx)
}
