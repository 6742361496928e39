//! Windlass Core Library
//!
//! Remote-execution and telemetry core of the Windlass server dashboard. One
//! [`transport::Session`] owns the authenticated SSH connection to a FreeBSD
//! host; commands multiplex over it through a FIFO admission gate, an
//! interactive PTY bridge shares the connection outside the gate, and a
//! delta-sampling engine turns kernel counters into live rates.
//!
//! # Crate Structure
//!
//! - [`auth`] - Key credentials and preamble-based family classification
//! - [`transport`] - Session lifecycle, concurrency gate, error classification
//! - [`exec`] - Buffered, split-stream, and streamed command execution
//! - [`shell`] - Interactive PTY shell bridge
//! - [`monitoring`] - Delta telemetry engine, parsers, periodic collector
//! - [`parsers`] - Stateless converters for panel command output
//! - [`config`] - Connection settings
//! - [`tracing`] - Structured logging setup

#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod exec;
pub mod monitoring;
pub mod parsers;
pub mod shell;
pub mod tracing;
pub mod transport;

pub use auth::{KeyCredential, KeyError, KeyFamily, classify_key};
pub use config::{DEFAULT_SSH_PORT, SUPPORTED_PLATFORMS, SessionSettings};
pub use error::{WindlassError, WindlassResult};
pub use exec::{
    CancelHandle, CommandRunner, ExecError, ExecResult, MISSING_STATUS_CODE, SENTINEL,
    escape_single_quotes, wrap_streaming_command,
};
pub use monitoring::{
    CollectorHandle, DiskIo, HostInfo, InterfaceRate, MonitoringError, MonitoringSettings,
    StatusSnapshot, TelemetryEngine, TelemetryEvent, format_rate, start_collector,
};
pub use shell::{ShellError, ShellHandle, ShellOutput};
pub use transport::{
    CommandGate, DEFAULT_CHANNEL_LIMIT, GateError, GateTicket, Session, TransportError,
};
