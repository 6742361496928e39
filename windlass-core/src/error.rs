//! Central error taxonomy
//!
//! Each layer defines its own error enum next to its code; this module folds
//! them into one crate-level error for embedders that want a single type at
//! the boundary. Every public operation either returns data or one
//! descriptive error string — parse-level anomalies never reach this type,
//! they are absorbed as partial results where they occur.

use thiserror::Error;

use crate::auth::KeyError;
use crate::exec::ExecError;
use crate::monitoring::MonitoringError;
use crate::shell::ShellError;
use crate::transport::{GateError, TransportError};

/// Top-level error for the Windlass core
#[derive(Debug, Error)]
pub enum WindlassError {
    /// Key classification or decoding failure
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Connection, authentication, or platform-validation failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Gate admission failure
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Command execution failure
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Interactive shell failure
    #[error(transparent)]
    Shell(#[from] ShellError),

    /// Telemetry collection failure
    #[error(transparent)]
    Monitoring(#[from] MonitoringError),
}

/// Result type for crate-level operations
pub type WindlassResult<T> = Result<T, WindlassError>;
