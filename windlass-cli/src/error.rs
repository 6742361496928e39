//! CLI error type with sysexits-style exit codes

use thiserror::Error;
use windlass_core::WindlassError;

/// Errors surfaced to the terminal user
#[derive(Debug, Error)]
pub enum CliError {
    /// Core library failure (connection, execution, telemetry)
    #[error(transparent)]
    Core(#[from] WindlassError),

    /// Local I/O failure (key file, terminal)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    /// The streamed remote command exited non-zero
    #[error("Remote command exited with status {0}")]
    RemoteStatus(i32),
}

impl CliError {
    /// Maps the error onto a process exit code
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            // EX_IOERR
            Self::Io(_) => 74,
            // EX_SOFTWARE
            Self::Json(_) => 70,
            // Forward the remote status, clamped into the portable range
            Self::RemoteStatus(status) => (*status).clamp(1, 125),
        }
    }
}
