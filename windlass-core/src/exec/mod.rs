//! Gated command execution
//!
//! Three execution modes over the transport session, all admitted through the
//! concurrency gate: buffered ([`Session::run`]), split-stream
//! ([`Session::run_detailed`]), and incrementally streamed
//! ([`Session::run_streaming`]) with the exit-status sentinel protocol. Every
//! entry point fails fast with `NotConnected` before touching the gate.
//!
//! Buffered and split-stream executions cannot be cancelled once dispatched;
//! the streamed mode checks a cooperative [`CancelHandle`] between frames.

mod cancel;
mod stream;

pub use cancel::CancelHandle;
pub use stream::{MISSING_STATUS_CODE, SENTINEL, StreamAssembler};

use async_trait::async_trait;
use russh::ChannelMsg;
use thiserror::Error;

use crate::transport::{GateError, Session, TransportError, describe_transport_error};

/// Wrapper that forces a PTY around a streamed command so the remote process
/// flushes line by line instead of block-buffering its output
pub const PTY_FORCING_PREFIX: &str = "script -q /dev/null";

/// Errors produced by command execution
#[derive(Debug, Error)]
pub enum ExecError {
    /// Transport-level failure, including not-connected fast path
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Gate admission failure
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The caller cancelled a streamed execution between frames
    #[error("Streaming execution cancelled")]
    Cancelled,
}

/// Result type for execution operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Seam for anything that can run a remote command and return its text.
///
/// The telemetry engine and the feature panels depend on this trait rather
/// than on [`Session`] directly, so tests can substitute canned output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a command and returns its combined output
    async fn run(&self, command: &str) -> ExecResult<String>;
}

/// Escapes single quotes with the `'\''` idiom so the command survives being
/// wrapped in single quotes for `sh -c`.
#[must_use]
pub fn escape_single_quotes(command: &str) -> String {
    command.replace('\'', "'\\''")
}

/// Wraps a command for streamed execution: PTY-forcing prefix, `sh -c`, and
/// the trailing sentinel emission.
#[must_use]
pub fn wrap_streaming_command(command: &str) -> String {
    format!(
        "{PTY_FORCING_PREFIX} sh -c '{}; echo {SENTINEL}$?'",
        escape_single_quotes(command)
    )
}

fn channel_failure(err: &russh::Error) -> ExecError {
    ExecError::Transport(TransportError::ChannelFailed(describe_transport_error(err)))
}

impl Session {
    /// Runs a command and returns its combined stdout/stderr as one string.
    ///
    /// An empty output is a valid success. The remote's exit code is not
    /// surfaced in this mode; a failing command's diagnostics appear in the
    /// returned text, and callers that need the status must use
    /// [`run_streaming`](Self::run_streaming) or
    /// [`run_detailed`](Self::run_detailed).
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::NotConnected`] before gate admission when
    /// no live connection is held, or with a channel failure.
    pub async fn run(&self, command: &str) -> ExecResult<String> {
        self.ensure_connected().await?;
        let _ticket = self.gate().acquire().await?;
        tracing::trace!(command, "Dispatching buffered command");

        let mut channel = self.open_command_channel().await?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| channel_failure(&e))?;

        let mut output = String::new();
        loop {
            let Some(msg) = channel.wait().await else { break };
            match msg {
                ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                    output.push_str(&String::from_utf8_lossy(data));
                }
                _ => {}
            }
        }
        Ok(output)
    }

    /// Runs a command through a channel that keeps stdout and stderr apart,
    /// accumulating each until the remote process terminates.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`run`](Self::run).
    pub async fn run_detailed(&self, command: &str) -> ExecResult<(String, String)> {
        self.ensure_connected().await?;
        let _ticket = self.gate().acquire().await?;
        tracing::trace!(command, "Dispatching split-stream command");

        let mut channel = self.open_command_channel().await?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| channel_failure(&e))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        loop {
            let Some(msg) = channel.wait().await else { break };
            match msg {
                ChannelMsg::Data { ref data } => {
                    stdout.push_str(&String::from_utf8_lossy(data));
                }
                ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    stderr.push_str(&String::from_utf8_lossy(data));
                }
                _ => {}
            }
        }
        Ok((stdout, stderr))
    }

    /// Streams a command's output incrementally and returns its exit status.
    ///
    /// The command is wrapped with [`wrap_streaming_command`]; every received
    /// frame is forwarded to `on_chunk` except the sentinel, and the status is
    /// recovered from the trailing text ([`MISSING_STATUS_CODE`] when the
    /// stream ends without it, e.g. the session died mid-stream).
    ///
    /// The cancel flag is checked on every received frame; on cancellation no
    /// further chunks are emitted and the gate ticket is released.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::NotConnected`] before gate admission, a
    /// channel failure, or [`ExecError::Cancelled`].
    pub async fn run_streaming<F>(
        &self,
        command: &str,
        mut on_chunk: F,
        cancel: &CancelHandle,
    ) -> ExecResult<i32>
    where
        F: FnMut(&str) + Send,
    {
        self.ensure_connected().await?;
        let _ticket = self.gate().acquire().await?;
        let wrapped = wrap_streaming_command(command);
        tracing::trace!(command, "Dispatching streamed command");

        let mut channel = self.open_command_channel().await?;
        channel
            .exec(true, wrapped.as_str())
            .await
            .map_err(|e| channel_failure(&e))?;

        let mut assembler = StreamAssembler::new();
        loop {
            let Some(msg) = channel.wait().await else { break };
            if cancel.is_cancelled() {
                tracing::debug!(command, "Streamed command cancelled");
                return Err(ExecError::Cancelled);
            }
            match msg {
                ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                    if let Some(chunk) = assembler.push(&String::from_utf8_lossy(data)) {
                        on_chunk(&chunk);
                    }
                }
                _ => {}
            }
        }
        Ok(assembler.finish())
    }
}

#[async_trait]
impl CommandRunner for Session {
    async fn run(&self, command: &str) -> ExecResult<String> {
        Session::run(self, command).await
    }
}
