//! Interactive PTY shell bridge
//!
//! One long-lived pseudo-terminal channel for a full remote shell. The bridge
//! bypasses the command gate: it is a single persistent channel, not a
//! pool-bounded resource, and only one bridge may be active per session —
//! opening a second fails rather than corrupting the first.
//!
//! Output is forwarded byte-for-byte, with no line buffering or re-encoding,
//! so terminal escape sequences survive intact for the renderer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use russh::ChannelMsg;
use russh::client::Msg;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::transport::{Session, TransportError};

/// Terminal type requested for the remote PTY
pub const TERM_TYPE: &str = "xterm-256color";
/// Default terminal width in columns
pub const DEFAULT_COLS: u32 = 80;
/// Default terminal height in rows
pub const DEFAULT_ROWS: u32 = 24;

/// Capacity of the output channel toward the terminal renderer
const OUTPUT_BUFFER: usize = 64;
/// Capacity of the control channel from the handle into the bridge loop
const CONTROL_BUFFER: usize = 32;

/// Errors produced by the shell bridge
#[derive(Debug, Error)]
pub enum ShellError {
    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A bridge is already active on this session
    #[error("An interactive shell is already active on this session")]
    AlreadyActive,

    /// PTY or shell negotiation failed
    #[error("Failed to negotiate remote PTY: {0}")]
    NegotiationFailed(String),

    /// The bridge loop has terminated; the input sink is gone
    #[error("Shell input sink is closed")]
    InputClosed,
}

/// Result type for shell operations
pub type ShellResult<T> = Result<T, ShellError>;

/// One chunk of shell output, forwarded verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutput {
    /// Bytes from the remote stdout stream
    Stdout(Vec<u8>),
    /// Bytes from the remote stderr stream
    Stderr(Vec<u8>),
    /// The remote side closed the channel; no more output will arrive
    Closed,
}

/// Control messages from the handle into the bridge loop
enum ShellControl {
    Input(Vec<u8>),
    Resize { cols: u32, rows: u32 },
    Stop,
}

/// Handle to a running shell bridge.
///
/// The handle is the input sink: it only exists once the remote PTY is fully
/// negotiated, so input sent through it is never silently dropped during
/// negotiation. The bridge does not buffer input on the caller's behalf
/// before that point.
#[derive(Debug, Clone)]
pub struct ShellHandle {
    control_tx: mpsc::Sender<ShellControl>,
}

impl ShellHandle {
    /// Sends keystrokes or command bytes to the remote shell.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::InputClosed`] once the bridge has terminated.
    pub async fn send_input(&self, bytes: impl Into<Vec<u8>>) -> ShellResult<()> {
        self.control_tx
            .send(ShellControl::Input(bytes.into()))
            .await
            .map_err(|_| ShellError::InputClosed)
    }

    /// Propagates a local terminal resize to the remote PTY.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::InputClosed`] once the bridge has terminated.
    pub async fn resize(&self, cols: u32, rows: u32) -> ShellResult<()> {
        self.control_tx
            .send(ShellControl::Resize { cols, rows })
            .await
            .map_err(|_| ShellError::InputClosed)
    }

    /// Stops the bridge: cancels the read loop and drops the input sink.
    /// A bridge that has already terminated is left as-is.
    pub async fn stop(&self) {
        let _ = self.control_tx.send(ShellControl::Stop).await;
    }
}

impl Session {
    /// Opens the interactive shell bridge with the default terminal geometry.
    ///
    /// Returns the input/control handle and the stream of output chunks. The
    /// bridge terminates on [`ShellHandle::stop`] or remote closure, emitting
    /// [`ShellOutput::Closed`] last; it never reconnects on its own.
    ///
    /// # Errors
    ///
    /// Fails when not connected, when a bridge is already active, or when PTY
    /// or shell negotiation is refused.
    pub async fn open_shell(&self) -> ShellResult<(ShellHandle, mpsc::Receiver<ShellOutput>)> {
        self.ensure_connected().await?;
        if self
            .shell_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ShellError::AlreadyActive);
        }

        match self.negotiate_shell().await {
            Ok(parts) => Ok(parts),
            Err(err) => {
                self.shell_active.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    async fn negotiate_shell(&self) -> ShellResult<(ShellHandle, mpsc::Receiver<ShellOutput>)> {
        // Persistent channel, deliberately outside the command gate
        let channel = self.open_command_channel().await?;
        channel
            .request_pty(false, TERM_TYPE, DEFAULT_COLS, DEFAULT_ROWS, 0, 0, &[])
            .await
            .map_err(|e| ShellError::NegotiationFailed(e.to_string()))?;
        channel
            .request_shell(true)
            .await
            .map_err(|e| ShellError::NegotiationFailed(e.to_string()))?;
        tracing::info!(term = TERM_TYPE, "Interactive shell negotiated");

        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_BUFFER);
        tokio::spawn(bridge_loop(
            channel,
            control_rx,
            output_tx,
            Arc::clone(&self.shell_active),
        ));

        Ok((ShellHandle { control_tx }, output_rx))
    }
}

/// Drives the PTY channel: multiplexes remote output toward the renderer and
/// control messages (input, resize, stop) toward the remote.
async fn bridge_loop(
    mut channel: russh::Channel<Msg>,
    mut control_rx: mpsc::Receiver<ShellControl>,
    output_tx: mpsc::Sender<ShellOutput>,
    active: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { ref data }) => {
                    if output_tx.send(ShellOutput::Stdout(data.to_vec())).await.is_err() {
                        break; // renderer went away
                    }
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    if output_tx.send(ShellOutput::Stderr(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Some(_) => {}
                None => {
                    tracing::debug!("Remote shell channel closed");
                    let _ = output_tx.send(ShellOutput::Closed).await;
                    break;
                }
            },
            ctl = control_rx.recv() => match ctl {
                Some(ShellControl::Input(bytes)) => {
                    if let Err(err) = channel.data(&bytes[..]).await {
                        tracing::warn!(error = %err, "Failed to send shell input");
                        let _ = output_tx.send(ShellOutput::Closed).await;
                        break;
                    }
                }
                Some(ShellControl::Resize { cols, rows }) => {
                    if let Err(err) = channel.window_change(cols, rows, 0, 0).await {
                        tracing::debug!(error = %err, "Window-change request failed");
                    }
                }
                Some(ShellControl::Stop) | None => {
                    let _ = channel.eof().await;
                    let _ = output_tx.send(ShellOutput::Closed).await;
                    break;
                }
            },
        }
    }
    active.store(false, Ordering::SeqCst);
}
