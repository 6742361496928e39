//! Authenticated session lifecycle
//!
//! One [`Session`] owns the single authenticated connection to one remote
//! host. Commands and the interactive shell all multiplex over this
//! connection; the session itself only exposes channel-opening primitives and
//! lifecycle state. Each window or context holds its own `Session` instance;
//! there is no process-wide shared connection.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use russh::client::{self, AuthResult};
use russh::keys::PrivateKeyWithHashAlg;
use russh::{ChannelMsg, Disconnect};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{KeyCredential, KeyError};
use crate::config::SessionSettings;

use super::classify::describe_transport_error;
use super::gate::CommandGate;

/// Lightweight self-identification command issued right after authentication
const PLATFORM_COMMAND: &str = "uname -s";

/// Errors produced by the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    /// No live connection; the operation was refused before touching the gate
    #[error("Not connected to a remote host")]
    NotConnected,

    /// The credential could not be classified or decoded
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The server rejected the credential
    #[error("Authentication failed for {username}@{host}: server rejected the key")]
    AuthenticationFailed {
        /// Login username
        username: String,
        /// Remote host
        host: String,
    },

    /// The remote host reported an operating system outside the allow-list
    #[error("Unsupported remote platform '{platform}' (supported: {allowed})")]
    UnsupportedPlatform {
        /// What the remote reported
        platform: String,
        /// Comma-separated allow-list, for the error message
        allowed: String,
    },

    /// A network-level failure, already classified into readable text
    #[error("{0}")]
    ConnectionFailed(String),

    /// Opening or driving a command channel failed
    #[error("Command channel failure: {0}")]
    ChannelFailed(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// russh event handler for the client side of the connection
struct ClientHandler;

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Host key trust decisions belong to the embedding application's
        // known-hosts store; the core accepts the key it is handed.
        Ok(true)
    }
}

/// An authenticated connection to one remote host.
///
/// Created by [`Session::connect`], destroyed by [`Session::disconnect`] or a
/// fatal transport error. Holding a reference to a disconnected session is
/// legal; every operation on it fails fast with
/// [`TransportError::NotConnected`].
pub struct Session {
    id: Uuid,
    handle: RwLock<Option<client::Handle<ClientHandler>>>,
    gate: CommandGate,
    settings: SessionSettings,
    platform: RwLock<Option<String>>,
    pub(crate) shell_active: Arc<AtomicBool>,
}

impl Session {
    /// Connects, authenticates, and validates the remote platform.
    ///
    /// The credential's key family is classified from its textual preamble
    /// before any network traffic. After authentication the session asks the
    /// remote to identify itself and tears the connection down again if the
    /// reported platform is not on the allow-list, so no authenticated but
    /// unusable session ever escapes this function.
    ///
    /// # Errors
    ///
    /// Fails on unrecognized key material, network-level errors (classified
    /// into readable text), credential rejection, and platform mismatch.
    pub async fn connect(
        settings: SessionSettings,
        credential: &KeyCredential,
    ) -> TransportResult<Self> {
        let family = credential.family()?;
        tracing::debug!(
            host = %settings.host,
            port = settings.port,
            key_family = %family,
            "Connecting to remote host"
        );
        let key = credential.decode()?;

        let config = Arc::new(client::Config::default());
        let address = (settings.host.as_str(), settings.port);
        let mut handle =
            tokio::time::timeout(settings.connect_timeout(), client::connect(config, address, ClientHandler))
                .await
                .map_err(|_| {
                    TransportError::ConnectionFailed(format!(
                        "Connection to {}:{} timed out after {}s",
                        settings.host, settings.port, settings.connect_timeout_secs
                    ))
                })?
                .map_err(|e| TransportError::ConnectionFailed(describe_transport_error(&e)))?;

        let rsa_hash = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|e| TransportError::ConnectionFailed(describe_transport_error(&e)))?
            .flatten();
        let auth = handle
            .authenticate_publickey(
                settings.username.clone(),
                PrivateKeyWithHashAlg::new(Arc::new(key), rsa_hash),
            )
            .await
            .map_err(|e| TransportError::ConnectionFailed(describe_transport_error(&e)))?;
        if !matches!(auth, AuthResult::Success) {
            return Err(TransportError::AuthenticationFailed {
                username: settings.username.clone(),
                host: settings.host.clone(),
            });
        }

        let session = Self {
            id: Uuid::new_v4(),
            handle: RwLock::new(Some(handle)),
            gate: CommandGate::new(settings.channel_limit),
            platform: RwLock::new(None),
            shell_active: Arc::new(AtomicBool::new(false)),
            settings,
        };

        match session.identify_platform().await {
            Ok(platform) if session.settings.is_platform_allowed(&platform) => {
                tracing::info!(
                    session_id = %session.id,
                    host = %session.settings.host,
                    platform = %platform,
                    "Session established"
                );
                *session.platform.write().await = Some(platform);
                Ok(session)
            }
            Ok(platform) => {
                // Tear down before surfacing the mismatch; a half-open
                // authenticated session must not survive.
                session.disconnect().await;
                Err(TransportError::UnsupportedPlatform {
                    platform,
                    allowed: session.settings.allowed_platforms.join(", "),
                })
            }
            Err(err) => {
                session.disconnect().await;
                Err(err)
            }
        }
    }

    /// Closes the connection. Idempotent and best-effort: a failing close
    /// still leaves the session disconnected locally.
    pub async fn disconnect(&self) {
        let taken = self.handle.write().await.take();
        if let Some(handle) = taken {
            if let Err(err) = handle
                .disconnect(Disconnect::ByApplication, "session closed", "en")
                .await
            {
                tracing::debug!(
                    host = %self.settings.host,
                    error = %err,
                    "Disconnect request failed; connection state dropped anyway"
                );
            }
        }
        *self.platform.write().await = None;
    }

    /// Whether a live connection is held
    pub async fn is_connected(&self) -> bool {
        self.handle.read().await.is_some()
    }

    /// The platform the remote reported at connect time, while connected
    pub async fn platform(&self) -> Option<String> {
        self.platform.read().await.clone()
    }

    /// Unique identifier of this session instance
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The settings this session was established with
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The admission gate for batch command channels
    #[must_use]
    pub const fn gate(&self) -> &CommandGate {
        &self.gate
    }

    /// Fails fast when no live connection is held
    pub(crate) async fn ensure_connected(&self) -> TransportResult<()> {
        if self.handle.read().await.is_some() {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    /// Opens a fresh session channel over the live connection.
    ///
    /// Callers on the batch path must hold a gate ticket; the interactive
    /// shell bridge is the one caller that opens its channel ungated.
    pub(crate) async fn open_command_channel(
        &self,
    ) -> TransportResult<russh::Channel<client::Msg>> {
        let guard = self.handle.read().await;
        let handle = guard.as_ref().ok_or(TransportError::NotConnected)?;
        handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::ChannelFailed(describe_transport_error(&e)))
    }

    /// Builds a session that was never connected. Test-only: `connect` is the
    /// sole constructor in production.
    #[cfg(test)]
    pub(crate) fn detached(settings: SessionSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: RwLock::new(None),
            gate: CommandGate::new(settings.channel_limit),
            platform: RwLock::new(None),
            shell_active: Arc::new(AtomicBool::new(false)),
            settings,
        }
    }

    /// Runs the self-identification command and returns the trimmed output.
    ///
    /// Used once during connect, before the executor is in play, so it drives
    /// the channel directly rather than going through the gate.
    async fn identify_platform(&self) -> TransportResult<String> {
        let mut channel = self.open_command_channel().await?;
        channel
            .exec(true, PLATFORM_COMMAND)
            .await
            .map_err(|e| TransportError::ChannelFailed(describe_transport_error(&e)))?;

        let mut output = String::new();
        loop {
            let Some(msg) = channel.wait().await else { break };
            if let ChannelMsg::Data { ref data } = msg {
                output.push_str(&String::from_utf8_lossy(data));
            }
        }
        Ok(output.trim().to_string())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("host", &self.settings.host)
            .field("port", &self.settings.port)
            .field("username", &self.settings.username)
            .finish_non_exhaustive()
    }
}
