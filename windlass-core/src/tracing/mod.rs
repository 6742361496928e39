//! Tracing integration for structured logging
//!
//! Initializes the `tracing` subscriber for the library and its embedders.
//! Key material and shell output bytes are never logged; log lines carry
//! hostnames, commands, and error text only.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Global flag indicating whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Global tracing configuration
static TRACING_CONFIG: OnceLock<TracingConfig> = OnceLock::new();

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to initialize the subscriber
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Tracing log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Only errors
    Error,
    /// Errors and warnings
    Warn,
    /// Errors, warnings, and info (default)
    #[default]
    Info,
    /// All above plus debug messages
    Debug,
    /// All messages including trace
    Trace,
}

impl TracingLevel {
    /// Converts to the tracing crate's `Level`
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Log level
    pub level: TracingLevel,
    /// Custom `EnvFilter` directive string (overrides `level` when set)
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Initializes the global tracing subscriber to stderr.
///
/// Honors `RUST_LOG` when present, then the config's filter string, then its
/// level.
///
/// # Errors
///
/// Returns [`TracingError::AlreadyInitialized`] on a second call, or
/// [`TracingError::InitializationFailed`] if the subscriber cannot be set.
pub fn init_tracing(config: TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let filter = std::env::var("RUST_LOG").ok().map_or_else(
        || {
            config.filter.clone().map_or_else(
                || EnvFilter::new(config.level.to_tracing_level().to_string().to_lowercase()),
                EnvFilter::new,
            )
        },
        EnvFilter::new,
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    let _ = TRACING_CONFIG.set(config);
    Ok(())
}

/// Whether [`init_tracing`] has completed
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// The configuration tracing was initialized with, if any
#[must_use]
pub fn get_tracing_config() -> Option<&'static TracingConfig> {
    TRACING_CONFIG.get()
}
