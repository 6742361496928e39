//! Cooperative cancellation for streamed executions

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation flag shared between a caller and a streaming read loop.
///
/// Cancellation is cooperative: the read loop checks the flag between frames,
/// so a cancel takes effect at the next frame boundary. Clones observe the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a handle in the not-cancelled state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Irrevocable for this handle's lifetime.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
