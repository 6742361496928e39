//! Admission gate bounding concurrently open command channels
//!
//! SSH servers cap the number of simultaneously open channels per connection,
//! typically at single digits, so every batch command acquires a ticket here
//! before opening a channel. Waiters are admitted in arrival (FIFO) order.
//! Acquisition never times out on its own; callers that need bounded latency
//! must wrap [`CommandGate::acquire`] in their own timeout.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default bound on concurrently open command channels
pub const DEFAULT_CHANNEL_LIMIT: usize = 5;

/// Errors produced by gate acquisition
#[derive(Debug, Error)]
pub enum GateError {
    /// The gate was closed while a caller was waiting
    #[error("Command gate closed while waiting for admission")]
    Closed,
}

/// Counting admission gate with a fixed limit and FIFO wait queue
#[derive(Debug, Clone)]
pub struct CommandGate {
    permits: Arc<Semaphore>,
    limit: usize,
}

/// Permission to hold one open command channel.
///
/// Capacity returns when the ticket is dropped, so a task that errors partway
/// through a command still releases its slot.
#[derive(Debug)]
pub struct GateTicket {
    _permit: OwnedSemaphorePermit,
}

impl CommandGate {
    /// Creates a gate admitting at most `limit` concurrent holders.
    ///
    /// A limit of zero is bumped to one; a gate that admits nothing would
    /// deadlock every caller.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Waits for admission and returns a ticket.
    ///
    /// `tokio`'s semaphore is fair, so waiters are released in the order they
    /// arrived.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the gate is closed, which does not
    /// happen during normal session lifetime.
    pub async fn acquire(&self) -> Result<GateTicket, GateError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        Ok(GateTicket { _permit: permit })
    }

    /// Returns a ticket immediately, or `None` if the gate is at capacity
    #[must_use]
    pub fn try_acquire(&self) -> Option<GateTicket> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| GateTicket { _permit: permit })
    }

    /// The configured admission limit
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Tickets currently available without waiting
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for CommandGate {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_up_to_limit_without_waiting() {
        let gate = CommandGate::new(3);
        let mut tickets = Vec::new();
        for _ in 0..3 {
            tickets.push(gate.try_acquire().expect("should admit up to limit"));
        }
        assert_eq!(gate.available(), 0);
        assert!(gate.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_over_limit_blocks_until_release() {
        let gate = CommandGate::new(1);
        let held = gate.acquire().await.unwrap();

        let gate2 = gate.clone();
        let waiter = tokio::spawn(async move { gate2.acquire().await.unwrap() });

        // The waiter cannot be admitted while the ticket is held
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let _admitted = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be admitted after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_waiters_admitted_in_fifo_order() {
        let gate = CommandGate::new(1);
        let held = gate.acquire().await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut handles = Vec::new();
        for id in 0..4 {
            let gate = gate.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let ticket = gate.acquire().await.unwrap();
                tx.send(id).unwrap();
                ticket
            }));
            // Give each waiter time to enqueue before the next one arrives
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(held);
        let mut order = Vec::new();
        for _ in 0..4 {
            order.push(rx.recv().await.unwrap());
        }
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_ticket_released_on_drop_in_error_path() {
        let gate = CommandGate::new(1);

        let result: Result<(), &str> = async {
            let _ticket = gate.acquire().await.unwrap();
            Err("command failed mid-flight")
        }
        .await;
        assert!(result.is_err());

        // The slot must be free again despite the error
        assert_eq!(gate.available(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_zero_limit_is_bumped() {
        let gate = CommandGate::new(0);
        assert_eq!(gate.limit(), 1);
    }
}
