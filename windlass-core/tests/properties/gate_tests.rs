//! Admission-gate properties: bound enforcement and FIFO release order

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use windlass_core::CommandGate;

/// For every N up to the limit, N acquisitions succeed without queuing
#[tokio::test]
async fn acquisitions_up_to_limit_never_queue() {
    for limit in 1..=6 {
        let gate = CommandGate::new(limit);
        let mut tickets = Vec::new();
        for n in 1..=limit {
            let ticket = tokio::time::timeout(Duration::from_millis(50), gate.acquire())
                .await
                .unwrap_or_else(|_| panic!("acquisition {n} of {limit} queued"))
                .unwrap();
            tickets.push(ticket);
        }
        assert_eq!(gate.available(), 0);
    }
}

/// The (limit+1)-th acquisition blocks until a release occurs
#[tokio::test]
async fn over_limit_acquisition_waits_for_release() {
    let gate = CommandGate::new(3);
    let mut tickets = Vec::new();
    for _ in 0..3 {
        tickets.push(gate.acquire().await.unwrap());
    }

    let gate2 = gate.clone();
    let waiter = tokio::spawn(async move { gate2.acquire().await.unwrap() });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "fourth acquisition must queue");

    tickets.pop();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("queued acquisition must complete after a release")
        .unwrap();
}

/// Queued waiters are admitted in arrival order
#[tokio::test]
async fn queued_waiters_release_in_arrival_order() {
    let gate = CommandGate::new(1);
    let blocker = gate.acquire().await.unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for id in 0..5 {
        let gate = gate.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ticket = gate.acquire().await.unwrap();
            tx.send(id).unwrap();
            drop(ticket);
        });
        // Deterministic enqueue order
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    drop(blocker);
    let mut order = Vec::new();
    for _ in 0..5 {
        order.push(rx.recv().await.unwrap());
    }
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
}

/// Concurrent holders never exceed the configured bound
#[tokio::test]
async fn concurrency_never_exceeds_bound() {
    const LIMIT: usize = 4;
    const TASKS: usize = 32;

    let gate = CommandGate::new(LIMIT);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let gate = gate.clone();
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            let _ticket = gate.acquire().await.unwrap();
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            active.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= LIMIT);
}
