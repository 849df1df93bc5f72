// SPDX-License-Identifier: MIT

use super::*;
use rcab_core::FakeClock;
use std::sync::Arc;

#[test]
fn drain_due_pops_entries_at_or_before_now() {
    let queue = DelayedQueue::new();
    let early = TaskId::new();
    let late = TaskId::new();
    queue.push(early, 1_000);
    queue.push(late, 5_000);

    let due = queue.drain_due(1_000);
    assert_eq!(due, vec![early]);
    assert_eq!(queue.len(), 1);

    let due = queue.drain_due(5_000);
    assert_eq!(due, vec![late]);
    assert!(queue.is_empty());
}

#[test]
fn drain_due_orders_by_execute_time_then_task_id() {
    let queue = DelayedQueue::new();
    let first = TaskId::new();
    let second = TaskId::new();
    queue.push(second, 2_000);
    queue.push(first, 1_000);

    let due = queue.drain_due(10_000);
    assert_eq!(due, vec![first, second]);
}

#[test]
fn next_deadline_reflects_earliest_pending_entry() {
    let queue = DelayedQueue::new();
    assert_eq!(queue.next_deadline_ms(), None);

    queue.push(TaskId::new(), 3_000);
    queue.push(TaskId::new(), 1_500);
    assert_eq!(queue.next_deadline_ms(), Some(1_500));
}

#[tokio::test]
async fn run_promotes_due_entries_to_ready_channel() {
    let queue = Arc::new(DelayedQueue::new());
    let clock = FakeClock::new();
    let task_id = TaskId::new();
    let due_at = clock.epoch_ms();
    queue.push(task_id, due_at);

    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let driver = {
        let queue = Arc::clone(&queue);
        let clock = clock.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.run(&clock, ready_tx, cancel).await })
    };

    let received = tokio::time::timeout(Duration::from_secs(1), ready_rx.recv())
        .await
        .expect("driver should promote the due entry promptly");
    assert_eq!(received, Some(task_id));

    cancel.cancel();
    driver.await.expect("driver task should not panic");
}

#[tokio::test]
async fn run_stops_promptly_on_cancel_when_idle() {
    let queue = Arc::new(DelayedQueue::new());
    let clock = FakeClock::new();
    let (ready_tx, _ready_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let driver = {
        let queue = Arc::clone(&queue);
        let clock = clock.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.run(&clock, ready_tx, cancel).await })
    };

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), driver)
        .await
        .expect("driver should exit promptly on cancel")
        .expect("driver task should not panic");
}
