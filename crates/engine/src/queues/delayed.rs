// SPDX-License-Identifier: MIT

//! Delayed queue: a min-heap keyed by `execute_time`, drained by a single
//! driver task that wakes at the earliest deadline and promotes due entries
//! to the ready queue (spec.md §4.4, §5 "single driver").

use parking_lot::Mutex;
use rcab_core::{Clock, TaskId};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

/// Long sleep used when the queue is empty; any `push` wakes the driver
/// immediately via `notify` regardless of this value.
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct DelayedEntry {
    execute_time_epoch_ms: u64,
    task_id: TaskId,
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.execute_time_epoch_ms
            .cmp(&other.execute_time_epoch_ms)
            .then_with(|| self.task_id.as_uuid().cmp(&other.task_id.as_uuid()))
    }
}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct DelayedQueue {
    heap: Mutex<BinaryHeap<Reverse<DelayedEntry>>>,
    notify: Notify,
}

impl DelayedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task_id: TaskId, execute_time_epoch_ms: u64) {
        self.heap.lock().push(Reverse(DelayedEntry { execute_time_epoch_ms, task_id }));
        self.notify.notify_one();
    }

    /// Pops every entry due at or before `now_epoch_ms`.
    fn drain_due(&self, now_epoch_ms: u64) -> Vec<TaskId> {
        let mut heap = self.heap.lock();
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = heap.peek() {
            if entry.execute_time_epoch_ms > now_epoch_ms {
                break;
            }
            if let Some(Reverse(entry)) = heap.pop() {
                due.push(entry.task_id);
            }
        }
        due
    }

    fn next_deadline_ms(&self) -> Option<u64> {
        self.heap.lock().peek().map(|Reverse(entry)| entry.execute_time_epoch_ms)
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs until `cancel` fires, promoting due entries into `ready_tx`.
    pub async fn run<C: Clock>(
        &self,
        clock: &C,
        ready_tx: mpsc::UnboundedSender<TaskId>,
        cancel: CancellationToken,
    ) {
        loop {
            let now_ms = clock.epoch_ms();
            for task_id in self.drain_due(now_ms) {
                let _ = ready_tx.send(task_id);
            }

            let wait = match self.next_deadline_ms() {
                Some(deadline_ms) if deadline_ms > now_ms => {
                    Duration::from_millis(deadline_ms - now_ms)
                }
                Some(_) => Duration::ZERO,
                None => IDLE_SLEEP,
            };

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => continue,
                _ = self.notify.notified() => continue,
            }
        }
    }
}

#[cfg(test)]
#[path = "delayed_tests.rs"]
mod tests;
