// SPDX-License-Identifier: MIT

//! Category-wide token bucket for build/execute concurrency (spec.md §4.2
//! "Token bucket"). Keyed logically as `bucket:{category}` (spec.md §6).

use parking_lot::Mutex;
use rcab_core::{Clock, TaskId, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::ArbiterError;

/// The two categories named in spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Build,
    Execute,
}

rcab_core::simple_display! {
    Category {
        Build => "BUILD",
        Execute => "EXECUTE",
    }
}

/// Poll interval used as the fallback wake in `wait_for_token` when no
/// `release` notification arrives before it (spec.md §4.2 "neither FIFO nor
/// priority is contracted ... a waiter that re-polls will eventually get a
/// token").
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Lease {
    task_id: TaskId,
    trace_id: TraceId,
    #[allow(dead_code)]
    acquired_at_epoch_ms: u64,
    expires_at_epoch_ms: u64,
}

#[derive(Default)]
struct Bucket {
    leases: Vec<Lease>,
}

/// Result of a non-blocking `try_acquire`.
#[derive(Debug, Clone, Copy)]
pub struct TryAcquireResult {
    pub acquired: bool,
    /// Implementation-defined retry hint for the caller to back off by.
    pub wait_hint: Duration,
    /// Whether an expired lease was force-reclaimed to make room. Open
    /// Question #2 (spec.md §9) requires a warning event on this; the
    /// arbiter itself never touches the event bus (ownership separation,
    /// spec.md §3), so it surfaces the fact here for the caller to emit.
    pub reclaimed_expired: bool,
}

/// Per-category fixed-capacity lease pool (spec.md §4.2, §8: `|leases| ≤ N`).
pub struct TokenBucket<C: Clock> {
    clock: C,
    capacity: u32,
    buckets: Mutex<HashMap<Category, Bucket>>,
    notify: Notify,
}

impl<C: Clock> TokenBucket<C> {
    pub fn new(clock: C, capacity: u32) -> Self {
        Self { clock, capacity, buckets: Mutex::new(HashMap::new()), notify: Notify::new() }
    }

    fn reap_expired(bucket: &mut Bucket, now_ms: u64) -> bool {
        let before = bucket.leases.len();
        bucket.leases.retain(|lease| lease.expires_at_epoch_ms > now_ms);
        bucket.leases.len() != before
    }

    pub fn try_acquire(
        &self,
        category: Category,
        task_id: TaskId,
        trace_id: TraceId,
        lease_ttl: Duration,
    ) -> TryAcquireResult {
        let now_ms = self.clock.epoch_ms();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(category).or_default();
        let reclaimed = Self::reap_expired(bucket, now_ms);

        if bucket.leases.len() >= self.capacity as usize {
            return TryAcquireResult {
                acquired: false,
                wait_hint: POLL_INTERVAL,
                reclaimed_expired: reclaimed,
            };
        }

        bucket.leases.push(Lease {
            task_id,
            trace_id,
            acquired_at_epoch_ms: now_ms,
            expires_at_epoch_ms: now_ms + lease_ttl.as_millis() as u64,
        });
        TryAcquireResult { acquired: true, wait_hint: Duration::ZERO, reclaimed_expired: reclaimed }
    }

    /// Cooperative wait with cancellation (spec.md §4.2, §5 "suspension
    /// points"). Returns `Ok(reclaimed_expired)` once a lease is acquired,
    /// or an error if `max_wait` elapses or `cancel` fires first.
    pub async fn wait_for_token(
        &self,
        category: Category,
        task_id: TaskId,
        trace_id: TraceId,
        lease_ttl: Duration,
        max_wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, ArbiterError> {
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            let result = self.try_acquire(category, task_id, trace_id, lease_ttl);
            if result.acquired {
                return Ok(result.reclaimed_expired);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ArbiterError::TokenWaitTimeout(max_wait));
            }

            let wake = tokio::time::sleep(remaining.min(POLL_INTERVAL));
            tokio::select! {
                _ = cancel.cancelled() => return Err(ArbiterError::Cancelled),
                _ = self.notify.notified() => continue,
                _ = wake => continue,
            }
        }
    }

    /// Idempotent: a no-op if the lease has already expired or is not held
    /// by this `(task_id, trace_id)` pair (spec.md §4.2).
    pub fn release(&self, category: Category, task_id: TaskId, trace_id: TraceId) {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(category).or_default();
        let before = bucket.leases.len();
        bucket.leases.retain(|lease| !(lease.task_id == task_id && lease.trace_id == trace_id));
        if bucket.leases.len() != before {
            drop(buckets);
            self.notify.notify_waiters();
        }
    }

    pub fn live_lease_count(&self, category: Category) -> usize {
        let now_ms = self.clock.epoch_ms();
        let buckets = self.buckets.lock();
        buckets
            .get(&category)
            .map(|bucket| bucket.leases.iter().filter(|l| l.expires_at_epoch_ms > now_ms).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "token_bucket_tests.rs"]
mod tests;
