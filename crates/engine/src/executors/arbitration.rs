// SPDX-License-Identifier: MIT

//! Shared namespace-lock / token-bucket admission logic used by every
//! executor that fronts an orchestrator job (spec.md §4.2, §4.5). Pulled
//! out once three executors needed the identical "acquire or reschedule
//! and bail" shape.

use std::time::Duration;

use rcab_adapters::JobAdapter;
use rcab_arbiter::{AcquireOutcome, Category};
use rcab_core::{Clock, Event, Task};

use crate::context::TaskContext;
use crate::error::ExecutorError;
use crate::executor::ExecOutcome;
use crate::scheduler::DEFAULT_RESCHEDULE_RANGE;

/// Acquires `namespace` for `task`, or reschedules it and emits
/// `NamespaceLockWait`. `Some(outcome)` means the caller must return it from
/// `execute` immediately; `None` means the lock is held and execution
/// should proceed.
pub async fn acquire_namespace_or_reschedule<A: JobAdapter, C: Clock>(
    ctx: &TaskContext<A, C>,
    task: &Task,
    namespace: &str,
    ttl: Duration,
) -> Result<Option<ExecOutcome>, ExecutorError> {
    let holder = task.id.to_string();
    match ctx.namespace_lock.acquire(namespace, &holder, ttl) {
        AcquireOutcome::Acquired { reclaimed_expired } => {
            if reclaimed_expired {
                tracing::warn!(task_id = %task.id, namespace, "namespace lock reclaimed from expired holder");
            }
            Ok(None)
        }
        AcquireOutcome::SameHolder => Ok(None),
        AcquireOutcome::HeldByOther => {
            let now = ctx.clock.epoch_ms();
            ctx.scheduler
                .reschedule(task.id, DEFAULT_RESCHEDULE_RANGE, now)
                .map_err(|err| ExecutorError::Infra(err.to_string()))?;
            ctx.bus.append(
                task.trace_id,
                Event::NamespaceLockWait {
                    task_id: task.id,
                    trace_id: task.trace_id,
                    namespace: namespace.to_string(),
                },
                None,
            );
            Ok(Some(ExecOutcome::Rescheduled))
        }
    }
}

/// Releases a namespace lock this task held, tolerating a stale release
/// (the lock may already have expired and been reclaimed by another task).
pub fn release_namespace(namespace_lock: &rcab_arbiter::NamespaceLock<impl Clock>, task: &Task, namespace: &str) {
    let holder = task.id.to_string();
    let _ = namespace_lock.release(namespace, &holder);
}

/// Waits up to `ctx.config.token_wait_timeout_secs` for a `category` token;
/// reschedules and emits `NoTokenAvailable` if none becomes available in
/// time (spec.md §4.2, §4.5 "WaitForToken timeout").
pub async fn acquire_token_or_reschedule<A: JobAdapter, C: Clock>(
    ctx: &TaskContext<A, C>,
    task: &Task,
    category: Category,
    lease_ttl: Duration,
) -> Result<Option<ExecOutcome>, ExecutorError> {
    let wait = Duration::from_secs(ctx.config.token_wait_timeout_secs);
    match ctx
        .token_bucket
        .wait_for_token(category, task.id, task.trace_id, lease_ttl, wait, &ctx.cancel)
        .await
    {
        Ok(reclaimed_expired) => {
            if reclaimed_expired {
                ctx.bus.append(
                    task.trace_id,
                    Event::LeaseForceReclaimed {
                        task_id: task.id,
                        trace_id: task.trace_id,
                        category: category.to_string(),
                    },
                    None,
                );
            }
            Ok(None)
        }
        Err(_) => {
            let now = ctx.clock.epoch_ms();
            ctx.scheduler
                .reschedule(task.id, DEFAULT_RESCHEDULE_RANGE, now)
                .map_err(|err| ExecutorError::Infra(err.to_string()))?;
            ctx.bus.append(
                task.trace_id,
                Event::NoTokenAvailable {
                    task_id: task.id,
                    trace_id: task.trace_id,
                    category: category.to_string(),
                },
                None,
            );
            Ok(Some(ExecOutcome::Rescheduled))
        }
    }
}
