// SPDX-License-Identifier: MIT

//! The shared executor contract (spec.md §4.5): `execute(ctx, task)`
//! dispatched by tag to a per-type handler with a typed payload projection.

use async_trait::async_trait;
use rcab_adapters::JobAdapter;
use rcab_core::{Clock, Task};

use crate::context::TaskContext;
use crate::error::ExecutorError;

/// What happened when `execute` returned control to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The task reached a terminal outcome synchronously, inside this call
    /// (COLLECT_RESULT reading an already-produced record).
    Completed,
    /// An orchestrator job or injection was created; the task stays RUNNING
    /// until the Job Adapter's lifecycle callback reports a terminal result
    /// (spec.md §5 "waits for job completion are not in-worker").
    AwaitingCallback,
    /// The executor already moved the task back to PENDING itself via
    /// `ctx.scheduler.reschedule` (namespace busy, no token) and emitted its
    /// own event; the generic retry-policy path in the scheduler must not
    /// also touch task state for this invocation.
    Rescheduled,
}

#[async_trait]
pub trait Executor<A: JobAdapter, C: Clock>: Send + Sync {
    async fn execute(
        &self,
        ctx: &TaskContext<A, C>,
        task: &Task,
    ) -> Result<ExecOutcome, ExecutorError>;
}
