// SPDX-License-Identifier: MIT

//! Per-execution context handed to executors (spec.md §4.5, §4.7): an
//! explicit, constructor-injected bundle — cancellation, a deadline, the
//! trace/group carriers implicit on the task itself, and handles to every
//! collaborator an executor might need — never a process-wide singleton
//! (spec.md §9 "Ambient-global state").

use rcab_adapters::JobAdapter;
use rcab_arbiter::{NamespaceLock, TokenBucket};
use rcab_core::{Clock, Config, TaskType};
use rcab_storage::{EventBus, RecordStore, TaskStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::scheduler::Scheduler;

/// Per-type deadline (spec.md §5 "Timeouts"): an implementation-chosen
/// ceiling on how long one executor invocation may run before the worker
/// cancels it and the scheduler consults the retry policy.
pub fn deadline_for(task_type: TaskType) -> Duration {
    match task_type {
        TaskType::InjectFault => Duration::from_secs(60),
        TaskType::BuildDataset => Duration::from_secs(120),
        TaskType::RunAlgorithm => Duration::from_secs(60),
        TaskType::CollectResult => Duration::from_secs(30),
        TaskType::BuildImage => Duration::from_secs(120),
        TaskType::RestartPedestal => Duration::from_secs(180),
    }
}

/// Everything one `Executor::execute` call needs, bundled so a test can
/// construct it against fakes without touching a real cluster.
pub struct TaskContext<A: JobAdapter, C: Clock> {
    pub store: Arc<TaskStore>,
    pub records: Arc<RecordStore>,
    pub bus: Arc<EventBus<C>>,
    pub namespace_lock: Arc<NamespaceLock<C>>,
    pub token_bucket: Arc<TokenBucket<C>>,
    pub adapter: Arc<A>,
    pub config: Arc<Config>,
    pub clock: C,
    pub scheduler: Arc<Scheduler<A, C>>,
    pub cancel: CancellationToken,
    pub deadline: tokio::time::Instant,
}

impl<A: JobAdapter, C: Clock> TaskContext<A, C> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_past_deadline(&self) -> bool {
        tokio::time::Instant::now() >= self.deadline
    }
}
