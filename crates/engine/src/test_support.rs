// SPDX-License-Identifier: MIT

//! Shared scaffolding for executor/scheduler unit tests: a scheduler wired
//! to `FakeJobAdapter`/`FakeClock`, plus a `TaskContext` built the same way
//! `Scheduler::dispatch_one` builds one, so an executor's `execute` can be
//! called directly without spinning up the worker loop.

use std::sync::Arc;
use std::time::Duration;

use rcab_adapters::FakeJobAdapter;
use rcab_arbiter::{NamespaceLock, TokenBucket};
use rcab_core::task::Payload;
use rcab_core::{
    Carrier, Config, FakeClock, GroupId, RetryPolicy, Task, TaskConfig, TaskState, TaskType,
    TraceId,
};
use rcab_storage::{EventBus, RecordStore, TaskStore};
use tokio_util::sync::CancellationToken;

use crate::context::TaskContext;
use crate::scheduler::Scheduler;

pub fn task_config(task_type: TaskType, payload: Payload) -> TaskConfig {
    task_config_with_parent(task_type, payload, None)
}

pub fn task_config_with_parent(
    task_type: TaskType,
    payload: Payload,
    parent_task_id: Option<rcab_core::TaskId>,
) -> TaskConfig {
    TaskConfig {
        task_type,
        immediate: true,
        execute_time_epoch_ms: None,
        cron_expr: None,
        retry_policy: RetryPolicy::default(),
        payload,
        trace_id: TraceId::new(),
        group_id: GroupId::new(),
        parent_task_id,
        project_id: "proj-1".into(),
        user_id: "user-1".into(),
        trace_carrier: Carrier::default(),
        group_carrier: Carrier::default(),
    }
}

/// A scheduler wired to fakes, plus the handles tests assert against.
pub struct Harness {
    pub scheduler: Arc<Scheduler<FakeJobAdapter, FakeClock>>,
    pub adapter: Arc<FakeJobAdapter>,
    pub clock: FakeClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let config = Arc::new(config);
        let clock = FakeClock::new();
        let store = Arc::new(TaskStore::new());
        let records = Arc::new(RecordStore::new());
        let bus = Arc::new(EventBus::new(
            clock.clone(),
            config.event_stream_max_len,
            config.event_payload_max_bytes,
        ));
        let namespace_lock = Arc::new(NamespaceLock::new(clock.clone()));
        let token_bucket = Arc::new(TokenBucket::new(clock.clone(), config.token_bucket_capacity));
        let adapter = Arc::new(FakeJobAdapter::new());
        let scheduler = Scheduler::new(
            store,
            records,
            bus,
            namespace_lock,
            token_bucket,
            Arc::clone(&adapter),
            config,
            clock.clone(),
        );
        Self { scheduler, adapter, clock }
    }

    /// Persists `config` as a fresh task already transitioned to RUNNING,
    /// the state an executor always observes its task in (spec.md §4.4
    /// dispatch transitions PENDING -> RUNNING before calling `execute`).
    pub fn admit(&self, config: TaskConfig) -> Task {
        let now = self.clock.epoch_ms();
        let task = Task::new(config, now);
        self.scheduler.store().create_task(task.clone()).expect("create_task");
        self.scheduler
            .store()
            .update_task_state(task.id, TaskState::Running, None, now)
            .expect("pending -> running")
    }

    /// Builds the `TaskContext` an executor receives for any task, with an
    /// ample deadline and a fresh, unlinked cancellation token.
    pub fn context(&self) -> TaskContext<FakeJobAdapter, FakeClock> {
        TaskContext {
            store: Arc::clone(self.scheduler.store()),
            records: Arc::clone(self.scheduler.records()),
            bus: Arc::clone(self.scheduler.bus()),
            namespace_lock: Arc::clone(self.scheduler.namespace_lock()),
            token_bucket: Arc::clone(self.scheduler.token_bucket()),
            adapter: Arc::clone(self.scheduler.adapter()),
            config: Arc::clone(self.scheduler.config()),
            clock: self.clock.clone(),
            scheduler: Arc::clone(&self.scheduler),
            cancel: CancellationToken::new(),
            deadline: tokio::time::Instant::now() + Duration::from_secs(300),
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
