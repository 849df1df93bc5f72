// SPDX-License-Identifier: MIT

//! The Scheduler (spec.md §4.4, component C4): ready/delayed/cron queues,
//! admission, dispatch to a bounded worker pool, retry/reschedule.
//! Generic over the adapter and clock so production and test code share
//! the same dispatch logic against different backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use rcab_adapters::JobAdapter;
use rcab_arbiter::{NamespaceLock, TokenBucket};
use rcab_core::{Clock, Config, Event, Task, TaskConfig, TaskId, TaskState, TaskType, TraceId};
use rcab_storage::{EventBus, RecordStore, TaskStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::context::{deadline_for, TaskContext};
use crate::error::SchedulerError;
use crate::executor::{ExecOutcome, Executor};
use crate::executors::dispatch::ExecutorRegistry;
use crate::queues::{CronRegistry, DelayedQueue};
use crate::trace_finalize::finalize_trace;

/// Default reschedule window for transient failures (spec.md §4.4
/// "default 1–5 minutes").
pub const DEFAULT_RESCHEDULE_RANGE: (Duration, Duration) =
    (Duration::from_secs(60), Duration::from_secs(5 * 60));

/// Per-task cancellation handles, keyed so `cancel(task_id)` reaches a
/// RUNNING task's cooperative cancellation signal (spec.md §5
/// "Cancellation").
#[derive(Default)]
struct RunningTokens {
    tokens: Mutex<HashMap<TaskId, CancellationToken>>,
}

impl RunningTokens {
    fn register(&self, task_id: TaskId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.lock().insert(task_id, token.clone());
        token
    }

    fn remove(&self, task_id: TaskId) {
        self.tokens.lock().remove(&task_id);
    }

    fn cancel(&self, task_id: TaskId) -> bool {
        if let Some(token) = self.tokens.lock().get(&task_id) {
            token.cancel();
            true
        } else {
            false
        }
    }
}

/// The scheduler: owns the ready channel and the delayed/cron drivers, and
/// is itself handed to executors (through `TaskContext`) so an executor can
/// call back into `reschedule`/`submit` for the next task in its pipeline.
pub struct Scheduler<A: JobAdapter, C: Clock> {
    store: Arc<TaskStore>,
    records: Arc<RecordStore>,
    bus: Arc<EventBus<C>>,
    namespace_lock: Arc<NamespaceLock<C>>,
    token_bucket: Arc<TokenBucket<C>>,
    adapter: Arc<A>,
    config: Arc<Config>,
    clock: C,
    ready_tx: mpsc::UnboundedSender<TaskId>,
    ready_rx: Mutex<Option<mpsc::UnboundedReceiver<TaskId>>>,
    delayed: Arc<DelayedQueue>,
    cron: Arc<CronRegistry>,
    running: RunningTokens,
    cancel_all: CancellationToken,
}

impl<A: JobAdapter, C: Clock> Scheduler<A, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<TaskStore>,
        records: Arc<RecordStore>,
        bus: Arc<EventBus<C>>,
        namespace_lock: Arc<NamespaceLock<C>>,
        token_bucket: Arc<TokenBucket<C>>,
        adapter: Arc<A>,
        config: Arc<Config>,
        clock: C,
    ) -> Arc<Self> {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            store,
            records,
            bus,
            namespace_lock,
            token_bucket,
            adapter,
            config,
            clock,
            ready_tx,
            ready_rx: Mutex::new(Some(ready_rx)),
            delayed: Arc::new(DelayedQueue::new()),
            cron: Arc::new(CronRegistry::new()),
            running: RunningTokens::default(),
            cancel_all: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }

    pub fn bus(&self) -> &Arc<EventBus<C>> {
        &self.bus
    }

    pub fn namespace_lock(&self) -> &Arc<NamespaceLock<C>> {
        &self.namespace_lock
    }

    pub fn token_bucket(&self) -> &Arc<TokenBucket<C>> {
        &self.token_bucket
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Persists the task, assigns enqueue target per its flags, and
    /// publishes the PENDING event (spec.md §4.4 `submit`).
    ///
    /// A config with `cron_expr` set is registered with the cron driver
    /// instead (see [`Scheduler::register_cron`]) — cron firings produce
    /// their own fresh task through this same store/enqueue path, so a
    /// template itself is never a task in its own right.
    pub fn submit(&self, config: TaskConfig, now_epoch_ms: u64) -> Result<Task, SchedulerError> {
        debug_assert!(config.cron_expr.is_none(), "cron templates go through register_cron");
        let task = Task::new(config, now_epoch_ms);
        self.store.create_task(task.clone())?;
        self.bus.append(
            task.trace_id,
            Event::TaskPending { task_id: task.id, trace_id: task.trace_id },
            None,
        );
        self.enqueue(&task);
        Ok(task)
    }

    /// Registers a periodic task template (spec.md §4.4 "cron"); each
    /// firing produces a fresh task via `submit_cron_fire`.
    pub fn register_cron(&self, config: TaskConfig, now_epoch_ms: u64) -> Result<(), SchedulerError> {
        let cron_expr =
            config.cron_expr.clone().ok_or_else(|| SchedulerError::InvalidCron(String::new(), "missing cron_expr".into()))?;
        self.cron.register(&cron_expr, config, now_epoch_ms)
    }

    fn enqueue(&self, task: &Task) {
        if task.immediate {
            let _ = self.ready_tx.send(task.id);
        } else {
            let execute_time = task.execute_time_epoch_ms.unwrap_or(task.created_at_epoch_ms);
            self.delayed.push(task.id, execute_time);
        }
    }

    /// Marks a task CANCELLED. If it is RUNNING, the executor's cooperative
    /// cancellation token is fired (spec.md §4.4 `cancel`, §5
    /// "Cancellation"). A cancellation after the job has already succeeded
    /// is a no-op because the task is already terminal by then.
    pub fn cancel(&self, task_id: TaskId, now_epoch_ms: u64) -> Result<(), SchedulerError> {
        let task = self.store.get_task(task_id)?;
        if task.state.is_terminal() {
            return Ok(());
        }

        if task.state == TaskState::Running {
            self.running.cancel(task_id);
        }

        let updated = self.store.update_task_state(task_id, TaskState::Cancelled, None, now_epoch_ms)?;
        self.bus.append(
            updated.trace_id,
            Event::TaskCancelled { task_id, trace_id: updated.trace_id },
            None,
        );
        finalize_trace(&self.store, &self.bus, updated.trace_id);
        Ok(())
    }

    /// Cancels every non-terminal task of a trace and marks the trace itself
    /// CANCELLED. Unlike a single task's `cancel`, this always closes the
    /// trace even if it has no more leaves left to reach naturally.
    pub fn cancel_trace(&self, trace_id: TraceId, now_epoch_ms: u64) -> Result<(), SchedulerError> {
        let (_trace, tasks) = self.store.get_trace(trace_id)?;
        for task in tasks.iter().filter(|t| !t.state.is_terminal()) {
            self.cancel(task.id, now_epoch_ms)?;
        }
        let trace = self.store.cancel_trace(trace_id, now_epoch_ms)?;
        self.bus.append(
            trace_id,
            Event::TraceCancelled { trace_id, group_id: trace.group_id },
            Some("trace-terminal"),
        );
        Ok(())
    }

    /// Picks a uniformly random delay inside `range`, updates
    /// `execute_time`, increments `restart_num`, and moves the task back
    /// through RESCHEDULED to PENDING (spec.md §4.4 `reschedule`). Used by
    /// executors on transient failure (no token, namespace busy).
    pub fn reschedule(
        &self,
        task_id: TaskId,
        range: (Duration, Duration),
        now_epoch_ms: u64,
    ) -> Result<Task, SchedulerError> {
        let (lo, hi) = range;
        let delay_ms = if hi <= lo {
            lo.as_millis() as u64
        } else {
            rand::thread_rng().gen_range(lo.as_millis() as u64..=hi.as_millis() as u64)
        };
        let execute_time_epoch_ms = now_epoch_ms + delay_ms;

        let task = self.store.reschedule_task(task_id, execute_time_epoch_ms, now_epoch_ms)?;
        self.bus.append(
            task.trace_id,
            Event::TaskRescheduled {
                task_id,
                trace_id: task.trace_id,
                execute_time_epoch_ms,
                restart_num: task.restart_num,
            },
            None,
        );
        self.delayed.push(task_id, execute_time_epoch_ms);
        Ok(task)
    }

    /// Applies the retry policy on executor failure (spec.md §4.4 "Retry
    /// policy", §7): backoff capped at `retry_backoff_ceiling_secs` (MUST
    /// NOT exceed 1 hour), or ERROR once attempts are exhausted.
    pub(crate) fn apply_retry(
        &self,
        task: &Task,
        message: String,
        now_epoch_ms: u64,
    ) -> Result<(), SchedulerError> {
        if task.restart_num < task.retry_policy.max_attempts {
            let backoff = task.retry_policy.backoff_for(task.restart_num);
            let ceiling = Duration::from_secs(self.config.retry_backoff_ceiling_secs);
            let backoff = backoff.min(ceiling);
            let execute_time_epoch_ms = now_epoch_ms + backoff.as_millis() as u64;
            let task = self.store.reschedule_task(task.id, execute_time_epoch_ms, now_epoch_ms)?;
            self.bus.append(
                task.trace_id,
                Event::TaskRescheduled {
                    task_id: task.id,
                    trace_id: task.trace_id,
                    execute_time_epoch_ms,
                    restart_num: task.restart_num,
                },
                None,
            );
            self.delayed.push(task.id, execute_time_epoch_ms);
        } else {
            let task =
                self.store.update_task_state(task.id, TaskState::Error, Some(message.clone()), now_epoch_ms)?;
            self.bus.append(
                task.trace_id,
                Event::TaskError { task_id: task.id, trace_id: task.trace_id, message },
                None,
            );
            if task.task_type == TaskType::RunAlgorithm {
                self.store.mark_conditional_leaf_terminal(task.id, task.trace_id, true, now_epoch_ms);
            }
            finalize_trace(&self.store, &self.bus, task.trace_id);
        }
        Ok(())
    }

    /// Runs the worker pool, delayed-queue driver, and cron driver until
    /// `shutdown` fires. Each worker pulls from the ready channel and hands
    /// the task to the executor matching its type.
    pub async fn run(
        self: &Arc<Self>,
        registry: Arc<ExecutorRegistry<A, C>>,
        shutdown: CancellationToken,
    ) {
        let ready_rx = match self.ready_rx.lock().take() {
            Some(rx) => rx,
            None => {
                tracing::error!("Scheduler::run called more than once, ignoring");
                return;
            }
        };

        let delayed_handle = {
            let delayed = Arc::clone(&self.delayed);
            let clock = self.clock.clone();
            let ready_tx = self.ready_tx.clone();
            let cancel = self.cancel_all.clone();
            tokio::spawn(async move { delayed.run(&clock, ready_tx, cancel).await })
        };

        let cron_handle = {
            let cron = Arc::clone(&self.cron);
            let clock = self.clock.clone();
            let this = Arc::clone(self);
            let cancel = self.cancel_all.clone();
            let (fire_tx, mut fire_rx) = mpsc::unbounded_channel();
            let driver = tokio::spawn(async move { cron.run(&clock, fire_tx, cancel).await });
            let submitter = tokio::spawn(async move {
                while let Some(config) = fire_rx.recv().await {
                    let now = this.clock.epoch_ms();
                    if let Err(err) = this.submit_cron_fire(config, now) {
                        tracing::warn!(error = %err, "cron fire failed to submit");
                    }
                }
            });
            (driver, submitter)
        };

        let callback_handle = {
            let this = Arc::clone(self);
            let cancel = self.cancel_all.clone();
            tokio::spawn(async move { crate::executors::callback_router::run(this, cancel).await })
        };

        let pool_size = self.config.worker_pool_size.max(1);
        let mut workers = tokio::task::JoinSet::new();
        let shared_rx = Arc::new(tokio::sync::Mutex::new(ready_rx));

        for _ in 0..pool_size {
            let this = Arc::clone(self);
            let registry = Arc::clone(&registry);
            let shared_rx = Arc::clone(&shared_rx);
            let cancel = self.cancel_all.clone();
            workers.spawn(async move {
                this.worker_loop(registry, shared_rx, cancel).await;
            });
        }

        shutdown.cancelled().await;

        self.cancel_all.cancel();
        let _ = delayed_handle.await;
        let _ = cron_handle.0.await;
        let _ = cron_handle.1.await;
        let _ = callback_handle.await;
        while workers.join_next().await.is_some() {}
    }

    fn submit_cron_fire(&self, config: TaskConfig, now_epoch_ms: u64) -> Result<(), SchedulerError> {
        let task = Task::new(config, now_epoch_ms);
        self.store.create_task(task.clone())?;
        self.bus.append(
            task.trace_id,
            Event::TaskPending { task_id: task.id, trace_id: task.trace_id },
            None,
        );
        self.enqueue(&task);
        Ok(())
    }

    async fn worker_loop(
        self: Arc<Self>,
        registry: Arc<ExecutorRegistry<A, C>>,
        shared_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<TaskId>>>,
        cancel: CancellationToken,
    ) {
        loop {
            let task_id = {
                let mut rx = shared_rx.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    recv = rx.recv() => match recv {
                        Some(id) => id,
                        None => return,
                    },
                }
            };
            self.dispatch_one(&registry, task_id, &cancel).await;
        }
    }

    /// Dispatches one ready task id to the executor matching its type.
    /// Cancellation is resolved here, at dispatch time (spec.md §4.4: "a
    /// task whose state has become CANCELLED is dropped on take").
    async fn dispatch_one(
        self: &Arc<Self>,
        registry: &ExecutorRegistry<A, C>,
        task_id: TaskId,
        shutdown: &CancellationToken,
    ) {
        let task = match self.store.get_task(task_id) {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(%task_id, error = %err, "dispatch: task vanished from store");
                return;
            }
        };

        if task.state.is_terminal() {
            return;
        }
        if task.state != TaskState::Pending {
            return;
        }

        let now = self.clock.epoch_ms();
        let task = match self.store.update_task_state(task_id, TaskState::Running, None, now) {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(%task_id, error = %err, "dispatch: illegal transition to running");
                return;
            }
        };
        self.bus.append(
            task.trace_id,
            Event::TaskRunning { task_id, trace_id: task.trace_id },
            None,
        );

        let task_cancel = self.running.register(task_id);
        let combined = task_cancel.child_token();
        let deadline = tokio::time::Instant::now() + deadline_for(task.task_type);

        let ctx = TaskContext {
            store: Arc::clone(&self.store),
            records: Arc::clone(&self.records),
            bus: Arc::clone(&self.bus),
            namespace_lock: Arc::clone(&self.namespace_lock),
            token_bucket: Arc::clone(&self.token_bucket),
            adapter: Arc::clone(&self.adapter),
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
            scheduler: Arc::clone(self),
            cancel: combined,
            deadline,
        };

        let executor = registry.for_type(task.task_type);
        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                self.running.remove(task_id);
                return;
            }
            _ = tokio::time::sleep_until(deadline) => {
                Err(crate::error::ExecutorError::Transient("deadline exceeded".into()))
            }
            result = executor.execute(&ctx, &task) => result,
        };

        self.running.remove(task_id);
        let now = self.clock.epoch_ms();

        match result {
            Ok(ExecOutcome::Completed) => {
                if let Ok(updated) =
                    self.store.update_task_state(task_id, TaskState::Completed, None, now)
                {
                    self.bus.append(
                        updated.trace_id,
                        Event::TaskCompleted { task_id, trace_id: updated.trace_id },
                        None,
                    );
                    finalize_trace(&self.store, &self.bus, updated.trace_id);
                }
            }
            Ok(ExecOutcome::AwaitingCallback) => {
                // Stays RUNNING; the Job Adapter's lifecycle callback drives
                // the next transition (spec.md §5 "waits for job completion
                // are not in-worker").
            }
            Ok(ExecOutcome::Rescheduled) => {
                // The executor already moved the task to PENDING and emitted
                // its own event (namespace busy / no token available).
            }
            Err(err) => {
                if ctx_was_cancelled(&task, self) {
                    // Cancellation received mid-execution: cancel() already
                    // recorded CANCELLED; skip retries (spec.md §5).
                    return;
                }
                match err {
                    crate::error::ExecutorError::Validation(msg) => {
                        if self
                            .store
                            .update_task_state(task_id, TaskState::Error, Some(msg.clone()), now)
                            .is_ok()
                        {
                            self.bus.append(
                                task.trace_id,
                                Event::TaskError { task_id, trace_id: task.trace_id, message: msg },
                                None,
                            );
                            if task.task_type == TaskType::RunAlgorithm {
                                self.store.mark_conditional_leaf_terminal(
                                    task_id,
                                    task.trace_id,
                                    true,
                                    now,
                                );
                            }
                            finalize_trace(&self.store, &self.bus, task.trace_id);
                        }
                    }
                    crate::error::ExecutorError::Permanent(msg) => {
                        if self
                            .store
                            .update_task_state(task_id, TaskState::Error, Some(msg.clone()), now)
                            .is_ok()
                        {
                            self.bus.append(
                                task.trace_id,
                                Event::TaskError { task_id, trace_id: task.trace_id, message: msg },
                                None,
                            );
                            if task.task_type == TaskType::RunAlgorithm {
                                self.store.mark_conditional_leaf_terminal(
                                    task_id,
                                    task.trace_id,
                                    true,
                                    now,
                                );
                            }
                            finalize_trace(&self.store, &self.bus, task.trace_id);
                        }
                    }
                    crate::error::ExecutorError::Transient(msg)
                    | crate::error::ExecutorError::JobFailed(msg)
                    | crate::error::ExecutorError::Infra(msg) => {
                        if let Err(apply_err) = self.apply_retry(&task, msg, now) {
                            tracing::warn!(%task_id, error = %apply_err, "retry application failed");
                        }
                    }
                }
            }
        }
    }
}

fn ctx_was_cancelled<A: JobAdapter, C: Clock>(task: &Task, scheduler: &Scheduler<A, C>) -> bool {
    scheduler
        .store
        .get_task(task.id)
        .map(|t| t.state == TaskState::Cancelled)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
