// SPDX-License-Identifier: MIT

//! Task/trace/group materialized state (spec.md §4.3 "Task Store").
//!
//! Transitions are compare-and-set on `(task_id, expected_previous_state)`
//! (spec.md §5 "Ordering guarantees"), implemented here as a single
//! `parking_lot::Mutex`-guarded map check-then-write rather than an actual
//! CAS primitive, since all access already funnels through one lock.

use crate::error::StorageError;
use rcab_core::{Group, GroupId, Task, TaskId, TaskState, TaskType, Trace, TraceId, TraceState};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MaterializedState {
    tasks: HashMap<TaskId, Task>,
    traces: HashMap<TraceId, Trace>,
    groups: HashMap<GroupId, Group>,
    trace_task_order: HashMap<TraceId, Vec<TaskId>>,
}

/// A page-size the listing API accepts (spec.md §6: `size ∈ {10, 20, 50}`).
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
}

impl Pagination {
    pub fn new(page: u32, size: u32) -> Result<Self, StorageError> {
        if ![10, 20, 50].contains(&size) {
            return Err(StorageError::InvalidPageSize(size));
        }
        Ok(Self { page, size })
    }
}

/// Filters for `list_tasks` (spec.md §4.3, §6).
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub task_type: Option<TaskType>,
    pub state: Option<TaskState>,
    pub trace_id: Option<TraceId>,
    pub group_id: Option<GroupId>,
    pub project_id: Option<String>,
    pub immediate: Option<bool>,
    pub created_after_epoch_ms: Option<u64>,
    pub created_before_epoch_ms: Option<u64>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        if let Some(task_type) = self.task_type {
            if task.task_type != task_type {
                return false;
            }
        }
        if let Some(state) = self.state {
            if task.state != state {
                return false;
            }
        }
        if let Some(trace_id) = self.trace_id {
            if task.trace_id != trace_id {
                return false;
            }
        }
        if let Some(group_id) = self.group_id {
            if task.group_id != group_id {
                return false;
            }
        }
        if let Some(project_id) = &self.project_id {
            if &task.project_id != project_id {
                return false;
            }
        }
        if let Some(immediate) = self.immediate {
            if task.immediate != immediate {
                return false;
            }
        }
        if let Some(after) = self.created_after_epoch_ms {
            if task.created_at_epoch_ms < after {
                return false;
            }
        }
        if let Some(before) = self.created_before_epoch_ms {
            if task.created_at_epoch_ms >= before {
                return false;
            }
        }
        true
    }
}

/// CRUD plus status transitions for Task/Trace/Group (spec.md §4.3).
pub struct TaskStore {
    state: Mutex<MaterializedState>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self { state: Mutex::new(MaterializedState::default()) }
    }

    pub fn create_group(&self, group: Group) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.groups.entry(group.id).or_insert(group);
        Ok(())
    }

    pub fn create_trace(&self, trace: Trace) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.trace_task_order.entry(trace.id).or_default();
        state.traces.entry(trace.id).or_insert(trace);
        Ok(())
    }

    /// Persists a new task; rejects if `task_id` already exists (spec.md
    /// §4.3, and §8's "re-submitting an identical task id is rejected").
    pub fn create_task(&self, task: Task) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if state.tasks.contains_key(&task.id) {
            return Err(StorageError::TaskAlreadyExists(task.id));
        }
        state.trace_task_order.entry(task.trace_id).or_default().push(task.id);
        if let Some(trace) = state.traces.get_mut(&task.trace_id) {
            trace.record_task(task.id);
        }
        state.tasks.insert(task.id, task);
        Ok(())
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Task, StorageError> {
        let state = self.state.lock();
        state.tasks.get(&task_id).cloned().ok_or(StorageError::TaskNotFound(task_id))
    }

    /// Compare-and-set transition. Rejects with `TransitionInvalid` unless
    /// the task's current state legally transitions to `new_state`.
    pub fn update_task_state(
        &self,
        task_id: TaskId,
        new_state: TaskState,
        message: Option<String>,
        at_epoch_ms: u64,
    ) -> Result<Task, StorageError> {
        let mut state = self.state.lock();
        let task = state.tasks.get_mut(&task_id).ok_or(StorageError::TaskNotFound(task_id))?;

        if !task.state.can_transition_to(new_state) {
            return Err(StorageError::TransitionInvalid { task_id, from: task.state, to: new_state });
        }

        task.state = new_state;
        task.updated_at_epoch_ms = at_epoch_ms;
        if let Some(message) = message {
            task.last_error = Some(message);
        }
        let is_leaf = task.is_unconditional_leaf();
        let trace_id = task.trace_id;
        let task_snapshot = task.clone();

        if new_state.is_terminal() && is_leaf {
            if let Some(trace) = state.traces.get_mut(&trace_id) {
                trace.record_leaf_terminal(task_id, new_state == TaskState::Error, at_epoch_ms);
            }
        }

        Ok(task_snapshot)
    }

    /// Called by the scheduler on transient failure: bumps `restart_num`,
    /// updates `execute_time_epoch_ms`, and moves the task back to PENDING
    /// (spec.md §4.4 `reschedule`).
    pub fn reschedule_task(
        &self,
        task_id: TaskId,
        execute_time_epoch_ms: u64,
        at_epoch_ms: u64,
    ) -> Result<Task, StorageError> {
        let mut state = self.state.lock();
        let task = state.tasks.get_mut(&task_id).ok_or(StorageError::TaskNotFound(task_id))?;

        if !task.state.can_transition_to(TaskState::Pending) {
            return Err(StorageError::TransitionInvalid {
                task_id,
                from: task.state,
                to: TaskState::Pending,
            });
        }

        task.restart_num += 1;
        task.execute_time_epoch_ms = Some(execute_time_epoch_ms);
        task.state = TaskState::Pending;
        task.updated_at_epoch_ms = at_epoch_ms;
        Ok(task.clone())
    }

    pub fn list_tasks(
        &self,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> (Vec<Task>, usize) {
        let state = self.state.lock();
        let mut matched: Vec<&Task> = state.tasks.values().filter(|t| filter.matches(t)).collect();
        matched.sort_by_key(|t| t.created_at_epoch_ms);
        let total = matched.len();

        let start = (pagination.page as usize) * (pagination.size as usize);
        let page: Vec<Task> = matched.into_iter().skip(start).take(pagination.size as usize).cloned().collect();
        (page, total)
    }

    /// Returns the trace and every task belonging to it in insertion order.
    pub fn get_trace(&self, trace_id: TraceId) -> Result<(Trace, Vec<Task>), StorageError> {
        let state = self.state.lock();
        let trace = state.traces.get(&trace_id).cloned().ok_or(StorageError::TraceNotFound(trace_id))?;
        let tasks = state
            .trace_task_order
            .get(&trace_id)
            .map(|ids| ids.iter().filter_map(|id| state.tasks.get(id).cloned()).collect())
            .unwrap_or_default();
        Ok((trace, tasks))
    }

    pub fn cancel_trace(&self, trace_id: TraceId, at_epoch_ms: u64) -> Result<Trace, StorageError> {
        let mut state = self.state.lock();
        let trace = state.traces.get_mut(&trace_id).ok_or(StorageError::TraceNotFound(trace_id))?;
        trace.cancel(at_epoch_ms);
        Ok(trace.clone())
    }

    /// Marks a RUN_ALGORITHM task's terminal outcome as a leaf for trace
    /// accounting purposes. RUN_ALGORITHM is not an unconditional leaf
    /// (`Task::is_unconditional_leaf`) because its happy path hands off to a
    /// COLLECT_RESULT that is the true leaf; but a RUN_ALGORITHM that
    /// exhausts its retries never produces that COLLECT_RESULT, so the
    /// executor calls this explicitly to fail the trace instead of leaving
    /// it to wait on a leaf that will never arrive (spec.md §3 "RUN_ALGORITHM
    /// ... decided by the executor, not this type").
    pub fn mark_conditional_leaf_terminal(
        &self,
        task_id: TaskId,
        trace_id: TraceId,
        failed: bool,
        at_epoch_ms: u64,
    ) -> Option<TraceState> {
        let mut state = self.state.lock();
        state.traces.get_mut(&trace_id)?.record_leaf_terminal(task_id, failed, at_epoch_ms)
    }

    /// Forces a trace straight to COMPLETED regardless of how many of its
    /// declared leaves actually ran (spec.md §8 scenario 5 "detector-no-
    /// anomaly short circuit": a trace whose leaf_num anticipated follow-up
    /// algorithms that never got enqueued still ends COMPLETED). No-op if
    /// the trace is already terminal.
    pub fn short_circuit_trace_complete(
        &self,
        trace_id: TraceId,
        at_epoch_ms: u64,
    ) -> Result<Trace, StorageError> {
        let mut state = self.state.lock();
        let trace = state.traces.get_mut(&trace_id).ok_or(StorageError::TraceNotFound(trace_id))?;
        if !trace.state.is_terminal() {
            trace.state = TraceState::Completed;
            trace.ended_at_epoch_ms = Some(at_epoch_ms);
        }
        Ok(trace.clone())
    }

    pub fn get_group(&self, group_id: GroupId) -> Result<Group, StorageError> {
        let state = self.state.lock();
        state.groups.get(&group_id).cloned().ok_or(StorageError::GroupNotFound(group_id))
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
