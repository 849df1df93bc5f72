// SPDX-License-Identifier: MIT

//! Task: the unit of scheduled work (spec.md §3 "Task", §4.3 state machine).

use crate::carrier::Carrier;
use crate::group::GroupId;
use crate::trace::TraceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a task. Stable for the task's entire lifetime.
    pub struct TaskId("tsk");
}

/// The six task types named in spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    InjectFault,
    BuildDataset,
    RunAlgorithm,
    CollectResult,
    BuildImage,
    RestartPedestal,
}

crate::simple_display! {
    TaskType {
        InjectFault => "INJECT_FAULT",
        BuildDataset => "BUILD_DATASET",
        RunAlgorithm => "RUN_ALGORITHM",
        CollectResult => "COLLECT_RESULT",
        BuildImage => "BUILD_IMAGE",
        RestartPedestal => "RESTART_PEDESTAL",
    }
}

/// Closed task state machine (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Rescheduled,
    Error,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Error | TaskState::Cancelled)
    }

    /// Whether `to` is a legal successor of `self` under spec.md §4.3's
    /// diagram. `Rescheduled` is transient and observable only mid-move, so
    /// it is a legal source for `Pending` (the move completing) and a legal
    /// target from `Running` (fail + retry available) or `Pending` (an
    /// explicit reschedule call), but never a state a task is left resting
    /// in once a transition is durably recorded.
    pub fn can_transition_to(&self, to: TaskState) -> bool {
        use TaskState::*;
        match (self, to) {
            (Pending, Running) => true,
            (Pending, Cancelled) => true,
            (Pending, Rescheduled) => true,
            (Running, Completed) => true,
            (Running, Pending) => true, // fail + retry < max
            (Running, Error) => true, // fail + retry >= max
            (Running, Cancelled) => true,
            (Rescheduled, Pending) => true,
            (Cancelled, Cancelled) => true, // idempotent cancel of an already-cancelled task
            _ => false,
        }
    }
}

crate::simple_display! {
    TaskState {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Rescheduled => "rescheduled",
        Error => "error",
        Cancelled => "cancelled",
    }
}

/// Retry policy attached to a task (spec.md §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_sec: u64,
}

impl RetryPolicy {
    pub const DEFAULT_CEILING_SEC: u64 = 3_600;

    pub fn new(max_attempts: u32, backoff_sec: u64) -> Self {
        Self { max_attempts, backoff_sec }
    }

    /// Exponential backoff for the given restart number, capped at
    /// `DEFAULT_CEILING_SEC` (spec.md §4.4: "MUST NOT exceed 1 hour").
    pub fn backoff_for(&self, restart_num: u32) -> std::time::Duration {
        let exp = 2u64.saturating_pow(restart_num);
        let secs = self.backoff_sec.saturating_mul(exp).min(Self::DEFAULT_CEILING_SEC);
        std::time::Duration::from_secs(secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff_sec: 10 }
    }
}

/// A JSON-typed value bag, semantically a mapping of string keys to
/// JSON-typed values (spec.md §3 "opaque payload").
pub type Payload = HashMap<String, serde_json::Value>;

/// Configuration used to construct a new task.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub task_type: TaskType,
    pub immediate: bool,
    pub execute_time_epoch_ms: Option<u64>,
    pub cron_expr: Option<String>,
    pub retry_policy: RetryPolicy,
    pub payload: Payload,
    pub trace_id: TraceId,
    pub group_id: GroupId,
    pub parent_task_id: Option<TaskId>,
    pub project_id: String,
    pub user_id: String,
    pub trace_carrier: Carrier,
    pub group_carrier: Carrier,
}

/// A unit of scheduled work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_type: TaskType,
    pub immediate: bool,
    pub execute_time_epoch_ms: Option<u64>,
    pub cron_expr: Option<String>,
    pub restart_num: u32,
    pub retry_policy: RetryPolicy,
    pub payload: Payload,
    pub trace_id: TraceId,
    pub group_id: GroupId,
    pub parent_task_id: Option<TaskId>,
    pub project_id: String,
    pub user_id: String,
    pub state: TaskState,
    pub trace_carrier: Carrier,
    pub group_carrier: Carrier,
    pub created_at_epoch_ms: u64,
    pub updated_at_epoch_ms: u64,
    pub last_error: Option<String>,
}

impl Task {
    pub fn new(config: TaskConfig, created_at_epoch_ms: u64) -> Self {
        Self {
            id: TaskId::new(),
            task_type: config.task_type,
            immediate: config.immediate,
            execute_time_epoch_ms: config.execute_time_epoch_ms,
            cron_expr: config.cron_expr,
            restart_num: 0,
            retry_policy: config.retry_policy,
            payload: config.payload,
            trace_id: config.trace_id,
            group_id: config.group_id,
            parent_task_id: config.parent_task_id,
            project_id: config.project_id,
            user_id: config.user_id,
            state: TaskState::Pending,
            trace_carrier: config.trace_carrier,
            group_carrier: config.group_carrier,
            created_at_epoch_ms,
            updated_at_epoch_ms: created_at_epoch_ms,
            last_error: None,
        }
    }

    /// Whether this task is a pipeline leaf. Leaves are identified by the
    /// composer at submission time; see `rcab-composer` for `leaf_num`
    /// derivation. A task is structurally a leaf here if it is the type that
    /// never enqueues a successor in the happy path (spec.md §4.5):
    /// COLLECT_RESULT always closes its pipeline; BUILD_IMAGE and
    /// RESTART_PEDESTAL are standalone maintenance operations with no
    /// downstream task of their own. RUN_ALGORITHM is conditionally a leaf
    /// (a detector run that found no anomalies still runs its COLLECT_RESULT,
    /// which is the leaf), so that case is decided by the executor, not this
    /// type.
    pub fn is_unconditional_leaf(&self) -> bool {
        matches!(self.task_type, TaskType::CollectResult | TaskType::BuildImage | TaskType::RestartPedestal)
    }
}

/// Helpers for reading typed values out of a JSON payload bag.
///
/// JSON integers arrive as 64-bit floats (spec.md §4.5 edge case): these
/// helpers centralize the "reject non-positive, reject fractional where an
/// integer is required" validation so every executor applies it the same
/// way instead of re-deriving it at each call site.
pub mod payload {
    use super::Payload;

    #[derive(Debug, Clone, thiserror::Error)]
    pub enum PayloadError {
        #[error("missing required field `{0}`")]
        Missing(String),
        #[error("field `{0}` must be a positive integer, got {1}")]
        NotPositiveInteger(String, serde_json::Value),
        #[error("field `{0}` must be a string, got {1}")]
        NotString(String, serde_json::Value),
    }

    /// Read a field that must be a positive integer duration in seconds.
    /// Rejects non-positive and fractional values per spec.md §4.5.
    pub fn positive_int_secs(payload: &Payload, key: &str) -> Result<u64, PayloadError> {
        let value = payload.get(key).ok_or_else(|| PayloadError::Missing(key.to_string()))?;
        let f = value.as_f64().ok_or_else(|| {
            PayloadError::NotPositiveInteger(key.to_string(), value.clone())
        })?;
        if f <= 0.0 || f.fract() != 0.0 {
            return Err(PayloadError::NotPositiveInteger(key.to_string(), value.clone()));
        }
        Ok(f as u64)
    }

    pub fn string(payload: &Payload, key: &str) -> Result<String, PayloadError> {
        let value = payload.get(key).ok_or_else(|| PayloadError::Missing(key.to_string()))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PayloadError::NotString(key.to_string(), value.clone()))
    }

    pub fn optional_string(payload: &Payload, key: &str) -> Option<String> {
        payload.get(key).and_then(|v| v.as_str()).map(str::to_string)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
