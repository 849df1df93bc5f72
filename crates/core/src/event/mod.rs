// SPDX-License-Identifier: MIT

//! Event vocabulary for the control plane (spec.md §3 "Event", §4.1 Event
//! Bus). Every state transition the system makes is first turned into one
//! of these, appended to the trace's stream, and only then folded into
//! queryable state, an event-sourcing discipline applied to this domain's
//! closed vocabulary: task-status updates, orchestrator-job lifecycle,
//! fault-injection lifecycle, datapack build lifecycle, algorithm run
//! lifecycle, collection outcomes, and rate-limiter wait/no-token.

mod dispatch;

use crate::group::GroupId;
use crate::records::ExecutionId;
use crate::task::{TaskId, TaskType};
use crate::trace::TraceId;
use serde::{Deserialize, Serialize};

/// A closed, tagged event. Serializes as `{"type": "event:name", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- task status --
    #[serde(rename = "task:pending")]
    TaskPending { task_id: TaskId, trace_id: TraceId },

    #[serde(rename = "task:running")]
    TaskRunning { task_id: TaskId, trace_id: TraceId },

    #[serde(rename = "task:completed")]
    TaskCompleted { task_id: TaskId, trace_id: TraceId },

    #[serde(rename = "task:rescheduled")]
    TaskRescheduled {
        task_id: TaskId,
        trace_id: TraceId,
        execute_time_epoch_ms: u64,
        restart_num: u32,
    },

    #[serde(rename = "task:error")]
    TaskError { task_id: TaskId, trace_id: TraceId, message: String },

    #[serde(rename = "task:cancelled")]
    TaskCancelled { task_id: TaskId, trace_id: TraceId },

    // -- orchestrator job lifecycle (spec.md §4.6) --
    #[serde(rename = "job:added")]
    JobAdded { task_id: TaskId, job_name: String },

    #[serde(rename = "job:succeeded")]
    JobSucceeded { task_id: TaskId, job_name: String },

    #[serde(rename = "job:failed")]
    JobFailed { task_id: TaskId, job_name: String, reason: String },

    // -- fault injection lifecycle --
    #[serde(rename = "fault_injection_started")]
    FaultInjectionStarted { task_id: TaskId, namespace: String, benchmark: String },

    #[serde(rename = "fault_injection_completed")]
    FaultInjectionCompleted { task_id: TaskId, namespace: String },

    #[serde(rename = "fault_injection_failed")]
    FaultInjectionFailed { task_id: TaskId, namespace: String, reason: String },

    // -- datapack build lifecycle --
    #[serde(rename = "datapack_build_succeed")]
    DatapackBuildSucceed { task_id: TaskId, dataset_id: String },

    #[serde(rename = "datapack_build_failed")]
    DatapackBuildFailed { task_id: TaskId, reason: String },

    // -- algorithm run lifecycle --
    #[serde(rename = "algo_run_succeed")]
    AlgoRunSucceed { task_id: TaskId, execution_id: ExecutionId },

    #[serde(rename = "algo_run_failed")]
    AlgoRunFailed { task_id: TaskId, execution_id: ExecutionId, reason: String },

    // -- collection outcomes --
    #[serde(rename = "datapack_result_collection")]
    DatapackResultCollection { task_id: TaskId, anomalies: u32 },

    #[serde(rename = "datapack_no_anomaly")]
    DatapackNoAnomaly { task_id: TaskId },

    #[serde(rename = "datapack_no_detector_data")]
    DatapackNoDetectorData { task_id: TaskId },

    #[serde(rename = "algo_result_collection")]
    AlgoResultCollection { task_id: TaskId, execution_id: ExecutionId },

    #[serde(rename = "algo_no_result_data")]
    AlgoNoResultData { task_id: TaskId, execution_id: ExecutionId },

    // -- build image / pedestal --
    #[serde(rename = "image_build_succeed")]
    ImageBuildSucceed { task_id: TaskId, image_ref: String },

    #[serde(rename = "image_build_failed")]
    ImageBuildFailed { task_id: TaskId, reason: String },

    #[serde(rename = "pedestal_restarted")]
    PedestalRestarted { task_id: TaskId, namespace: String, helm_release: String },

    // -- resource arbiter --
    #[serde(rename = "no_token_available")]
    NoTokenAvailable { task_id: TaskId, trace_id: TraceId, category: String },

    #[serde(rename = "namespace_lock_wait")]
    NamespaceLockWait { task_id: TaskId, trace_id: TraceId, namespace: String },

    #[serde(rename = "lease_force_reclaimed")]
    LeaseForceReclaimed { task_id: TaskId, trace_id: TraceId, category: String },

    // -- trace / group --
    #[serde(rename = "trace:completed")]
    TraceCompleted { trace_id: TraceId, group_id: GroupId },

    #[serde(rename = "trace:failed")]
    TraceFailed { trace_id: TraceId, group_id: GroupId },

    #[serde(rename = "trace:cancelled")]
    TraceCancelled { trace_id: TraceId, group_id: GroupId },

    /// Unknown type tags deserialize here instead of failing, so forward
    /// compatibility doesn't break replay of an older stream against a
    /// newer binary.
    #[serde(other)]
    Custom,
}

impl Event {
    pub fn task_id(&self) -> Option<TaskId> {
        dispatch::task_id(self)
    }

    pub fn trace_id(&self) -> Option<TraceId> {
        dispatch::trace_id(self)
    }

    pub fn name(&self) -> &'static str {
        dispatch::name(self)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
