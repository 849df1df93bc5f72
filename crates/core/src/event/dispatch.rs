// SPDX-License-Identifier: MIT

//! Event dispatch helpers — name lookup and id extraction.

use super::Event;
use crate::task::TaskId;
use crate::trace::TraceId;

pub(super) fn name(event: &Event) -> &'static str {
    match event {
        Event::TaskPending { .. } => "task:pending",
        Event::TaskRunning { .. } => "task:running",
        Event::TaskCompleted { .. } => "task:completed",
        Event::TaskRescheduled { .. } => "task:rescheduled",
        Event::TaskError { .. } => "task:error",
        Event::TaskCancelled { .. } => "task:cancelled",
        Event::JobAdded { .. } => "job:added",
        Event::JobSucceeded { .. } => "job:succeeded",
        Event::JobFailed { .. } => "job:failed",
        Event::FaultInjectionStarted { .. } => "fault_injection_started",
        Event::FaultInjectionCompleted { .. } => "fault_injection_completed",
        Event::FaultInjectionFailed { .. } => "fault_injection_failed",
        Event::DatapackBuildSucceed { .. } => "datapack_build_succeed",
        Event::DatapackBuildFailed { .. } => "datapack_build_failed",
        Event::AlgoRunSucceed { .. } => "algo_run_succeed",
        Event::AlgoRunFailed { .. } => "algo_run_failed",
        Event::DatapackResultCollection { .. } => "datapack_result_collection",
        Event::DatapackNoAnomaly { .. } => "datapack_no_anomaly",
        Event::DatapackNoDetectorData { .. } => "datapack_no_detector_data",
        Event::AlgoResultCollection { .. } => "algo_result_collection",
        Event::AlgoNoResultData { .. } => "algo_no_result_data",
        Event::ImageBuildSucceed { .. } => "image_build_succeed",
        Event::ImageBuildFailed { .. } => "image_build_failed",
        Event::PedestalRestarted { .. } => "pedestal_restarted",
        Event::NoTokenAvailable { .. } => "no_token_available",
        Event::NamespaceLockWait { .. } => "namespace_lock_wait",
        Event::LeaseForceReclaimed { .. } => "lease_force_reclaimed",
        Event::TraceCompleted { .. } => "trace:completed",
        Event::TraceFailed { .. } => "trace:failed",
        Event::TraceCancelled { .. } => "trace:cancelled",
        Event::Custom => "custom",
    }
}

pub(super) fn task_id(event: &Event) -> Option<TaskId> {
    match event {
        Event::TaskPending { task_id, .. }
        | Event::TaskRunning { task_id, .. }
        | Event::TaskCompleted { task_id, .. }
        | Event::TaskRescheduled { task_id, .. }
        | Event::TaskError { task_id, .. }
        | Event::TaskCancelled { task_id, .. }
        | Event::JobAdded { task_id, .. }
        | Event::JobSucceeded { task_id, .. }
        | Event::JobFailed { task_id, .. }
        | Event::FaultInjectionStarted { task_id, .. }
        | Event::FaultInjectionCompleted { task_id, .. }
        | Event::FaultInjectionFailed { task_id, .. }
        | Event::DatapackBuildSucceed { task_id, .. }
        | Event::DatapackBuildFailed { task_id, .. }
        | Event::AlgoRunSucceed { task_id, .. }
        | Event::AlgoRunFailed { task_id, .. }
        | Event::DatapackResultCollection { task_id, .. }
        | Event::DatapackNoAnomaly { task_id }
        | Event::DatapackNoDetectorData { task_id }
        | Event::AlgoResultCollection { task_id, .. }
        | Event::AlgoNoResultData { task_id, .. }
        | Event::ImageBuildSucceed { task_id, .. }
        | Event::ImageBuildFailed { task_id, .. }
        | Event::PedestalRestarted { task_id, .. }
        | Event::NoTokenAvailable { task_id, .. }
        | Event::NamespaceLockWait { task_id, .. } => Some(*task_id),
        Event::LeaseForceReclaimed { task_id, .. } => Some(*task_id),
        Event::TraceCompleted { .. } | Event::TraceFailed { .. } | Event::TraceCancelled { .. } => {
            None
        }
        Event::Custom => None,
    }
}

pub(super) fn trace_id(event: &Event) -> Option<TraceId> {
    match event {
        Event::TaskPending { trace_id, .. }
        | Event::TaskRunning { trace_id, .. }
        | Event::TaskCompleted { trace_id, .. }
        | Event::TaskRescheduled { trace_id, .. }
        | Event::TaskError { trace_id, .. }
        | Event::TaskCancelled { trace_id, .. }
        | Event::NoTokenAvailable { trace_id, .. }
        | Event::NamespaceLockWait { trace_id, .. } => Some(*trace_id),
        Event::TraceCompleted { trace_id, .. }
        | Event::TraceFailed { trace_id, .. }
        | Event::TraceCancelled { trace_id, .. } => Some(*trace_id),
        _ => None,
    }
}
