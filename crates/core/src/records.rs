// SPDX-License-Identifier: MIT

//! Domain records produced and mutated by executors (spec.md §3 "Injection
//! Schedule", "Execution Record"; SPEC_FULL.md §3 supplements for
//! BUILD_IMAGE and RESTART_PEDESTAL).

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for an algorithm execution record.
    pub struct ExecutionId("exc");
}

/// Lifecycle status of an injection (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionStatus {
    Initial,
    InjectSuccess,
    InjectFailed,
}

crate::simple_display! {
    InjectionStatus {
        Initial => "initial",
        InjectSuccess => "inject_success",
        InjectFailed => "inject_failed",
    }
}

/// Domain record produced by the INJECT_FAULT task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionSchedule {
    pub task_id: TaskId,
    pub fault_type: String,
    pub display_config: serde_json::Value,
    /// The original engine config as supplied by the caller, opaque to us.
    pub engine_config: serde_json::Value,
    pub pre_duration_sec: u64,
    pub fault_duration_sec: u64,
    pub start_time_epoch_ms: Option<u64>,
    pub end_time_epoch_ms: Option<u64>,
    pub status: InjectionStatus,
    pub benchmark: String,
    /// Stable identifier assigned by the orchestrator adapter on creation.
    pub injection_name: Option<String>,
    pub namespace: String,
}

impl InjectionSchedule {
    pub fn new(
        task_id: TaskId,
        fault_type: impl Into<String>,
        display_config: serde_json::Value,
        engine_config: serde_json::Value,
        pre_duration_sec: u64,
        fault_duration_sec: u64,
        benchmark: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            fault_type: fault_type.into(),
            display_config,
            engine_config,
            pre_duration_sec,
            fault_duration_sec,
            start_time_epoch_ms: None,
            end_time_epoch_ms: None,
            status: InjectionStatus::Initial,
            benchmark: benchmark.into(),
            injection_name: None,
            namespace: namespace.into(),
        }
    }

    /// Total window a namespace lock for this injection must cover
    /// (spec.md §4.5: "TTL of pre_duration + fault_duration + safety_margin").
    pub fn window_sec(&self, safety_margin_sec: u64) -> u64 {
        self.pre_duration_sec + self.fault_duration_sec + safety_margin_sec
    }
}

/// State of an algorithm execution (spec.md §3 "Execution Record").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Created,
    Success,
    Failed,
}

crate::simple_display! {
    ExecutionState {
        Created => "created",
        Success => "success",
        Failed => "failed",
    }
}

/// Produced by RUN_ALGORITHM and mutated by COLLECT_RESULT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub task_id: TaskId,
    pub algorithm_version_id: String,
    pub datapack_id: String,
    pub duration_sec: Option<u64>,
    pub state: ExecutionState,
    pub labels: std::collections::BTreeMap<String, String>,
}

impl ExecutionRecord {
    pub fn new(
        task_id: TaskId,
        algorithm_version_id: impl Into<String>,
        datapack_id: impl Into<String>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            task_id,
            algorithm_version_id: algorithm_version_id.into(),
            datapack_id: datapack_id.into(),
            duration_sec: None,
            state: ExecutionState::Created,
            labels: std::collections::BTreeMap::new(),
        }
    }
}

/// Persisted by BUILD_IMAGE (SPEC_FULL.md §3 supplement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub task_id: TaskId,
    pub benchmark: String,
    pub source_revision: String,
    pub image_ref: Option<String>,
    pub built_at_epoch_ms: Option<u64>,
    pub status: ExecutionState,
}

/// Persisted by RESTART_PEDESTAL (SPEC_FULL.md §3 supplement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedestalRecord {
    pub namespace: String,
    pub helm_release: String,
    pub revision: u32,
    pub status: ExecutionState,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
