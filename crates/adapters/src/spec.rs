// SPDX-License-Identifier: MIT

//! Orchestrator-facing specs for the two inward operations of the Job
//! Adapter (spec.md §4.6 `create_job`, `create_injection`) plus the
//! mandatory label/annotation/env contract from spec.md §4.6 and §6.

use rcab_core::{Carrier, GroupId, TaskId, TaskType, TraceId};
use std::collections::BTreeMap;

/// Builds the mandatory label set every orchestrator job and injection
/// carries (spec.md §4.6 "Mandatory labels", §6 "Orchestrator contract").
pub fn mandatory_labels(
    task_id: TaskId,
    trace_id: TraceId,
    group_id: GroupId,
    project_id: &str,
    user_id: &str,
    task_type: TaskType,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("task_id".into(), task_id.to_string());
    labels.insert("trace_id".into(), trace_id.to_string());
    labels.insert("group_id".into(), group_id.to_string());
    labels.insert("project_id".into(), project_id.to_string());
    labels.insert("user_id".into(), user_id.to_string());
    labels.insert("task_type".into(), task_type.to_string());
    labels
}

/// Builds the mandatory annotation set: the serialized trace and group
/// carriers (spec.md §4.6 "Mandatory annotations", §4.7 "two opaque carrier
/// bags").
pub fn mandatory_annotations(
    trace_carrier: &Carrier,
    group_carrier: &Carrier,
) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert("rcab.io/trace-carrier".into(), trace_carrier.to_annotation());
    annotations.insert("rcab.io/group-carrier".into(), group_carrier.to_annotation());
    annotations
}

/// Base environment every job receives (spec.md §6 "Orchestrator contract").
pub fn base_env(timezone: &str, timestamp_epoch_ms: u64, workspace: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("TIMEZONE".into(), timezone.to_string());
    env.insert("TIMESTAMP".into(), timestamp_epoch_ms.to_string());
    env.insert("WORKSPACE".into(), workspace.to_string());
    env
}

/// Specification for creating an orchestrator job (BUILD_DATASET,
/// RUN_ALGORITHM, BUILD_IMAGE, RESTART_PEDESTAL).
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Job name equals `task_id` (spec.md §4.6 "idempotent creation").
    pub task_id: TaskId,
    pub namespace: String,
    pub image: String,
    pub command: Option<Vec<String>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

impl JobSpec {
    pub fn job_name(&self) -> String {
        job_name_for_task(self.task_id)
    }
}

/// Job name equals `task_id` (spec.md §4.6 "idempotent creation"), exposed
/// standalone so callers that only have a `TaskId` (e.g. a cancellation
/// path with no `JobSpec` at hand) can still derive it.
pub fn job_name_for_task(task_id: TaskId) -> String {
    task_id.tagged().replace(':', "-")
}

/// Specification for creating a fault-injection custom resource
/// (spec.md §4.6's `create_injection`).
#[derive(Debug, Clone)]
pub struct InjectionSpec {
    pub task_id: TaskId,
    pub namespace: String,
    pub fault_type: String,
    pub display_config: serde_json::Value,
    pub engine_config: serde_json::Value,
    pub pre_duration_sec: u64,
    pub fault_duration_sec: u64,
    pub benchmark: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl InjectionSpec {
    /// Stable identifier assigned to the custom resource; derived from the
    /// task id the same way job names are (spec.md §3 "injection_name").
    pub fn injection_name(&self) -> String {
        format!("inj-{}", self.task_id.as_uuid().simple())
    }
}
