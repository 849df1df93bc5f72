// SPDX-License-Identifier: MIT

//! Submission DTOs (spec.md §6 "Submission API (abstract)"): what a caller
//! hands the Composer — project id, user id, a list of injection/execution
//! specs, optional labels, optional retry policy, optional cron.

use rcab_core::RetryPolicy;
use rcab_engine::executors::fields::PendingAlgorithm;

/// One follow-up algorithm a submitter wants run if the detector finds
/// anomalies (spec.md §4.5 COLLECT_RESULT), or one of the algorithms an
/// ALGORITHM_RUN submission wants run directly against an existing datapack.
#[derive(Debug, Clone)]
pub struct AlgorithmRequest {
    pub algorithm_version_id: String,
    pub algorithm_image: String,
}

impl From<&AlgorithmRequest> for PendingAlgorithm {
    fn from(request: &AlgorithmRequest) -> Self {
        PendingAlgorithm {
            algorithm_version_id: request.algorithm_version_id.clone(),
            algorithm_image: request.algorithm_image.clone(),
        }
    }
}

/// A single fault-injection spec (spec.md §3 "Injection Schedule" inputs,
/// §4.8). Drives an INJECT_FAULT head task whose downstream chain the
/// executors themselves produce (BUILD_DATASET -> detector RUN_ALGORITHM ->
/// COLLECT_RESULT -> optional per-algorithm RUN_ALGORITHM).
#[derive(Debug, Clone)]
pub struct InjectionRequest {
    pub namespace: String,
    pub fault_type: String,
    pub benchmark: String,
    pub pre_duration_sec: u64,
    pub fault_duration_sec: u64,
    pub display_config: serde_json::Value,
    pub engine_config: serde_json::Value,
    pub build_image: String,
    pub detector_algorithm_image: String,
    pub detector_algorithm_version_id: String,
    /// Algorithms to run as follow-up if (and only if) the detector reports
    /// anomalies (spec.md §8 scenario 5). Empty means this submission only
    /// wants the datapack built and the detector's verdict — a
    /// DATAPACK_BUILD trace rather than a FULL_PIPELINE one.
    pub user_algorithms: Vec<AlgorithmRequest>,
    /// Planned start of the injection window, used only for the
    /// same-submission overlap check (spec.md §4.8); `None` means "as soon
    /// as admitted," which the sweep treats as starting now.
    pub execute_time_epoch_ms: Option<u64>,
    pub cron_expr: Option<String>,
    pub retry_policy: Option<RetryPolicy>,
}

/// A direct run of one or more algorithms against an already-built datapack,
/// with no injection or dataset build involved (spec.md §3 Trace type
/// `ALGORITHM_RUN`).
#[derive(Debug, Clone)]
pub struct AlgorithmRunRequest {
    pub namespace: String,
    pub datapack_id: String,
    pub algorithms: Vec<AlgorithmRequest>,
    pub execute_time_epoch_ms: Option<u64>,
    pub cron_expr: Option<String>,
    pub retry_policy: Option<RetryPolicy>,
}

#[derive(Debug, Clone)]
pub enum SubmissionItem {
    Injection(InjectionRequest),
    AlgorithmRun(AlgorithmRunRequest),
}

/// A caller's domain request (spec.md §6): "inject this list of specs, then
/// run these algorithms."
#[derive(Debug, Clone)]
pub struct Submission {
    pub project_id: String,
    pub user_id: String,
    pub items: Vec<SubmissionItem>,
}
