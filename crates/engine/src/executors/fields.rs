// SPDX-License-Identifier: MIT

//! Payload field names shared across the executor pipeline. Each task type
//! reads the fields it needs and writes the ones its successor needs into
//! the next `TaskConfig.payload` it submits — the "downstream chain ...
//! produced by the executors themselves, not pre-materialized" propagation
//! spec.md §4.8 describes.

pub const NAMESPACE: &str = "namespace";
pub const FAULT_TYPE: &str = "fault_type";
pub const BENCHMARK: &str = "benchmark";
pub const PRE_DURATION: &str = "pre_duration";
pub const FAULT_DURATION: &str = "fault_duration";
pub const DISPLAY_CONFIG: &str = "display_config";
pub const ENGINE_CONFIG: &str = "engine_config";
pub const BUILD_IMAGE: &str = "build_image";
pub const DETECTOR_IMAGE: &str = "detector_algorithm_image";
pub const DETECTOR_VERSION_ID: &str = "detector_version_id";
pub const PENDING_ALGORITHMS: &str = "pending_algorithms";

pub const ALGORITHM_IMAGE: &str = "algorithm_image";
pub const ALGORITHM_VERSION_ID: &str = "algorithm_version_id";
pub const DATAPACK_ID: &str = "datapack_id";
pub const ROLE: &str = "role";
pub const ROLE_DETECTOR: &str = "detector";
pub const ROLE_USER: &str = "user";

pub const SOURCE_REVISION: &str = "source_revision";
pub const BUILDER_IMAGE: &str = "builder_image";

pub const HELM_RELEASE: &str = "helm_release";
pub const HELM_CHART: &str = "helm_chart";

/// A single follow-up algorithm to run after the detector reports
/// anomalies (spec.md §4.5 COLLECT_RESULT: "enqueues a RUN_ALGORITHM per
/// algorithm"). Serialized as one element of the `pending_algorithms` JSON
/// array so it survives a task's payload round-trip without its own type
/// leaking into the Task data model (spec.md §3 keeps payload "opaque").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PendingAlgorithm {
    pub algorithm_version_id: String,
    pub algorithm_image: String,
}

pub fn pending_algorithms_from_payload(
    payload: &rcab_core::task::Payload,
) -> Vec<PendingAlgorithm> {
    payload
        .get(PENDING_ALGORITHMS)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn pending_algorithms_to_value(algorithms: &[PendingAlgorithm]) -> serde_json::Value {
    serde_json::to_value(algorithms).unwrap_or(serde_json::Value::Array(Vec::new()))
}
