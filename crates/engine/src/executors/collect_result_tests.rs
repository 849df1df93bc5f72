// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::{task_config_with_parent, Harness};
use rcab_core::{ExecutionRecord, ExecutionState, TaskState, TaskType, Trace, TraceState, TraceType};
use serde_json::json;

fn seed_trace(harness: &Harness, leaf_num: u32) -> rcab_core::TraceId {
    let now = harness.clock.epoch_ms();
    let trace = Trace::new(TraceType::FullPipeline, rcab_core::GroupId::new(), "proj-1", leaf_num, now);
    let trace_id = trace.id;
    harness.scheduler.store().create_trace(trace).expect("create_trace");
    trace_id
}

fn admit_in_trace(
    harness: &Harness,
    trace_id: rcab_core::TraceId,
    task_type: TaskType,
    payload: rcab_core::task::Payload,
    parent_task_id: Option<rcab_core::TaskId>,
) -> rcab_core::Task {
    let mut config = task_config_with_parent(task_type, payload, parent_task_id);
    config.trace_id = trace_id;
    harness.admit(config)
}

fn detector_collect_payload(pending: &[fields::PendingAlgorithm]) -> rcab_core::task::Payload {
    let mut payload = rcab_core::task::Payload::new();
    payload.insert(fields::ROLE.into(), json!(fields::ROLE_DETECTOR));
    payload.insert(fields::PENDING_ALGORITHMS.into(), fields::pending_algorithms_to_value(pending));
    payload
}

fn seed_execution(harness: &Harness, parent_id: rcab_core::TaskId, anomalies: u32, state: ExecutionState) -> ExecutionRecord {
    let mut record = ExecutionRecord::new(parent_id, "detector-v1", "dp-1");
    record.state = state;
    record.labels.insert("anomalies_count".into(), anomalies.to_string());
    harness.scheduler.records().put_execution(record.clone());
    record
}

#[tokio::test]
async fn detector_with_anomalies_enqueues_pending_algorithms() {
    let harness = Harness::new();
    let trace_id = seed_trace(&harness, 2);
    let detector_run = admit_in_trace(&harness, trace_id, TaskType::RunAlgorithm, Default::default(), None);
    seed_execution(&harness, detector_run.id, 3, ExecutionState::Success);

    let pending = vec![fields::PendingAlgorithm {
        algorithm_version_id: "algo-a".into(),
        algorithm_image: "rcab/algo-a:latest".into(),
    }];
    let task = admit_in_trace(
        &harness,
        trace_id,
        TaskType::CollectResult,
        detector_collect_payload(&pending),
        Some(detector_run.id),
    );
    let ctx = harness.context();

    let outcome = CollectResultExecutor.execute(&ctx, &task).await.expect("execute");
    assert_eq!(outcome, ExecOutcome::Completed);

    let (_trace, tasks) = harness.scheduler.store().get_trace(trace_id).expect("trace exists");
    assert!(tasks.iter().any(|t| t.task_type == TaskType::RunAlgorithm && t.id != detector_run.id));
}

#[tokio::test]
async fn detector_with_no_anomalies_short_circuits_trace_even_with_pending_algorithms() {
    let harness = Harness::new();
    let trace_id = seed_trace(&harness, 2);
    let detector_run = admit_in_trace(&harness, trace_id, TaskType::RunAlgorithm, Default::default(), None);
    seed_execution(&harness, detector_run.id, 0, ExecutionState::Success);

    let pending = vec![fields::PendingAlgorithm {
        algorithm_version_id: "algo-a".into(),
        algorithm_image: "rcab/algo-a:latest".into(),
    }];
    let task = admit_in_trace(
        &harness,
        trace_id,
        TaskType::CollectResult,
        detector_collect_payload(&pending),
        Some(detector_run.id),
    );
    let ctx = harness.context();

    CollectResultExecutor.execute(&ctx, &task).await.expect("execute");

    let (trace, tasks) = harness.scheduler.store().get_trace(trace_id).expect("trace exists");
    assert!(!tasks.iter().any(|t| t.task_type == TaskType::RunAlgorithm && t.id != detector_run.id));
    assert_eq!(trace.state, TraceState::Completed);
}

#[tokio::test]
async fn detector_with_no_data_short_circuits_trace() {
    let harness = Harness::new();
    let trace_id = seed_trace(&harness, 2);
    let detector_run = admit_in_trace(&harness, trace_id, TaskType::RunAlgorithm, Default::default(), None);
    seed_execution(&harness, detector_run.id, 0, ExecutionState::Failed);

    let task = admit_in_trace(
        &harness,
        trace_id,
        TaskType::CollectResult,
        detector_collect_payload(&[]),
        Some(detector_run.id),
    );
    let ctx = harness.context();

    CollectResultExecutor.execute(&ctx, &task).await.expect("execute");
    let (trace, _) = harness.scheduler.store().get_trace(trace_id).expect("trace exists");
    assert_eq!(trace.state, TraceState::Completed);
}

#[tokio::test]
async fn user_algorithm_success_emits_result_collection() {
    let harness = Harness::new();
    let trace_id = seed_trace(&harness, 1);
    let user_run = admit_in_trace(&harness, trace_id, TaskType::RunAlgorithm, Default::default(), None);
    seed_execution(&harness, user_run.id, 0, ExecutionState::Success);

    let mut payload = rcab_core::task::Payload::new();
    payload.insert(fields::ROLE.into(), json!(fields::ROLE_USER));
    let task = admit_in_trace(&harness, trace_id, TaskType::CollectResult, payload, Some(user_run.id));
    let ctx = harness.context();

    let outcome = CollectResultExecutor.execute(&ctx, &task).await.expect("execute");
    assert_eq!(outcome, ExecOutcome::Completed);
    assert_ne!(
        harness.scheduler.store().get_task(task.id).expect("task exists").state,
        TaskState::Error
    );
}

#[tokio::test]
async fn requires_parent_task_id() {
    let harness = Harness::new();
    let trace_id = seed_trace(&harness, 1);
    let task = admit_in_trace(&harness, trace_id, TaskType::CollectResult, Default::default(), None);
    let ctx = harness.context();

    let err = CollectResultExecutor.execute(&ctx, &task).await.expect_err("missing parent rejected");
    assert!(matches!(err, ExecutorError::Validation(_)));
}
