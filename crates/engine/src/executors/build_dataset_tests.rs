// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::{task_config_with_parent, Harness};
use rcab_arbiter::Category;
use rcab_core::{InjectionSchedule, TaskType};
use serde_json::json;

fn dataset_payload() -> rcab_core::task::Payload {
    let mut payload = rcab_core::task::Payload::new();
    payload.insert(fields::NAMESPACE.into(), json!("ts-ns-0"));
    payload.insert(fields::BENCHMARK.into(), json!("clickhouse"));
    payload.insert(fields::BUILD_IMAGE.into(), json!("rcab/datapack-builder:latest"));
    payload
}

fn seed_injection(harness: &Harness, parent_id: rcab_core::TaskId) {
    let mut schedule = InjectionSchedule::new(
        parent_id,
        "pod-kill",
        serde_json::Value::Null,
        serde_json::Value::Null,
        5,
        3,
        "clickhouse",
        "ts-ns-0",
    );
    schedule.start_time_epoch_ms = Some(1_000);
    schedule.end_time_epoch_ms = Some(8_000);
    harness.scheduler.records().put_injection(schedule);
}

#[tokio::test]
async fn admits_token_and_creates_job_with_fault_window_env() {
    let harness = Harness::new();
    let parent = harness.admit(task_config_with_parent(TaskType::InjectFault, dataset_payload(), None));
    seed_injection(&harness, parent.id);

    let task = harness.admit(task_config_with_parent(
        TaskType::BuildDataset,
        dataset_payload(),
        Some(parent.id),
    ));
    let ctx = harness.context();

    let outcome = BuildDatasetExecutor.execute(&ctx, &task).await.expect("execute");
    assert_eq!(outcome, ExecOutcome::AwaitingCallback);

    let jobs = harness.adapter.created_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].spec.env.get("FAULT_START_TIME"), Some(&"1000".to_string()));
    assert_eq!(jobs[0].spec.env.get("FAULT_END_TIME"), Some(&"8000".to_string()));
    assert_eq!(harness.scheduler.token_bucket().live_lease_count(Category::Build), 1);
}

#[tokio::test]
async fn requires_parent_task_id() {
    let harness = Harness::new();
    let task = harness.admit(task_config_with_parent(TaskType::BuildDataset, dataset_payload(), None));
    let ctx = harness.context();

    let err = BuildDatasetExecutor.execute(&ctx, &task).await.expect_err("missing parent rejected");
    assert!(matches!(err, ExecutorError::Validation(_)));
    assert!(harness.adapter.created_jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_build_bucket_reschedules_instead_of_creating_job() {
    let harness = Harness::with_config({
        let mut config = rcab_core::Config::default();
        config.token_bucket_capacity = 1;
        config
    });
    let parent = harness.admit(task_config_with_parent(TaskType::InjectFault, dataset_payload(), None));
    seed_injection(&harness, parent.id);

    let occupying_task = rcab_core::TaskId::new();
    let occupying_trace = rcab_core::TraceId::new();
    harness.scheduler.token_bucket().try_acquire(
        Category::Build,
        occupying_task,
        occupying_trace,
        std::time::Duration::from_secs(300),
    );

    let task = harness.admit(task_config_with_parent(
        TaskType::BuildDataset,
        dataset_payload(),
        Some(parent.id),
    ));
    let ctx = harness.context();
    let outcome = BuildDatasetExecutor.execute(&ctx, &task).await.expect("execute");

    assert_eq!(outcome, ExecOutcome::Rescheduled);
    assert!(harness.adapter.created_jobs().is_empty());
}
