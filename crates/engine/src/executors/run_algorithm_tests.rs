// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::{task_config, Harness};
use rcab_arbiter::Category;
use rcab_core::TaskType;
use serde_json::json;

fn run_payload(role: &str) -> rcab_core::task::Payload {
    let mut payload = rcab_core::task::Payload::new();
    payload.insert(fields::NAMESPACE.into(), json!("ts-ns-0"));
    payload.insert(fields::ALGORITHM_IMAGE.into(), json!("rcab/detector:latest"));
    payload.insert(fields::ALGORITHM_VERSION_ID.into(), json!("v1"));
    payload.insert(fields::DATAPACK_ID.into(), json!("dp-123"));
    payload.insert(fields::ROLE.into(), json!(role));
    payload
}

#[tokio::test]
async fn admits_execute_token_and_creates_execution_record() {
    let harness = Harness::new();
    let task = harness.admit(task_config(TaskType::RunAlgorithm, run_payload(fields::ROLE_DETECTOR)));
    let ctx = harness.context();

    let outcome = RunAlgorithmExecutor.execute(&ctx, &task).await.expect("execute");
    assert_eq!(outcome, ExecOutcome::AwaitingCallback);

    let jobs = harness.adapter.created_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].spec.env.get("ROLE"), Some(&fields::ROLE_DETECTOR.to_string()));

    let record = harness.scheduler.records().find_execution_by_task(task.id).expect("execution recorded");
    assert_eq!(record.datapack_id, "dp-123");
    // The token is held for the whole job window, released only on the job
    // terminal callback (spec.md §4.5), not on return from `execute`.
    assert_eq!(harness.scheduler.token_bucket().live_lease_count(Category::Execute), 1);
}

#[tokio::test(start_paused = true)]
async fn no_token_reschedules_and_emits_no_token_available() {
    let harness = Harness::with_config({
        let mut config = rcab_core::Config::default();
        config.token_bucket_capacity = 1;
        config.token_wait_timeout_secs = 1;
        config
    });
    let occupying_task = rcab_core::TaskId::new();
    let occupying_trace = rcab_core::TraceId::new();
    harness.scheduler.token_bucket().try_acquire(
        Category::Execute,
        occupying_task,
        occupying_trace,
        std::time::Duration::from_secs(300),
    );

    let task = harness.admit(task_config(TaskType::RunAlgorithm, run_payload(fields::ROLE_USER)));
    let ctx = harness.context();
    let outcome = RunAlgorithmExecutor.execute(&ctx, &task).await.expect("execute");

    assert_eq!(outcome, ExecOutcome::Rescheduled);
    assert!(harness.adapter.created_jobs().is_empty());
    let reloaded = harness.scheduler.store().get_task(task.id).expect("task exists");
    assert_eq!(reloaded.state, rcab_core::TaskState::Pending);
}
