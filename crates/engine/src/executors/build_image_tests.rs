// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::{task_config, Harness};
use rcab_arbiter::Category;
use rcab_core::TaskType;
use serde_json::json;

fn build_image_payload() -> rcab_core::task::Payload {
    let mut payload = rcab_core::task::Payload::new();
    payload.insert(fields::BENCHMARK.into(), json!("clickhouse"));
    payload.insert(fields::SOURCE_REVISION.into(), json!("abc123"));
    payload
}

#[tokio::test]
async fn admits_build_token_and_creates_image_job() {
    let harness = Harness::new();
    let task = harness.admit(task_config(TaskType::BuildImage, build_image_payload()));
    let ctx = harness.context();

    let outcome = BuildImageExecutor.execute(&ctx, &task).await.expect("execute");
    assert_eq!(outcome, ExecOutcome::AwaitingCallback);

    let jobs = harness.adapter.created_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].spec.env.get("BENCHMARK"), Some(&"clickhouse".to_string()));
    assert_eq!(jobs[0].spec.env.get("SOURCE_REVISION"), Some(&"abc123".to_string()));

    let container = harness.scheduler.records().get_container(task.id).expect("container record");
    assert_eq!(container.benchmark, "clickhouse");
    assert_eq!(harness.scheduler.token_bucket().live_lease_count(Category::Build), 1);
}

#[tokio::test]
async fn falls_back_to_configured_builder_image_when_unspecified() {
    let harness = Harness::new();
    let task = harness.admit(task_config(TaskType::BuildImage, build_image_payload()));
    let ctx = harness.context();

    BuildImageExecutor.execute(&ctx, &task).await.expect("execute");
    let jobs = harness.adapter.created_jobs();
    assert_eq!(jobs[0].spec.image, ctx.config.image_builder_image);
}

#[tokio::test]
async fn rejects_missing_source_revision() {
    let harness = Harness::new();
    let mut payload = build_image_payload();
    payload.remove(fields::SOURCE_REVISION);
    let task = harness.admit(task_config(TaskType::BuildImage, payload));
    let ctx = harness.context();

    let err = BuildImageExecutor.execute(&ctx, &task).await.expect_err("missing field rejected");
    assert!(matches!(err, ExecutorError::Validation(_)));
    assert!(harness.adapter.created_jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_build_bucket_reschedules() {
    let harness = Harness::with_config({
        let mut config = rcab_core::Config::default();
        config.token_bucket_capacity = 1;
        config
    });
    let occupying_task = rcab_core::TaskId::new();
    let occupying_trace = rcab_core::TraceId::new();
    harness.scheduler.token_bucket().try_acquire(
        Category::Build,
        occupying_task,
        occupying_trace,
        std::time::Duration::from_secs(300),
    );

    let task = harness.admit(task_config(TaskType::BuildImage, build_image_payload()));
    let ctx = harness.context();
    let outcome = BuildImageExecutor.execute(&ctx, &task).await.expect("execute");

    assert_eq!(outcome, ExecOutcome::Rescheduled);
    assert!(harness.adapter.created_jobs().is_empty());
}
