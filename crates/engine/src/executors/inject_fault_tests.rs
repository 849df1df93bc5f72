// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::{task_config, Harness};
use rcab_core::{InjectionStatus, TaskType};
use serde_json::json;

fn inject_payload() -> rcab_core::task::Payload {
    let mut payload = rcab_core::task::Payload::new();
    payload.insert(fields::NAMESPACE.into(), json!("ts-ns-0"));
    payload.insert(fields::FAULT_TYPE.into(), json!("pod-kill"));
    payload.insert(fields::BENCHMARK.into(), json!("clickhouse"));
    payload.insert(fields::PRE_DURATION.into(), json!(5));
    payload.insert(fields::FAULT_DURATION.into(), json!(3));
    payload
}

#[tokio::test]
async fn creates_injection_and_acquires_namespace_lock() {
    let harness = Harness::new();
    let task = harness.admit(task_config(TaskType::InjectFault, inject_payload()));
    let ctx = harness.context();

    let outcome = InjectFaultExecutor.execute(&ctx, &task).await.expect("execute");
    assert_eq!(outcome, ExecOutcome::AwaitingCallback);

    assert_eq!(harness.adapter.created_injections().len(), 1);
    assert!(harness.scheduler.namespace_lock().is_held("ts-ns-0"));

    let schedule = harness.scheduler.records().get_injection(task.id).expect("schedule persisted");
    assert_eq!(schedule.status, InjectionStatus::Initial);
    assert!(schedule.injection_name.is_some());
}

#[tokio::test]
async fn second_injection_on_same_namespace_reschedules_instead_of_creating() {
    let harness = Harness::new();
    let task_a = harness.admit(task_config(TaskType::InjectFault, inject_payload()));
    let ctx_a = harness.context();
    InjectFaultExecutor.execute(&ctx_a, &task_a).await.expect("first execute");

    let task_b = harness.admit(task_config(TaskType::InjectFault, inject_payload()));
    let ctx_b = harness.context();
    let outcome = InjectFaultExecutor.execute(&ctx_b, &task_b).await.expect("second execute");

    assert_eq!(outcome, ExecOutcome::Rescheduled);
    assert_eq!(harness.adapter.created_injections().len(), 1);
    let reloaded = harness.scheduler.store().get_task(task_b.id).expect("task exists");
    assert_eq!(reloaded.state, rcab_core::TaskState::Pending);
    assert_eq!(reloaded.restart_num, 1);
}

#[tokio::test]
async fn rejects_non_positive_pre_duration() {
    let harness = Harness::new();
    let mut payload = inject_payload();
    payload.insert(fields::PRE_DURATION.into(), json!(0));
    let task = harness.admit(task_config(TaskType::InjectFault, payload));
    let ctx = harness.context();

    let err = InjectFaultExecutor.execute(&ctx, &task).await.expect_err("zero duration rejected");
    assert!(matches!(err, ExecutorError::Validation(_)));
    assert!(harness.adapter.created_injections().is_empty());
}

#[tokio::test]
async fn rejects_fractional_duration() {
    let harness = Harness::new();
    let mut payload = inject_payload();
    payload.insert(fields::FAULT_DURATION.into(), json!(2.5));
    let task = harness.admit(task_config(TaskType::InjectFault, payload));
    let ctx = harness.context();

    let err = InjectFaultExecutor.execute(&ctx, &task).await.expect_err("fractional duration rejected");
    assert!(matches!(err, ExecutorError::Validation(_)));
}
