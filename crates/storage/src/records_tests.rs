// SPDX-License-Identifier: MIT

use super::*;
use rcab_core::{ExecutionState, InjectionStatus, TaskId};

#[test]
fn injection_round_trip_and_update() {
    let store = RecordStore::new();
    let task_id = TaskId::new();
    let schedule = InjectionSchedule::new(
        task_id,
        "pod-kill",
        serde_json::json!({}),
        serde_json::json!({}),
        5,
        3,
        "clickhouse",
        "ts-ns-0",
    );
    store.put_injection(schedule);

    let updated = store
        .update_injection(task_id, |schedule| {
            schedule.status = InjectionStatus::InjectSuccess;
            schedule.injection_name = Some("inj-abc".into());
        })
        .unwrap();
    assert_eq!(updated.status, InjectionStatus::InjectSuccess);
    assert_eq!(store.get_injection(task_id).unwrap().injection_name.as_deref(), Some("inj-abc"));
}

#[test]
fn get_injection_missing_errors() {
    let store = RecordStore::new();
    assert!(store.get_injection(TaskId::new()).is_err());
}

#[test]
fn execution_lookup_by_task_id() {
    let store = RecordStore::new();
    let task_id = TaskId::new();
    let record = ExecutionRecord::new(task_id, "algo-v1", "dp-1");
    let id = record.id;
    store.put_execution(record);

    let found = store.find_execution_by_task(task_id).unwrap();
    assert_eq!(found.id, id);

    let updated = store
        .update_execution(id, |record| {
            record.state = ExecutionState::Success;
            record.duration_sec = Some(42);
        })
        .unwrap();
    assert_eq!(updated.state, ExecutionState::Success);
    assert_eq!(updated.duration_sec, Some(42));
}

#[test]
fn pedestal_keyed_by_namespace_and_release() {
    let store = RecordStore::new();
    store.put_pedestal(PedestalRecord {
        namespace: "ts-ns-0".into(),
        helm_release: "clickhouse".into(),
        revision: 1,
        status: ExecutionState::Success,
    });
    assert!(store.get_pedestal("ts-ns-0", "clickhouse").is_some());
    assert!(store.get_pedestal("ts-ns-0", "other").is_none());
}
