// SPDX-License-Identifier: MIT

use super::*;
use rcab_core::{Carrier, RetryPolicy, TaskConfig, TaskType, TraceType};

fn new_trace_with_task(store: &TaskStore, leaf_num: u32) -> (TraceId, TaskId) {
    let group = Group::new("proj-1", 1_000);
    let group_id = group.id;
    store.create_group(group).unwrap();

    let trace = Trace::new(TraceType::DatapackBuild, group_id, "proj-1", leaf_num, 1_000);
    let trace_id = trace.id;
    store.create_trace(trace).unwrap();

    let config = TaskConfig {
        task_type: TaskType::CollectResult,
        immediate: true,
        execute_time_epoch_ms: None,
        cron_expr: None,
        retry_policy: RetryPolicy::default(),
        payload: Default::default(),
        trace_id,
        group_id,
        parent_task_id: None,
        project_id: "proj-1".into(),
        user_id: "user-1".into(),
        trace_carrier: Carrier::new(),
        group_carrier: Carrier::new(),
    };
    let task = Task::new(config, 1_000);
    let task_id = task.id;
    store.create_task(task).unwrap();
    (trace_id, task_id)
}

#[test]
fn create_task_rejects_duplicate_id() {
    let store = TaskStore::new();
    let (_trace_id, task_id) = new_trace_with_task(&store, 1);
    let duplicate = store.get_task(task_id).unwrap();
    assert!(matches!(store.create_task(duplicate), Err(StorageError::TaskAlreadyExists(_))));
}

#[test]
fn update_task_state_enforces_legal_transitions() {
    let store = TaskStore::new();
    let (_trace_id, task_id) = new_trace_with_task(&store, 1);

    let task = store.update_task_state(task_id, TaskState::Running, None, 2_000).unwrap();
    assert_eq!(task.state, TaskState::Running);

    let err = store.update_task_state(task_id, TaskState::Completed, None, 3_000).map(|_| ());
    // Running -> Completed is legal for the generic state machine
    assert!(err.is_ok());

    let err = store.update_task_state(task_id, TaskState::Running, None, 4_000);
    assert!(matches!(err, Err(StorageError::TransitionInvalid { .. })));
}

#[test]
fn leaf_completion_completes_trace_once_all_leaves_terminal() {
    let store = TaskStore::new();
    let (trace_id, task_id) = new_trace_with_task(&store, 1);

    store.update_task_state(task_id, TaskState::Running, None, 2_000).unwrap();
    store.update_task_state(task_id, TaskState::Completed, None, 3_000).unwrap();

    let (trace, _) = store.get_trace(trace_id).unwrap();
    assert_eq!(trace.state, rcab_core::TraceState::Completed);
}

#[test]
fn leaf_error_fails_trace_immediately() {
    let store = TaskStore::new();
    let (trace_id, task_id) = new_trace_with_task(&store, 2);

    store.update_task_state(task_id, TaskState::Running, None, 2_000).unwrap();
    store.update_task_state(task_id, TaskState::Error, None, 3_000).unwrap();

    let (trace, _) = store.get_trace(trace_id).unwrap();
    assert_eq!(trace.state, rcab_core::TraceState::Failed);
}

#[test]
fn reschedule_increments_restart_num_and_returns_to_pending() {
    let store = TaskStore::new();
    let (_trace_id, task_id) = new_trace_with_task(&store, 1);

    store.update_task_state(task_id, TaskState::Running, None, 2_000).unwrap();
    let task = store.reschedule_task(task_id, 5_000, 4_000).unwrap();
    assert_eq!(task.state, TaskState::Pending);
    assert_eq!(task.restart_num, 1);
    assert_eq!(task.execute_time_epoch_ms, Some(5_000));
}

#[test]
fn list_tasks_filters_by_state_and_paginates() {
    let store = TaskStore::new();
    for _ in 0..25 {
        new_trace_with_task(&store, 1);
    }
    let pagination = Pagination::new(0, 10).unwrap();
    let (page, total) = store.list_tasks(&TaskFilter::default(), pagination);
    assert_eq!(total, 25);
    assert_eq!(page.len(), 10);

    let pagination = Pagination::new(2, 10).unwrap();
    let (page, _) = store.list_tasks(&TaskFilter::default(), pagination);
    assert_eq!(page.len(), 5);
}

#[test]
fn pagination_rejects_invalid_size() {
    assert!(matches!(Pagination::new(0, 15), Err(StorageError::InvalidPageSize(15))));
}

#[test]
fn get_trace_returns_tasks_in_insertion_order() {
    let store = TaskStore::new();
    let (trace_id, first_task) = new_trace_with_task(&store, 2);
    let group_id = store.get_task(first_task).unwrap().group_id;

    let config = TaskConfig {
        task_type: TaskType::CollectResult,
        immediate: true,
        execute_time_epoch_ms: None,
        cron_expr: None,
        retry_policy: RetryPolicy::default(),
        payload: Default::default(),
        trace_id,
        group_id,
        parent_task_id: Some(first_task),
        project_id: "proj-1".into(),
        user_id: "user-1".into(),
        trace_carrier: Carrier::new(),
        group_carrier: Carrier::new(),
    };
    let second_task = Task::new(config, 1_500);
    let second_id = second_task.id;
    store.create_task(second_task).unwrap();

    let (_trace, tasks) = store.get_trace(trace_id).unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, first_task);
    assert_eq!(tasks[1].id, second_id);
}

#[test]
fn cancel_trace_before_any_leaf_terminal_is_cancelled() {
    let store = TaskStore::new();
    let (trace_id, _task_id) = new_trace_with_task(&store, 1);
    let trace = store.cancel_trace(trace_id, 9_000).unwrap();
    assert_eq!(trace.state, rcab_core::TraceState::Cancelled);
}
