// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn task_event_carries_task_and_trace_id() {
    let task_id = TaskId::new();
    let trace_id = TraceId::new();
    let event = Event::TaskRunning { task_id, trace_id };
    assert_eq!(event.task_id(), Some(task_id));
    assert_eq!(event.trace_id(), Some(trace_id));
    assert_eq!(event.name(), "task:running");
}

#[test]
fn trace_event_has_no_task_id() {
    let trace_id = TraceId::new();
    let group_id = GroupId::new();
    let event = Event::TraceCompleted { trace_id, group_id };
    assert_eq!(event.task_id(), None);
    assert_eq!(event.trace_id(), Some(trace_id));
    assert_eq!(event.name(), "trace:completed");
}

#[test]
fn job_event_has_no_trace_id() {
    let task_id = TaskId::new();
    let event = Event::JobAdded { task_id, job_name: "rca-job-1".into() };
    assert_eq!(event.task_id(), Some(task_id));
    assert_eq!(event.trace_id(), None);
    assert_eq!(event.name(), "job:added");
}

#[test]
fn custom_variant_has_no_ids() {
    let event = Event::Custom;
    assert_eq!(event.task_id(), None);
    assert_eq!(event.trace_id(), None);
    assert_eq!(event.name(), "custom");
}

#[test]
fn unknown_type_tag_deserializes_to_custom() {
    let json = serde_json::json!({"type": "some_future_event", "foo": "bar"});
    let event: Event = serde_json::from_value(json).unwrap();
    assert_eq!(event, Event::Custom);
}

#[test]
fn known_event_round_trips_through_json() {
    let task_id = TaskId::new();
    let trace_id = TraceId::new();
    let event = Event::TaskCompleted { task_id, trace_id };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "task:completed");
    let back: Event = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}
