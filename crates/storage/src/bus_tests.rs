// SPDX-License-Identifier: MIT

use super::*;
use rcab_core::{FakeClock, TraceId};

fn bus() -> EventBus<FakeClock> {
    EventBus::new(FakeClock::new(), 1_000, 65_536)
}

fn task_event(task_id: TaskId, trace_id: TraceId) -> Event {
    Event::TaskRunning { task_id, trace_id }
}

#[test]
fn append_assigns_monotonic_sequence_ids() {
    let bus = bus();
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    let seq1 = bus.append(trace_id, task_event(task_id, trace_id), None);
    let seq2 = bus.append(trace_id, task_event(task_id, trace_id), None);
    assert_eq!(seq1, 1);
    assert_eq!(seq2, 2);
}

#[test]
fn append_is_idempotent_per_dedup_key() {
    let bus = bus();
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    let seq1 = bus.append(trace_id, task_event(task_id, trace_id), Some("k1"));
    let seq2 = bus.append(trace_id, task_event(task_id, trace_id), Some("k1"));
    assert_eq!(seq1, seq2);
    let (events, _) = bus.read(trace_id, 0, 100);
    assert_eq!(events.len(), 1);
}

#[test]
fn read_returns_events_strictly_after_cursor() {
    let bus = bus();
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    bus.append(trace_id, task_event(task_id, trace_id), None);
    bus.append(trace_id, task_event(task_id, trace_id), None);
    bus.append(trace_id, task_event(task_id, trace_id), None);

    let (events, cursor) = bus.read(trace_id, 1, 10);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].seq, 2);
    assert_eq!(cursor, 3);
}

#[test]
fn read_on_empty_or_unknown_trace_returns_same_cursor() {
    let bus = bus();
    let trace_id = TraceId::new();
    let (events, cursor) = bus.read(trace_id, 5, 10);
    assert!(events.is_empty());
    assert_eq!(cursor, 5);
}

#[test]
fn read_respects_max() {
    let bus = bus();
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    for _ in 0..5 {
        bus.append(trace_id, task_event(task_id, trace_id), None);
    }
    let (events, cursor) = bus.read(trace_id, 0, 2);
    assert_eq!(events.len(), 2);
    assert_eq!(cursor, 2);
}

#[test]
fn append_does_not_block_other_streams() {
    let bus = bus();
    let trace_a = TraceId::new();
    let trace_b = TraceId::new();
    let task_id = TaskId::new();
    bus.append(trace_a, task_event(task_id, trace_a), None);
    bus.append(trace_b, task_event(task_id, trace_b), None);
    let (events_a, _) = bus.read(trace_a, 0, 10);
    let (events_b, _) = bus.read(trace_b, 0, 10);
    assert_eq!(events_a.len(), 1);
    assert_eq!(events_b.len(), 1);
}

#[test]
fn oversized_payload_is_truncated_with_marker() {
    let bus = EventBus::new(FakeClock::new(), 1_000, 16);
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    bus.append(
        trace_id,
        Event::TaskError {
            task_id,
            trace_id,
            message: "a very long diagnostic message that exceeds the ceiling".into(),
        },
        None,
    );
    let (events, _) = bus.read(trace_id, 0, 10);
    let payload = &events[0].payload;
    assert!(payload.as_str().unwrap().ends_with("...[truncated]"));
}

#[test]
fn retention_trims_oldest_entries() {
    let bus = EventBus::new(FakeClock::new(), 3, 65_536);
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    for _ in 0..10 {
        bus.append(trace_id, task_event(task_id, trace_id), None);
    }
    let (events, _) = bus.read(trace_id, 0, 100);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].seq, 8);
}

#[tokio::test]
async fn subscribe_replays_backlog_then_tails_live_events() {
    let bus = bus();
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    bus.append(trace_id, task_event(task_id, trace_id), None);
    bus.append(trace_id, task_event(task_id, trace_id), None);

    let mut subscription = bus.subscribe(trace_id, 0);
    let first = subscription.next().await.unwrap();
    let second = subscription.next().await.unwrap();
    assert_eq!(first.seq, 1);
    assert_eq!(second.seq, 2);

    bus.append(trace_id, task_event(task_id, trace_id), None);
    let third = subscription.next().await.unwrap();
    assert_eq!(third.seq, 3);
}

#[tokio::test]
async fn subscribe_resumes_from_previously_observed_cursor() {
    let bus = bus();
    let trace_id = TraceId::new();
    let task_id = TaskId::new();
    bus.append(trace_id, task_event(task_id, trace_id), None);
    bus.append(trace_id, task_event(task_id, trace_id), None);

    let mut subscription = bus.subscribe(trace_id, 1);
    let event = subscription.next().await.unwrap();
    assert_eq!(event.seq, 2);
}

#[tokio::test]
async fn subscription_ends_once_trace_is_terminal_and_drained() {
    let bus = bus();
    let trace_id = TraceId::new();
    let group_id = rcab_core::GroupId::new();
    let task_id = TaskId::new();
    bus.append(trace_id, task_event(task_id, trace_id), None);
    bus.append(trace_id, Event::TraceCompleted { trace_id, group_id }, None);

    let mut subscription = bus.subscribe(trace_id, 0);
    assert!(subscription.next().await.is_some());
    assert!(subscription.next().await.is_some());
    assert!(subscription.next().await.is_none());
}
