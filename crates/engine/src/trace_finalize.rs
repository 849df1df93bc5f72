// SPDX-License-Identifier: MIT

//! Shared helper for turning a trace's freshly-terminal state into the
//! single `Event::Trace*` announcement spec.md §3 promises ("trace
//! completes iff all leaves are terminal; trace fails as soon as any leaf
//! fails"). Every leaf-completing path (executors, the scheduler's retry
//! exhaustion, explicit cancellation) calls this after touching the task
//! store; the event bus's per-key dedup collapses the redundant calls that
//! happen when several leaves finish close together into one announcement.

use rcab_core::{Clock, Event, TraceId, TraceState};
use rcab_storage::{EventBus, TaskStore};

const DEDUP_KEY: &str = "trace-terminal";

/// Re-reads `trace_id` and, if it has just become terminal, appends the
/// matching `Event::Trace{Completed,Failed,Cancelled}`. Safe to call after
/// every leaf transition regardless of whether this particular call is the
/// one that tipped the trace over — the dedup key means only the first
/// caller's append is observable.
pub fn finalize_trace<C: Clock>(store: &TaskStore, bus: &EventBus<C>, trace_id: TraceId) {
    let Ok((trace, _tasks)) = store.get_trace(trace_id) else { return };
    if !trace.state.is_terminal() {
        return;
    }

    let event = match trace.state {
        TraceState::Completed => Event::TraceCompleted { trace_id, group_id: trace.group_id },
        TraceState::Failed => Event::TraceFailed { trace_id, group_id: trace.group_id },
        TraceState::Cancelled => Event::TraceCancelled { trace_id, group_id: trace.group_id },
        TraceState::Running => return,
    };
    bus.append(trace_id, event, Some(DEDUP_KEY));
}
