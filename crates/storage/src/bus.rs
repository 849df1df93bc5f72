// SPDX-License-Identifier: MIT

//! Append-only per-trace event log with cursored replay and broadcast
//! fan-out (spec.md §4.1). Addressed logically by `stream:log:{trace_id}`
//! (spec.md §6 "Persistent state layout"); here that address is simply the
//! `trace_id` key into an in-process map, following a replay-then-tail
//! startup sequence without requiring a second durable store underneath it.

use parking_lot::Mutex;
use rcab_core::{Clock, Event, TaskId, TraceId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One recorded event, with the fixed scalar fields spec.md §3 calls out
/// stored alongside the (possibly truncated) serialized payload.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredEvent {
    pub seq: u64,
    pub trace_id: TraceId,
    pub task_id: Option<TaskId>,
    pub name: &'static str,
    pub recorded_at_epoch_ms: u64,
    pub payload: serde_json::Value,
}

const BROADCAST_CAPACITY: usize = 1_024;

struct TraceLog {
    entries: VecDeque<StoredEvent>,
    next_seq: u64,
    dedup: HashMap<String, u64>,
    sender: broadcast::Sender<StoredEvent>,
    closed: Arc<AtomicBool>,
}

impl TraceLog {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            entries: VecDeque::new(),
            next_seq: 0,
            dedup: HashMap::new(),
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Per-trace append log with bounded retention and broadcast subscribers.
///
/// Generic over `C: Clock` (never `dyn Clock`: `Clock` carries `Clone` as a
/// supertrait, so it is not object-safe), taking the clock as a type
/// parameter rather than a trait object.
pub struct EventBus<C: Clock> {
    clock: C,
    max_len: usize,
    payload_max_bytes: usize,
    logs: Mutex<HashMap<TraceId, TraceLog>>,
}

/// Names of events that close a trace's stream to new appends once drained
/// (spec.md §4.1 "finite iff the trace has reached a terminal state").
fn is_trace_terminal(event: &Event) -> bool {
    matches!(event, Event::TraceCompleted { .. } | Event::TraceFailed { .. } | Event::TraceCancelled { .. })
}

impl<C: Clock> EventBus<C> {
    pub fn new(clock: C, max_len: usize, payload_max_bytes: usize) -> Self {
        Self { clock, max_len, payload_max_bytes, logs: Mutex::new(HashMap::new()) }
    }

    /// Append an event to `trace_id`'s stream, returning its sequence id.
    ///
    /// Idempotent per `(trace_id, dedup_key)` when a dedup key is supplied:
    /// a repeat append with a key already seen returns the original seq
    /// without creating a new entry or notifying subscribers again.
    pub fn append(&self, trace_id: TraceId, event: Event, dedup_key: Option<&str>) -> u64 {
        let mut logs = self.logs.lock();
        let log = logs.entry(trace_id).or_insert_with(TraceLog::new);

        if let Some(key) = dedup_key {
            if let Some(&seq) = log.dedup.get(key) {
                return seq;
            }
        }

        log.next_seq += 1;
        let seq = log.next_seq;
        let task_id = event.task_id();
        let name = event.name();
        let terminal = is_trace_terminal(&event);
        let payload = render_payload(&event, self.payload_max_bytes);

        let stored = StoredEvent {
            seq,
            trace_id,
            task_id,
            name,
            recorded_at_epoch_ms: self.clock.epoch_ms(),
            payload,
        };

        if let Some(key) = dedup_key {
            log.dedup.insert(key.to_string(), seq);
        }

        log.entries.push_back(stored.clone());
        while log.entries.len() > self.max_len {
            log.entries.pop_front();
        }

        // A lagging receiver is fine: subscribers replay from the backlog
        // before switching to live broadcast, so a dropped send reaches no
        // one who hasn't already seen it via replay.
        let _ = log.sender.send(stored);

        if terminal {
            log.closed.store(true, Ordering::Release);
        }

        seq
    }

    /// Returns up to `max` events strictly after `since_cursor`. `0` means
    /// from start. An empty trace (or a cursor at the tip) returns an empty
    /// list and the same cursor.
    pub fn read(&self, trace_id: TraceId, since_cursor: u64, max: usize) -> (Vec<StoredEvent>, u64) {
        let logs = self.logs.lock();
        let Some(log) = logs.get(&trace_id) else {
            return (Vec::new(), since_cursor);
        };
        let events: Vec<StoredEvent> =
            log.entries.iter().filter(|e| e.seq > since_cursor).take(max).cloned().collect();
        let next_cursor = events.last().map(|e| e.seq).unwrap_or(since_cursor);
        (events, next_cursor)
    }

    /// Subscribe from `since_cursor`, replaying retained backlog before
    /// switching to live broadcast. Restartable from any previously
    /// observed cursor as long as it is still within the retained window.
    pub fn subscribe(&self, trace_id: TraceId, since_cursor: u64) -> Subscription {
        let mut logs = self.logs.lock();
        let log = logs.entry(trace_id).or_insert_with(TraceLog::new);
        let replay: VecDeque<StoredEvent> =
            log.entries.iter().filter(|e| e.seq > since_cursor).cloned().collect();
        Subscription {
            replay,
            cursor: since_cursor,
            receiver: log.sender.subscribe(),
            closed: Arc::clone(&log.closed),
        }
    }
}

fn render_payload(event: &Event, max_bytes: usize) -> serde_json::Value {
    let full = serde_json::to_string(event).unwrap_or_default();
    if full.len() <= max_bytes {
        serde_json::to_value(event).unwrap_or(serde_json::Value::Null)
    } else {
        let mut truncated: String = full.chars().take(max_bytes).collect();
        truncated.push_str("...[truncated]");
        serde_json::Value::String(truncated)
    }
}

/// A restartable, lazy sequence of events for one trace.
pub struct Subscription {
    replay: VecDeque<StoredEvent>,
    cursor: u64,
    receiver: broadcast::Receiver<StoredEvent>,
    closed: Arc<AtomicBool>,
}

impl Subscription {
    /// Returns the next event, or `None` once the trace is terminal and
    /// every event up to the tip has been delivered.
    pub async fn next(&mut self) -> Option<StoredEvent> {
        if let Some(event) = self.replay.pop_front() {
            self.cursor = event.seq;
            return Some(event);
        }

        loop {
            if self.closed.load(Ordering::Acquire) {
                match self.receiver.try_recv() {
                    Ok(event) if event.seq > self.cursor => {
                        self.cursor = event.seq;
                        return Some(event);
                    }
                    Ok(_) => continue,
                    Err(_) => return None,
                }
            }

            match self.receiver.recv().await {
                Ok(event) if event.seq > self.cursor => {
                    self.cursor = event.seq;
                    return Some(event);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
