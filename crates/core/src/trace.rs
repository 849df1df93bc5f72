// SPDX-License-Identifier: MIT

//! Trace: one pipeline of causally linked tasks (spec.md §3 "Trace").

use crate::group::GroupId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a trace. Carried by every task in the pipeline.
    pub struct TraceId("trc");
}

/// What kind of pipeline this trace implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceType {
    DatapackBuild,
    AlgorithmRun,
    FullPipeline,
}

crate::simple_display! {
    TraceType {
        DatapackBuild => "datapack_build",
        AlgorithmRun => "algorithm_run",
        FullPipeline => "full_pipeline",
    }
}

/// Trace-level status (spec.md §3: "trace completes iff all leaves are
/// terminal; trace fails as soon as any leaf fails and no retry remains").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TraceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceState::Completed | TraceState::Failed | TraceState::Cancelled)
    }
}

crate::simple_display! {
    TraceState {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// A single pipeline instance: the ordered chain of tasks implementing one
/// user-facing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: TraceId,
    pub trace_type: TraceType,
    pub group_id: GroupId,
    pub project_id: String,
    /// Expected count of terminal leaf tasks (spec.md §3, §4.8).
    pub leaf_num: u32,
    /// Leaf tasks that have reached a terminal state so far.
    pub terminal_leaves: Vec<TaskId>,
    pub state: TraceState,
    pub started_at_epoch_ms: u64,
    pub ended_at_epoch_ms: Option<u64>,
    /// Every task id that has ever belonged to this trace, insertion order.
    pub task_ids: Vec<TaskId>,
}

impl Trace {
    pub fn new(
        trace_type: TraceType,
        group_id: GroupId,
        project_id: impl Into<String>,
        leaf_num: u32,
        started_at_epoch_ms: u64,
    ) -> Self {
        Self {
            id: TraceId::new(),
            trace_type,
            group_id,
            project_id: project_id.into(),
            leaf_num,
            terminal_leaves: Vec::new(),
            state: TraceState::Running,
            started_at_epoch_ms,
            ended_at_epoch_ms: None,
            task_ids: Vec::new(),
        }
    }

    pub fn record_task(&mut self, task_id: TaskId) {
        if !self.task_ids.contains(&task_id) {
            self.task_ids.push(task_id);
        }
    }

    /// Mark a leaf task terminal. Returns the trace's new state if this
    /// transition changed it, per spec.md §3's invariant: the trace
    /// completes once every declared leaf has reached a terminal state, and
    /// fails the instant any leaf fails (without waiting for the rest).
    pub fn record_leaf_terminal(
        &mut self,
        task_id: TaskId,
        leaf_failed: bool,
        at_epoch_ms: u64,
    ) -> Option<TraceState> {
        if self.state.is_terminal() {
            return None;
        }
        if !self.terminal_leaves.contains(&task_id) {
            self.terminal_leaves.push(task_id);
        }

        if leaf_failed {
            self.state = TraceState::Failed;
            self.ended_at_epoch_ms = Some(at_epoch_ms);
            return Some(self.state);
        }

        if self.terminal_leaves.len() as u32 >= self.leaf_num {
            self.state = TraceState::Completed;
            self.ended_at_epoch_ms = Some(at_epoch_ms);
            return Some(self.state);
        }

        None
    }

    pub fn cancel(&mut self, at_epoch_ms: u64) {
        if !self.state.is_terminal() {
            self.state = TraceState::Cancelled;
            self.ended_at_epoch_ms = Some(at_epoch_ms);
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
