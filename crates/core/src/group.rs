// SPDX-License-Identifier: MIT

//! Group: one submission's bundle of traces (spec.md §3 "Group").

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

crate::define_id! {
    /// Unique identifier for a group. Constant on every child trace and task.
    pub struct GroupId("grp");
}

/// A batch of traces submitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub project_id: String,
    pub created_at_epoch_ms: u64,
    /// Traces belonging to this group.
    pub members: HashSet<crate::trace::TraceId>,
}

impl Group {
    pub fn new(project_id: impl Into<String>, created_at_epoch_ms: u64) -> Self {
        Self {
            id: GroupId::new(),
            project_id: project_id.into(),
            created_at_epoch_ms,
            members: HashSet::new(),
        }
    }

    pub fn add_member(&mut self, trace_id: crate::trace::TraceId) {
        self.members.insert(trace_id);
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
