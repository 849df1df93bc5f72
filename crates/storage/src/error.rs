// SPDX-License-Identifier: MIT

use rcab_core::{GroupId, TaskId, TaskState, TraceId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("task {0} already exists")]
    TaskAlreadyExists(TaskId),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("trace {0} already exists")]
    TraceAlreadyExists(TraceId),

    #[error("trace {0} not found")]
    TraceNotFound(TraceId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("illegal transition for task {task_id}: {from} -> {to}")]
    TransitionInvalid { task_id: TaskId, from: TaskState, to: TaskState },

    #[error("page size must be one of 10, 20, 50; got {0}")]
    InvalidPageSize(u32),
}
