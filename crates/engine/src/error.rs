// SPDX-License-Identifier: MIT

//! Scheduler- and executor-facing error types (spec.md §7).

use rcab_core::{TaskError, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Storage(#[from] rcab_storage::StorageError),

    #[error("task {0} is already running or terminal, cannot re-admit")]
    NotPending(TaskId),

    #[error("cron expression `{0}` is invalid: {1}")]
    InvalidCron(String, String),
}

/// Per-taxonomy-member executor error (spec.md §7), mirroring `TaskError`
/// field-for-field so the scheduler matches on taxonomy rather than string
/// content, while letting each executor attach its own context before it
/// crosses back into the shared `TaskError` type the storage layer and
/// event bus deal in.
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient resource unavailable: {0}")]
    Transient(String),

    #[error("permanent executor error: {0}")]
    Permanent(String),

    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("infrastructure error: {0}")]
    Infra(String),
}

impl ExecutorError {
    /// Whether the scheduler should consult the task's retry policy, as
    /// opposed to going straight to ERROR (spec.md §7).
    pub fn is_retryable_class(&self) -> bool {
        matches!(self, ExecutorError::Transient(_) | ExecutorError::JobFailed(_) | ExecutorError::Infra(_))
    }
}

impl From<ExecutorError> for TaskError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Validation(m) => TaskError::Validation(m),
            ExecutorError::Transient(m) => TaskError::Transient(m),
            ExecutorError::Permanent(m) => TaskError::Permanent(m),
            ExecutorError::JobFailed(m) => TaskError::JobFailure(m),
            ExecutorError::Infra(m) => TaskError::Infra(m),
        }
    }
}

impl From<rcab_adapters::AdapterError> for ExecutorError {
    fn from(err: rcab_adapters::AdapterError) -> Self {
        if err.is_transient() {
            ExecutorError::Transient(err.to_string())
        } else {
            ExecutorError::Permanent(err.to_string())
        }
    }
}

impl From<rcab_arbiter::ArbiterError> for ExecutorError {
    fn from(err: rcab_arbiter::ArbiterError) -> Self {
        ExecutorError::Transient(err.to_string())
    }
}

impl From<rcab_core::task::payload::PayloadError> for ExecutorError {
    fn from(err: rcab_core::task::payload::PayloadError) -> Self {
        ExecutorError::Validation(err.to_string())
    }
}
