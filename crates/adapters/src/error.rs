// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Job Adapter errors (spec.md §4.6, §7).
///
/// `Create*` variants are returned from `create_job`/`create_injection`
/// itself — a failure to even submit the resource, which spec.md §4.6
/// requires be "surfaced as create failures, not as job failures". Job
/// *failures* (the resource was created but its pods exited non-zero, or
/// the orchestrator reported a non-retryable terminal state) arrive later
/// through the `on_job_failed`/`on_injection_failed` lifecycle callback, not
/// through this type.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("transient orchestrator error creating {0}: {1}")]
    CreateTransient(String, String),

    #[error("permanent error creating {0}: {1}")]
    CreatePermanent(String, String),

    #[error("watch stream error: {0}")]
    Watch(String),

    #[error("log retrieval failed for {0}: {1}")]
    LogRetrieval(String, String),
}

impl AdapterError {
    /// Whether the scheduler should treat this as retryable (spec.md §7
    /// `TransientResourceError`) as opposed to terminal
    /// (`PermanentExecutorError`).
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::CreateTransient(..) | AdapterError::Watch(_))
    }
}
