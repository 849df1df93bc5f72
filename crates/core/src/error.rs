// SPDX-License-Identifier: MIT

//! Core error taxonomy (spec.md §7).
//!
//! Every crate in this workspace defines its own `thiserror` error enum for
//! its own concerns, but executor-facing failures are always classified into
//! one of these five taxonomy members so the scheduler can decide retry vs.
//! terminal without string-sniffing a message.

use thiserror::Error;

/// The five-member error taxonomy from spec.md §7.
///
/// `ValidationError` is surfaced synchronously and never retried.
/// `TransientResourceError` and `InfraError` are retried/rescheduled.
/// `PermanentExecutorError` and `JobFailure` go to ERROR, the latter only
/// after the task's retry policy is consulted.
#[derive(Debug, Error, Clone)]
pub enum TaskError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient resource unavailable: {0}")]
    Transient(String),

    #[error("permanent executor error: {0}")]
    Permanent(String),

    #[error("job failed: {0}")]
    JobFailure(String),

    #[error("infrastructure error: {0}")]
    Infra(String),
}

impl TaskError {
    /// Whether the scheduler should consult the retry policy for this error,
    /// as opposed to going straight to ERROR (Permanent) or being dropped
    /// entirely at admission (Validation).
    pub fn is_retryable_class(&self) -> bool {
        matches!(self, TaskError::Transient(_) | TaskError::JobFailure(_) | TaskError::Infra(_))
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("illegal state transition: {from} -> {to}")]
    TransitionInvalid { from: String, to: String },

    #[error("invalid carrier encoding: {0}")]
    InvalidCarrier(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Task(#[from] TaskError),
}
