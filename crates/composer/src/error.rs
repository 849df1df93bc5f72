// SPDX-License-Identifier: MIT

//! Composer-facing errors (spec.md §4.8, §7 `ValidationError`: "surfaced
//! synchronously to the submitter, no side effects").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("submission has no items")]
    EmptySubmission,

    #[error("algorithm run item {0} lists no algorithms")]
    NoAlgorithms(usize),

    #[error(
        "injection items {a} and {b} both target namespace `{namespace}` with overlapping windows"
    )]
    OverlappingInjection { a: usize, b: usize, namespace: String },

    #[error(transparent)]
    Scheduler(#[from] rcab_engine::SchedulerError),

    #[error(transparent)]
    Storage(#[from] rcab_storage::StorageError),
}
