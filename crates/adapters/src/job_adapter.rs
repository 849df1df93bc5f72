// SPDX-License-Identifier: MIT

//! The `JobAdapter` contract (spec.md §4.6): two inward operations plus an
//! outward lifecycle event stream, generalized over a `tokio::sync::mpsc`
//! receiver so callers poll it the same way regardless of which concrete
//! adapter (Kubernetes, fake) is wired in.

use crate::error::AdapterError;
use crate::lifecycle::LifecycleEvent;
use crate::spec::{InjectionSpec, JobSpec};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Translates executor intents into orchestrator jobs and ingests
/// orchestrator lifecycle callbacks (spec.md §4.6, C6 in §2's component
/// table).
#[async_trait]
pub trait JobAdapter: Send + Sync + 'static {
    /// Job name equals `task_id` (idempotent creation): calling this twice
    /// with the same `task_id` MUST NOT create a second resource.
    async fn create_job(&self, spec: JobSpec) -> Result<(), AdapterError>;

    /// Creates the fault-injection custom resource described by `spec`.
    async fn create_injection(&self, spec: InjectionSpec) -> Result<(), AdapterError>;

    /// Best-effort deletion of the outstanding orchestrator resource for a
    /// cancelled task (spec.md §5 "Cancellation").
    async fn delete_job(&self, job_name: &str);

    /// Subscribe to this adapter's lifecycle callbacks. Each call returns an
    /// independent receiver fed from the adapter's single underlying watch
    /// loop.
    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent>;
}
