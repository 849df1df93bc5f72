// SPDX-License-Identifier: MIT

//! Wiring for the control-plane process: constructs the Task Store, Event
//! Bus, Resource Arbiter, Job Adapter, Scheduler and Pipeline Composer
//! (spec.md §2) into one `Service` handle and runs the scheduler's worker
//! pool / delayed-queue / cron drivers until shutdown.
//!
//! `main.rs` is the only thing that picks a concrete `JobAdapter` (the
//! Kubernetes one); everything here is generic over the adapter and clock
//! so tests can wire in fakes instead.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::sync::Arc;

use rcab_adapters::JobAdapter;
use rcab_arbiter::{NamespaceLock, TokenBucket};
use rcab_composer::{Composer, ComposerError, Submission, SubmissionResult};
use rcab_core::{Clock, Config};
use rcab_engine::executors::dispatch::ExecutorRegistry;
use rcab_engine::Scheduler;
use rcab_storage::{EventBus, RecordStore, TaskStore};
use tokio_util::sync::CancellationToken;

/// Bundles the wired-up control plane. The HTTP/CLI binding that turns
/// wire requests into calls on this handle is an external collaborator
/// (spec.md §1, §6) this crate never implements directly; a caller links
/// against this crate as a library for that purpose.
pub struct Service<A: JobAdapter, C: Clock> {
    scheduler: Arc<Scheduler<A, C>>,
    composer: Composer<A, C>,
    registry: Arc<ExecutorRegistry<A, C>>,
}

impl<A: JobAdapter, C: Clock> Service<A, C> {
    pub fn new(config: Config, adapter: Arc<A>, clock: C) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(TaskStore::new());
        let records = Arc::new(RecordStore::new());
        let bus = Arc::new(EventBus::new(
            clock.clone(),
            config.event_stream_max_len,
            config.event_payload_max_bytes,
        ));
        let namespace_lock = Arc::new(NamespaceLock::new(clock.clone()));
        let token_bucket = Arc::new(TokenBucket::new(clock.clone(), config.token_bucket_capacity));

        let scheduler = Scheduler::new(
            store,
            records,
            bus,
            namespace_lock,
            token_bucket,
            adapter,
            config,
            clock,
        );
        let composer = Composer::new(Arc::clone(&scheduler));
        let registry = Arc::new(ExecutorRegistry::standard());

        Self { scheduler, composer, registry }
    }

    /// Entry point for the (external, out-of-scope) Submission API binding
    /// (spec.md §6, §4.8).
    pub fn submit(&self, submission: Submission) -> Result<SubmissionResult, ComposerError> {
        self.composer.compose(submission)
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<A, C>> {
        &self.scheduler
    }

    /// Runs the worker pool, delayed-queue driver, cron driver and the
    /// callback router until `shutdown` fires (spec.md §5).
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let scheduler = Arc::clone(&self.scheduler);
        let registry = Arc::clone(&self.registry);
        scheduler.run(registry, shutdown).await;
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
