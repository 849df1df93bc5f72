// SPDX-License-Identifier: MIT

//! In-process fake Job Adapter for engine tests, gated behind the
//! `test-support` feature so dependent crates can exercise scheduler/
//! executor logic without a cluster.

use crate::error::AdapterError;
use crate::job_adapter::JobAdapter;
use crate::lifecycle::LifecycleEvent;
use crate::spec::{InjectionSpec, JobSpec};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct CreatedJob {
    pub job_name: String,
    pub spec: std::sync::Arc<JobSpec>,
}

/// Records every call so tests can assert on what was created, and lets the
/// test drive lifecycle callbacks explicitly via `complete_job`/`fail_job`.
pub struct FakeJobAdapter {
    created_jobs: Mutex<Vec<CreatedJob>>,
    created_injections: Mutex<Vec<InjectionSpec>>,
    deleted: Mutex<Vec<String>>,
    sender: broadcast::Sender<LifecycleEvent>,
    /// When set, `create_job`/`create_injection` return this error instead
    /// of succeeding — simulates a transient orchestrator outage.
    fail_creates_with: Mutex<Option<String>>,
}

impl Default for FakeJobAdapter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            created_jobs: Mutex::new(Vec::new()),
            created_injections: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            sender,
            fail_creates_with: Mutex::new(None),
        }
    }
}

impl FakeJobAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_creates(&self, reason: Option<&str>) {
        *self.fail_creates_with.lock() = reason.map(str::to_string);
    }

    pub fn created_jobs(&self) -> Vec<CreatedJob> {
        self.created_jobs.lock().clone()
    }

    pub fn created_injections(&self) -> Vec<InjectionSpec> {
        self.created_injections.lock().clone()
    }

    pub fn deleted_jobs(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn emit(&self, event: LifecycleEvent) {
        let _ = self.sender.send(event);
    }

    pub fn complete_job(&self, spec: &JobSpec) {
        self.emit(LifecycleEvent::JobSucceeded {
            job_name: spec.job_name(),
            labels: spec.labels.clone(),
            annotations: spec.annotations.clone(),
        });
    }

    pub fn fail_job(&self, spec: &JobSpec, reason: &str) {
        self.emit(LifecycleEvent::JobFailed {
            job_name: spec.job_name(),
            labels: spec.labels.clone(),
            annotations: spec.annotations.clone(),
            reason: reason.to_string(),
            logs: Some("fake job logs".to_string()),
        });
    }

    pub fn succeed_injection(&self, spec: &InjectionSpec, start_ms: u64, end_ms: u64) {
        self.emit(LifecycleEvent::InjectionSucceeded {
            name: spec.injection_name(),
            labels: spec.labels.clone(),
            annotations: spec.annotations.clone(),
            start_time_epoch_ms: start_ms,
            end_time_epoch_ms: end_ms,
        });
    }

    pub fn fail_injection(&self, spec: &InjectionSpec, reason: &str) {
        self.emit(LifecycleEvent::InjectionFailed {
            name: spec.injection_name(),
            labels: spec.labels.clone(),
            annotations: spec.annotations.clone(),
            reason: reason.to_string(),
        });
    }
}

#[async_trait]
impl JobAdapter for FakeJobAdapter {
    async fn create_job(&self, spec: JobSpec) -> Result<(), AdapterError> {
        if let Some(reason) = self.fail_creates_with.lock().clone() {
            return Err(AdapterError::CreateTransient(spec.job_name(), reason));
        }
        let job_name = spec.job_name();
        let mut jobs = self.created_jobs.lock();
        if jobs.iter().any(|j| j.job_name == job_name) {
            return Ok(()); // idempotent creation
        }
        jobs.push(CreatedJob { job_name: job_name.clone(), spec: std::sync::Arc::new(spec.clone()) });
        drop(jobs);
        self.emit(LifecycleEvent::JobAdded {
            job_name,
            labels: spec.labels,
            annotations: spec.annotations,
        });
        Ok(())
    }

    async fn create_injection(&self, spec: InjectionSpec) -> Result<(), AdapterError> {
        if let Some(reason) = self.fail_creates_with.lock().clone() {
            return Err(AdapterError::CreateTransient(spec.injection_name(), reason));
        }
        let name = spec.injection_name();
        let mut injections = self.created_injections.lock();
        if injections.iter().any(|i| i.injection_name() == name) {
            return Ok(());
        }
        injections.push(spec.clone());
        drop(injections);
        self.emit(LifecycleEvent::InjectionAdded {
            name,
            labels: spec.labels,
            annotations: spec.annotations,
        });
        Ok(())
    }

    async fn delete_job(&self, job_name: &str) {
        self.deleted.lock().push(job_name.to_string());
    }

    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
