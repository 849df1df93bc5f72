// SPDX-License-Identifier: MIT

//! The Job Adapter's outward event surface (spec.md §4.6: `on_job_added`,
//! `on_job_succeeded`, `on_job_failed`, `on_injection_added`,
//! `on_injection_succeeded`, `on_injection_failed`). Each callback receives
//! the full annotation and label map so callers can reconstruct trace
//! context and identify the owning task without a second round-trip.

use std::collections::BTreeMap;

/// One lifecycle callback, delivered from the adapter's watch loop.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    JobAdded { job_name: String, labels: BTreeMap<String, String>, annotations: BTreeMap<String, String> },
    JobSucceeded { job_name: String, labels: BTreeMap<String, String>, annotations: BTreeMap<String, String> },
    JobFailed {
        job_name: String,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
        reason: String,
        /// Bounded container logs pulled per spec.md §4.6 "Log retrieval".
        logs: Option<String>,
    },
    InjectionAdded { name: String, labels: BTreeMap<String, String>, annotations: BTreeMap<String, String> },
    InjectionSucceeded {
        name: String,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
        start_time_epoch_ms: u64,
        end_time_epoch_ms: u64,
    },
    InjectionFailed {
        name: String,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
        reason: String,
    },
}

impl LifecycleEvent {
    pub fn labels(&self) -> &BTreeMap<String, String> {
        match self {
            LifecycleEvent::JobAdded { labels, .. }
            | LifecycleEvent::JobSucceeded { labels, .. }
            | LifecycleEvent::JobFailed { labels, .. }
            | LifecycleEvent::InjectionAdded { labels, .. }
            | LifecycleEvent::InjectionSucceeded { labels, .. }
            | LifecycleEvent::InjectionFailed { labels, .. } => labels,
        }
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        match self {
            LifecycleEvent::JobAdded { annotations, .. }
            | LifecycleEvent::JobSucceeded { annotations, .. }
            | LifecycleEvent::JobFailed { annotations, .. }
            | LifecycleEvent::InjectionAdded { annotations, .. }
            | LifecycleEvent::InjectionSucceeded { annotations, .. }
            | LifecycleEvent::InjectionFailed { annotations, .. } => annotations,
        }
    }

    /// Convenience accessor for the `task_id` mandatory label (spec.md §4.6).
    pub fn task_id_label(&self) -> Option<&str> {
        self.labels().get("task_id").map(String::as_str)
    }
}
