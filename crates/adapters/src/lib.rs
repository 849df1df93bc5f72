// SPDX-License-Identifier: MIT

//! Job Adapter (spec.md §4.6, component C6): translates executor intents
//! into orchestrator jobs/injections and ingests lifecycle callbacks back
//! into a typed event stream via one trait with pluggable backends.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod job_adapter;
pub mod kube_adapter;
pub mod lifecycle;
pub mod logs;
pub mod spec;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use error::AdapterError;
pub use job_adapter::JobAdapter;
pub use kube_adapter::{InjectionResourceKind, KubeJobAdapter};
pub use lifecycle::LifecycleEvent;
pub use spec::{job_name_for_task, mandatory_annotations, mandatory_labels, InjectionSpec, JobSpec};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeJobAdapter;
