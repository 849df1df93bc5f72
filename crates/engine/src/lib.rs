// SPDX-License-Identifier: MIT

//! The execution engine (spec.md §4.4-§4.6, component C4): the scheduler
//! itself, the six stock executors it dispatches to, the callback router
//! that turns Job Adapter lifecycle events back into task-store
//! transitions, and the delayed/cron queue drivers that feed it.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod error;
pub mod executor;
pub mod executors;
pub mod queues;
pub mod scheduler;
pub mod trace_finalize;

#[cfg(test)]
mod test_support;

pub use context::{deadline_for, TaskContext};
pub use error::{ExecutorError, SchedulerError};
pub use executor::{ExecOutcome, Executor};
pub use executors::dispatch::ExecutorRegistry;
pub use scheduler::{Scheduler, DEFAULT_RESCHEDULE_RANGE};
