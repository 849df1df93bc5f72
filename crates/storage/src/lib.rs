// SPDX-License-Identifier: MIT

//! Durable-in-process storage for the control plane: the per-trace event
//! log (`bus`) and the task/trace/group materialized state (`tasks`), an
//! append-then-fold event-sourcing discipline built on an in-process,
//! `parking_lot`-guarded store.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bus;
pub mod error;
pub mod records;
pub mod tasks;

pub use bus::{EventBus, StoredEvent, Subscription};
pub use error::StorageError;
pub use records::RecordStore;
pub use tasks::{Pagination, TaskFilter, TaskStore};
