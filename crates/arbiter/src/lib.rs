// SPDX-License-Identifier: MIT

//! Resource arbiter: namespace exclusivity locks and category token buckets
//! (spec.md §4.2). Process-local, backed by the same `Clock` abstraction
//! `rcab-core` uses elsewhere so expiry is deterministically testable; §9
//! notes these are designed to be backed by a shared key-value store so
//! multiple control-plane replicas could one day cooperate, but no such
//! backend is wired up here (§1 non-goal: single logical scheduler instance).

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod namespace_lock;
pub mod token_bucket;

pub use error::ArbiterError;
pub use namespace_lock::{AcquireOutcome, NamespaceLock, ReleaseOutcome};
pub use token_bucket::{Category, TokenBucket, TryAcquireResult};
