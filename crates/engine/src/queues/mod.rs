// SPDX-License-Identifier: MIT

//! The scheduler's three logical queues (spec.md §4.4): ready is a plain
//! `tokio::sync::mpsc` channel owned directly by `Scheduler`; delayed and
//! cron each get their own single-driver module here.

pub mod cron;
pub mod delayed;

pub use cron::CronRegistry;
pub use delayed::DelayedQueue;
