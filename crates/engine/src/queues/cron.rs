// SPDX-License-Identifier: MIT

//! Cron queue: a periodic emitter that, on each firing, hands a fresh
//! `TaskConfig` to the scheduler for admission into ready or delayed
//! (spec.md §4.4 "cron").

use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use rcab_core::{Clock, TaskConfig};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;

const IDLE_SLEEP: Duration = Duration::from_secs(3600);

struct CronEntry {
    schedule: Schedule,
    template: TaskConfig,
    next_fire_epoch_ms: u64,
}

fn next_fire_after(schedule: &Schedule, after_epoch_ms: u64) -> u64 {
    let after = DateTime::<Utc>::from_timestamp_millis(after_epoch_ms as i64).unwrap_or_else(Utc::now);
    schedule.after(&after).next().map(|dt| dt.timestamp_millis() as u64).unwrap_or(u64::MAX)
}

/// Registered cron-backed task templates, keyed by a monotonically
/// increasing registration id.
#[derive(Default)]
pub struct CronRegistry {
    entries: Mutex<HashMap<u64, CronEntry>>,
    next_id: Mutex<u64>,
    notify: Notify,
}

impl CronRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        cron_expr: &str,
        template: TaskConfig,
        now_epoch_ms: u64,
    ) -> Result<(), SchedulerError> {
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|err| SchedulerError::InvalidCron(cron_expr.to_string(), err.to_string()))?;
        let next_fire_epoch_ms = next_fire_after(&schedule, now_epoch_ms);

        let mut next_id = self.next_id.lock();
        *next_id += 1;
        let id = *next_id;
        drop(next_id);

        self.entries.lock().insert(id, CronEntry { schedule, template, next_fire_epoch_ms });
        self.notify.notify_one();
        Ok(())
    }

    fn drain_due(&self, now_epoch_ms: u64) -> Vec<TaskConfig> {
        let mut entries = self.entries.lock();
        let mut due = Vec::new();
        for entry in entries.values_mut() {
            while entry.next_fire_epoch_ms <= now_epoch_ms {
                due.push(entry.template.clone());
                entry.next_fire_epoch_ms = next_fire_after(&entry.schedule, entry.next_fire_epoch_ms + 1);
            }
        }
        due
    }

    fn next_deadline_ms(&self) -> Option<u64> {
        self.entries.lock().values().map(|e| e.next_fire_epoch_ms).min()
    }

    pub fn registered_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Runs until `cancel` fires, handing each firing's fresh `TaskConfig`
    /// to `fire_tx`.
    pub async fn run<C: Clock>(
        &self,
        clock: &C,
        fire_tx: mpsc::UnboundedSender<TaskConfig>,
        cancel: CancellationToken,
    ) {
        loop {
            let now_ms = clock.epoch_ms();
            for template in self.drain_due(now_ms) {
                let _ = fire_tx.send(template);
            }

            let wait = match self.next_deadline_ms() {
                Some(deadline_ms) if deadline_ms > now_ms => {
                    Duration::from_millis(deadline_ms - now_ms)
                }
                Some(_) => Duration::ZERO,
                None => IDLE_SLEEP,
            };

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => continue,
                _ = self.notify.notified() => continue,
            }
        }
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
