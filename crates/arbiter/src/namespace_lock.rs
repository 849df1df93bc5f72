// SPDX-License-Identifier: MIT

//! Namespace mutual-exclusion lock with expiry (spec.md §4.2 "Namespace
//! lock"). Keyed logically as `lock:ns:{namespace}` (spec.md §6).

use parking_lot::Mutex;
use rcab_core::Clock;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of an `acquire` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// No live holder existed (or the previous one expired); `holder` now owns it.
    Acquired { reclaimed_expired: bool },
    /// A different, still-live holder owns the namespace.
    HeldByOther,
    /// `holder` already owned it; the expiry was refreshed (idempotent re-acquisition).
    SameHolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Ok,
    /// The caller was not the current holder; stale releases never steal locks.
    NotHolder,
}

#[derive(Debug, Clone)]
struct LockEntry {
    holder: String,
    acquired_at_epoch_ms: u64,
    expires_at_epoch_ms: u64,
}

/// At most one live holder per namespace at any instant (spec.md §8 invariant).
pub struct NamespaceLock<C: Clock> {
    clock: C,
    entries: Mutex<HashMap<String, LockEntry>>,
}

impl<C: Clock> NamespaceLock<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, entries: Mutex::new(HashMap::new()) }
    }

    fn is_expired(&self, entry: &LockEntry, now_ms: u64) -> bool {
        now_ms >= entry.expires_at_epoch_ms
    }

    pub fn acquire(&self, namespace: &str, holder: &str, ttl: Duration) -> AcquireOutcome {
        let now_ms = self.clock.epoch_ms();
        let expires_at = now_ms + ttl.as_millis() as u64;
        let mut entries = self.entries.lock();

        match entries.get(namespace) {
            Some(entry) if entry.holder == holder => {
                entries.insert(
                    namespace.to_string(),
                    LockEntry {
                        holder: holder.to_string(),
                        acquired_at_epoch_ms: entry.acquired_at_epoch_ms,
                        expires_at_epoch_ms: expires_at,
                    },
                );
                AcquireOutcome::SameHolder
            }
            Some(entry) if !self.is_expired(entry, now_ms) => AcquireOutcome::HeldByOther,
            Some(_) => {
                entries.insert(
                    namespace.to_string(),
                    LockEntry {
                        holder: holder.to_string(),
                        acquired_at_epoch_ms: now_ms,
                        expires_at_epoch_ms: expires_at,
                    },
                );
                AcquireOutcome::Acquired { reclaimed_expired: true }
            }
            None => {
                entries.insert(
                    namespace.to_string(),
                    LockEntry {
                        holder: holder.to_string(),
                        acquired_at_epoch_ms: now_ms,
                        expires_at_epoch_ms: expires_at,
                    },
                );
                AcquireOutcome::Acquired { reclaimed_expired: false }
            }
        }
    }

    /// No-op if the caller is not the current holder (spec.md §4.2:
    /// "stale releases never steal locks"). A release against an already
    /// expired-and-reassigned lock also reports `NotHolder`.
    pub fn release(&self, namespace: &str, holder: &str) -> ReleaseOutcome {
        let mut entries = self.entries.lock();
        match entries.get(namespace) {
            Some(entry) if entry.holder == holder => {
                entries.remove(namespace);
                ReleaseOutcome::Ok
            }
            _ => ReleaseOutcome::NotHolder,
        }
    }

    /// True if `namespace` currently has a live (non-expired) holder.
    pub fn is_held(&self, namespace: &str) -> bool {
        let now_ms = self.clock.epoch_ms();
        self.entries.lock().get(namespace).is_some_and(|entry| !self.is_expired(entry, now_ms))
    }

    pub fn current_holder(&self, namespace: &str) -> Option<String> {
        let now_ms = self.clock.epoch_ms();
        self.entries
            .lock()
            .get(namespace)
            .filter(|entry| !self.is_expired(entry, now_ms))
            .map(|entry| entry.holder.clone())
    }
}

#[cfg(test)]
#[path = "namespace_lock_tests.rs"]
mod tests;
