// SPDX-License-Identifier: MIT

use super::*;
use rcab_core::FakeClock;
use std::time::Duration;

#[test]
fn first_acquire_succeeds() {
    let lock = NamespaceLock::new(FakeClock::new());
    assert_eq!(
        lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(60)),
        AcquireOutcome::Acquired { reclaimed_expired: false }
    );
    assert!(lock.is_held("ts-ns-0"));
}

#[test]
fn second_holder_is_rejected_while_live() {
    let lock = NamespaceLock::new(FakeClock::new());
    lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(60));
    assert_eq!(lock.acquire("ts-ns-0", "trace-b", Duration::from_secs(60)), AcquireOutcome::HeldByOther);
}

#[test]
fn same_holder_reacquire_is_idempotent_and_refreshes_expiry() {
    let clock = FakeClock::new();
    let lock = NamespaceLock::new(clock.clone());
    lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(10));
    clock.advance(Duration::from_secs(8));
    assert_eq!(lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(10)), AcquireOutcome::SameHolder);
    clock.advance(Duration::from_secs(8));
    // Had the expiry not refreshed, 16s past a 10s ttl would have expired it.
    assert!(lock.is_held("ts-ns-0"));
}

#[test]
fn expired_lock_is_reclaimable_without_consent() {
    let clock = FakeClock::new();
    let lock = NamespaceLock::new(clock.clone());
    lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(5));
    clock.advance(Duration::from_secs(6));
    assert_eq!(
        lock.acquire("ts-ns-0", "trace-b", Duration::from_secs(60)),
        AcquireOutcome::Acquired { reclaimed_expired: true }
    );
    assert_eq!(lock.current_holder("ts-ns-0").as_deref(), Some("trace-b"));
}

#[test]
fn release_by_non_holder_is_a_no_op() {
    let lock = NamespaceLock::new(FakeClock::new());
    lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(60));
    assert_eq!(lock.release("ts-ns-0", "trace-b"), ReleaseOutcome::NotHolder);
    assert!(lock.is_held("ts-ns-0"));
}

#[test]
fn acquire_then_release_round_trips_to_pre_acquire_state() {
    let lock = NamespaceLock::new(FakeClock::new());
    assert!(!lock.is_held("ts-ns-0"));
    lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(60));
    assert_eq!(lock.release("ts-ns-0", "trace-a"), ReleaseOutcome::Ok);
    assert!(!lock.is_held("ts-ns-0"));
}

#[test]
fn namespaces_are_independent() {
    let lock = NamespaceLock::new(FakeClock::new());
    lock.acquire("ts-ns-0", "trace-a", Duration::from_secs(60));
    assert_eq!(
        lock.acquire("ts-ns-1", "trace-b", Duration::from_secs(60)),
        AcquireOutcome::Acquired { reclaimed_expired: false }
    );
}
