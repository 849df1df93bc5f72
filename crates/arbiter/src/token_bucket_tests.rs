// SPDX-License-Identifier: MIT

use super::*;
use rcab_core::FakeClock;
use std::time::Duration;

fn ids() -> (TaskId, TraceId) {
    (TaskId::new(), TraceId::new())
}

#[test]
fn try_acquire_respects_capacity() {
    let bucket = TokenBucket::new(FakeClock::new(), 2);
    let (t1, tr1) = ids();
    let (t2, tr2) = ids();
    let (t3, tr3) = ids();

    assert!(bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(60)).acquired);
    assert!(bucket.try_acquire(Category::Build, t2, tr2, Duration::from_secs(60)).acquired);
    let third = bucket.try_acquire(Category::Build, t3, tr3, Duration::from_secs(60));
    assert!(!third.acquired);
    assert_eq!(bucket.live_lease_count(Category::Build), 2);
}

#[test]
fn categories_are_independent_buckets() {
    let bucket = TokenBucket::new(FakeClock::new(), 1);
    let (t1, tr1) = ids();
    let (t2, tr2) = ids();
    assert!(bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(60)).acquired);
    assert!(bucket.try_acquire(Category::Execute, t2, tr2, Duration::from_secs(60)).acquired);
}

#[test]
fn try_acquire_then_release_leaves_leases_unchanged() {
    let bucket = TokenBucket::new(FakeClock::new(), 1);
    let (t1, tr1) = ids();
    assert!(bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(60)).acquired);
    assert_eq!(bucket.live_lease_count(Category::Build), 1);
    bucket.release(Category::Build, t1, tr1);
    assert_eq!(bucket.live_lease_count(Category::Build), 0);
}

#[test]
fn release_is_idempotent() {
    let bucket = TokenBucket::new(FakeClock::new(), 1);
    let (t1, tr1) = ids();
    bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(60));
    bucket.release(Category::Build, t1, tr1);
    bucket.release(Category::Build, t1, tr1); // no-op, not held
    assert_eq!(bucket.live_lease_count(Category::Build), 0);
}

#[test]
fn expired_lease_is_force_reclaimed() {
    let clock = FakeClock::new();
    let bucket = TokenBucket::new(clock.clone(), 1);
    let (t1, tr1) = ids();
    let (t2, tr2) = ids();
    bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(5));
    clock.advance(Duration::from_secs(10));
    let result = bucket.try_acquire(Category::Build, t2, tr2, Duration::from_secs(60));
    assert!(result.acquired);
    assert!(result.reclaimed_expired);
}

#[tokio::test(start_paused = true)]
async fn wait_for_token_unblocks_on_release() {
    let clock = FakeClock::new();
    let bucket = std::sync::Arc::new(TokenBucket::new(clock, 1));
    let (t1, tr1) = ids();
    let (t2, tr2) = ids();
    bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(600));

    let waiter_bucket = bucket.clone();
    let cancel = tokio_util::sync::CancellationToken::new();
    let waiter_cancel = cancel.clone();
    let waiter = tokio::spawn(async move {
        waiter_bucket
            .wait_for_token(Category::Build, t2, tr2, Duration::from_secs(600), Duration::from_secs(30), &waiter_cancel)
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    bucket.release(Category::Build, t1, tr1);

    let result = waiter.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn wait_for_token_times_out_when_never_freed() {
    let clock = FakeClock::new();
    let bucket = TokenBucket::new(clock, 1);
    let (t1, tr1) = ids();
    let (t2, tr2) = ids();
    bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(600));

    let cancel = tokio_util::sync::CancellationToken::new();
    let result = bucket
        .wait_for_token(Category::Build, t2, tr2, Duration::from_secs(600), Duration::from_millis(500), &cancel)
        .await;
    assert!(matches!(result, Err(ArbiterError::TokenWaitTimeout(_))));
}

#[tokio::test(start_paused = true)]
async fn wait_for_token_stops_on_cancellation() {
    let clock = FakeClock::new();
    let bucket = TokenBucket::new(clock, 1);
    let (t1, tr1) = ids();
    let (t2, tr2) = ids();
    bucket.try_acquire(Category::Build, t1, tr1, Duration::from_secs(600));

    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();
    let result = bucket
        .wait_for_token(Category::Build, t2, tr2, Duration::from_secs(600), Duration::from_secs(30), &cancel)
        .await;
    assert!(matches!(result, Err(ArbiterError::Cancelled)));
}
