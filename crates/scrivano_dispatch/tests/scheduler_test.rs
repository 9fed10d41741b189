//! Scheduler and pool behavior: rotation, exclusion, and wait computation.

use scrivano_dispatch::{CredentialPool, DispatchPolicy, Schedule, Scheduler};
use std::time::Duration;
use tokio::time::Instant;

fn policy() -> DispatchPolicy {
    DispatchPolicy {
        max_requests_per_credential: 10,
        window_secs: 60,
        min_interval_ms: 0,
        failure_threshold: 3,
        ..DispatchPolicy::default()
    }
}

fn pool(keys: &[&str], policy: DispatchPolicy) -> CredentialPool {
    CredentialPool::new(keys.iter().map(|k| k.to_string()).collect(), policy).unwrap()
}

fn lease_slot(scheduler: &mut Scheduler, now: Instant) -> usize {
    match scheduler.acquire(now) {
        Schedule::Ready(lease) => lease.slot,
        other => panic!("expected a lease, got {:?}", other),
    }
}

#[test]
fn empty_credential_list_is_rejected() {
    let err = CredentialPool::new(vec![], policy()).unwrap_err();
    assert!(err.message.contains("empty"));
}

#[test]
fn blank_credential_is_rejected() {
    let err = CredentialPool::new(vec!["good".to_string(), "  ".to_string()], policy());
    assert!(err.is_err());
}

#[tokio::test(start_paused = true)]
async fn rotation_spreads_leases_across_the_pool() {
    let mut scheduler = Scheduler::new(pool(&["a", "b", "c"], policy()));
    let now = Instant::now();

    assert_eq!(lease_slot(&mut scheduler, now), 0);
    assert_eq!(lease_slot(&mut scheduler, now), 1);
    assert_eq!(lease_slot(&mut scheduler, now), 2);
    // Pointer wraps back to the start.
    assert_eq!(lease_slot(&mut scheduler, now), 0);
}

#[tokio::test(start_paused = true)]
async fn lease_records_the_attempt_immediately() {
    let mut scheduler = Scheduler::new(pool(&["a"], policy()));
    let now = Instant::now();

    let before = scheduler.pool().remaining_capacity(0, now);
    lease_slot(&mut scheduler, now);
    let after = scheduler.pool().remaining_capacity(0, now);

    assert_eq!(after, before - 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_credential_is_never_leased_until_reset() {
    let mut scheduler = Scheduler::new(pool(&["a", "b"], policy()));
    let now = Instant::now();

    for _ in 0..3 {
        scheduler.record_failure(0);
    }

    // Only slot 1 is ever handed out.
    for _ in 0..5 {
        assert_eq!(lease_slot(&mut scheduler, now), 1);
    }

    scheduler.reset_failures();
    // Rotation pointer sits past slot 1, so slot 0 comes back first.
    assert_eq!(lease_slot(&mut scheduler, now), 0);
}

#[tokio::test(start_paused = true)]
async fn success_resets_the_failure_counter() {
    let mut scheduler = Scheduler::new(pool(&["a"], policy()));

    scheduler.record_failure(0);
    scheduler.record_failure(0);
    assert_eq!(scheduler.pool().consecutive_failures(0), 2);

    scheduler.record_success(0);
    assert_eq!(scheduler.pool().consecutive_failures(0), 0);
}

#[tokio::test(start_paused = true)]
async fn window_count_never_exceeds_the_cap() {
    let policy = DispatchPolicy {
        max_requests_per_credential: 4,
        window_secs: 60,
        min_interval_ms: 0,
        ..DispatchPolicy::default()
    };
    let mut scheduler = Scheduler::new(pool(&["a"], policy));
    let start = Instant::now();

    // Hammer the scheduler at many instants and collect every grant; no
    // probe time may observe more than the cap inside its trailing window.
    let mut grants: Vec<Instant> = Vec::new();
    for step in 0..200u64 {
        let now = start + Duration::from_secs(step * 7);
        if let Schedule::Ready(lease) = scheduler.acquire(now) {
            assert_eq!(lease.slot, 0);
            grants.push(now);
        }
    }

    assert!(!grants.is_empty());
    for probe in &grants {
        let in_window = grants
            .iter()
            .filter(|t| **t <= *probe && probe.saturating_duration_since(**t) < Duration::from_secs(60))
            .count();
        assert!(in_window <= 4, "window held {} grants", in_window);
    }
}

#[tokio::test(start_paused = true)]
async fn wait_is_the_minimum_over_non_disabled_credentials() {
    let policy = DispatchPolicy {
        max_requests_per_credential: 10,
        window_secs: 60,
        min_interval_ms: 5_000,
        failure_threshold: 3,
        ..DispatchPolicy::default()
    };
    let mut scheduler = Scheduler::new(pool(&["a", "b"], policy));
    let start = Instant::now();

    lease_slot(&mut scheduler, start);
    lease_slot(&mut scheduler, start + Duration::from_secs(1));

    // At start+1s: slot 0 needs 4 more seconds, slot 1 needs 5.
    match scheduler.acquire(start + Duration::from_secs(1)) {
        Schedule::Wait(wait) => assert_eq!(wait, Duration::from_secs(4)),
        other => panic!("expected a wait, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn disabled_credentials_are_excluded_from_the_wait() {
    let policy = DispatchPolicy {
        max_requests_per_credential: 10,
        window_secs: 60,
        min_interval_ms: 5_000,
        failure_threshold: 1,
        ..DispatchPolicy::default()
    };
    let mut scheduler = Scheduler::new(pool(&["a", "b"], policy));
    let start = Instant::now();

    // Slot 0 is disabled outright; slot 1 just ran.
    scheduler.record_failure(0);
    let slot = lease_slot(&mut scheduler, start);
    assert_eq!(slot, 1);

    // Slot 0 would be "ready" were it not disabled; the wait must come
    // from slot 1's interval instead of treating slot 0 as available.
    match scheduler.acquire(start) {
        Schedule::Wait(wait) => assert_eq!(wait, Duration::from_secs(5)),
        other => panic!("expected a wait, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn all_disabled_reports_the_fixed_fallback() {
    let mut scheduler = Scheduler::new(pool(&["a", "b"], policy()));
    for slot in 0..2 {
        for _ in 0..3 {
            scheduler.record_failure(slot);
        }
    }

    match scheduler.acquire(Instant::now()) {
        Schedule::Exhausted(wait) => assert_eq!(wait, Duration::from_secs(30)),
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn status_reports_availability_and_capacity() {
    let mut scheduler = Scheduler::new(pool(&["a", "b"], policy()));
    let now = Instant::now();

    let status = scheduler.status(now);
    assert!(status.can_dispatch);
    assert_eq!(status.wait_ms, 0);
    assert_eq!(status.requests_remaining, 20);

    lease_slot(&mut scheduler, now);
    let status = scheduler.status(now);
    assert_eq!(status.requests_remaining, 19);
}

#[tokio::test(start_paused = true)]
async fn status_excludes_disabled_credentials_from_capacity() {
    let mut scheduler = Scheduler::new(pool(&["a", "b"], policy()));
    for _ in 0..3 {
        scheduler.record_failure(0);
    }

    let status = scheduler.status(Instant::now());
    assert!(status.can_dispatch);
    assert_eq!(status.requests_remaining, 10);
}

#[tokio::test(start_paused = true)]
async fn status_for_a_fully_disabled_pool() {
    let mut scheduler = Scheduler::new(pool(&["a"], policy()));
    for _ in 0..3 {
        scheduler.record_failure(0);
    }

    let status = scheduler.status(Instant::now());
    assert!(!status.can_dispatch);
    assert_eq!(status.wait_ms, 30_000);
    assert_eq!(status.requests_remaining, 0);
}
