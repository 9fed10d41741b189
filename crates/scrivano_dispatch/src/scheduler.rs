//! Credential selection with round-robin fairness and wait computation.

use crate::CredentialPool;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// A credential handed out for one attempt.
///
/// The attempt is already recorded against the slot when the lease is
/// issued; the holder performs the network call and reports the outcome
/// back through [`Scheduler::record_success`] or
/// [`Scheduler::record_failure`].
#[derive(Debug, Clone)]
pub struct CredentialLease {
    /// Pool index of the chosen credential
    pub slot: usize,
    /// Full credential string for the upstream call
    pub key: String,
    /// Redacted form, safe for logs
    pub label: String,
}

/// Outcome of asking the scheduler for a credential.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// A credential is available; its attempt has been recorded
    Ready(CredentialLease),
    /// None eligible right now; the shortest time until one becomes eligible
    Wait(Duration),
    /// Every credential is disabled by the failure threshold; carries the
    /// fixed fallback wait and signals the caller-side reset policy
    Exhausted(Duration),
}

/// Snapshot of pool availability for UI feedback. Side-effect free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStatus {
    /// Whether a dispatch issued now would find an eligible credential
    pub can_dispatch: bool,
    /// Estimated wait in milliseconds until one becomes eligible
    pub wait_ms: u64,
    /// Requests still permittable across all non-disabled credentials
    pub requests_remaining: usize,
}

/// Picks credentials round-robin and computes waits when none is eligible.
///
/// The rotation pointer advances past each chosen slot so traffic spreads
/// across the pool instead of hammering the first healthy credential.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pool: CredentialPool,
    next_slot: usize,
}

impl Scheduler {
    /// Wrap a pool in a scheduler with the rotation pointer at slot zero.
    pub fn new(pool: CredentialPool) -> Self {
        Self { pool, next_slot: 0 }
    }

    /// Read access to the pool for diagnostics.
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Select a credential for the next attempt, or report the wait.
    ///
    /// Scans from the rotation pointer and leases the first eligible
    /// credential, recording the attempt in the same synchronous step —
    /// callers holding this scheduler behind a lock therefore can never
    /// double-book capacity across interleaved dispatches. When nothing is
    /// eligible the result is the minimum wait over non-disabled
    /// credentials, or [`Schedule::Exhausted`] when the failure threshold
    /// has disabled the whole pool.
    pub fn acquire(&mut self, now: Instant) -> Schedule {
        let n = self.pool.len();

        for offset in 0..n {
            let slot = (self.next_slot + offset) % n;
            if self.pool.is_eligible(slot, now) {
                self.pool.record_attempt(slot, now);
                self.next_slot = (slot + 1) % n;
                let lease = CredentialLease {
                    slot,
                    key: self.pool.key(slot).to_string(),
                    label: self.pool.redacted(slot),
                };
                trace!(slot, credential = %lease.label, "credential leased");
                return Schedule::Ready(lease);
            }
        }

        let shortest = (0..n)
            .filter_map(|slot| self.pool.wait_until_eligible(slot, now))
            .min();

        match shortest {
            Some(wait) => {
                debug!(wait_ms = wait.as_millis() as u64, "no credential eligible");
                Schedule::Wait(wait)
            }
            None => {
                debug!("all credentials disabled by failure threshold");
                Schedule::Exhausted(self.pool.policy().all_disabled_wait())
            }
        }
    }

    /// Report a successful call on a leased slot.
    pub fn record_success(&mut self, slot: usize) {
        self.pool.record_success(slot);
    }

    /// Report a failed call on a leased slot.
    pub fn record_failure(&mut self, slot: usize) {
        self.pool.record_failure(slot);
    }

    /// Clear every credential's failure counter (manual escape hatch).
    pub fn reset_failures(&mut self) {
        self.pool.reset_failures();
    }

    /// Availability snapshot at `now`. No side effects.
    pub fn status(&self, now: Instant) -> DispatchStatus {
        let n = self.pool.len();
        let can_dispatch = (0..n).any(|slot| self.pool.is_eligible(slot, now));

        let wait_ms = if can_dispatch {
            0
        } else {
            let shortest = (0..n)
                .filter_map(|slot| self.pool.wait_until_eligible(slot, now))
                .min();
            shortest
                .unwrap_or_else(|| self.pool.policy().all_disabled_wait())
                .as_millis() as u64
        };

        DispatchStatus {
            can_dispatch,
            wait_ms,
            requests_remaining: self.pool.total_remaining_capacity(now),
        }
    }
}
