//! The credential pool: exclusive owner of all per-credential usage state.

use crate::{Credential, DispatchPolicy};
use scrivano_error::ConfigError;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Owns every [`Credential`] and the dispatch policy that governs them.
///
/// Nothing outside this crate mutates credential counters directly; the
/// [`Scheduler`](crate::Scheduler) routes all recording operations through
/// the pool so state changes stay centralized and serializable.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    policy: DispatchPolicy,
}

impl CredentialPool {
    /// Build a pool from the configured credential strings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the list is empty or contains a blank
    /// entry.
    #[instrument(skip(keys), fields(credentials = keys.len()))]
    pub fn new(keys: Vec<String>, policy: DispatchPolicy) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::new("credential list is empty"));
        }
        if keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::new("credential list contains a blank entry"));
        }

        let credentials: Vec<Credential> = keys.into_iter().map(Credential::new).collect();
        debug!(count = credentials.len(), "credential pool created");

        Ok(Self {
            credentials,
            policy,
        })
    }

    /// Number of credentials in the pool. Always at least one.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the pool holds no credentials. A constructed pool never does.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The policy constants governing this pool.
    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// The full credential string for `slot`.
    pub fn key(&self, slot: usize) -> &str {
        self.credentials[slot].key()
    }

    /// Redacted display form for `slot`.
    pub fn redacted(&self, slot: usize) -> String {
        self.credentials[slot].redacted()
    }

    /// Whether `slot` can carry a request at `now`. Pure read.
    pub fn is_eligible(&self, slot: usize, now: Instant) -> bool {
        self.credentials[slot].is_eligible(now, &self.policy)
    }

    /// Whether `slot` is disabled by the failure threshold.
    pub fn is_disabled(&self, slot: usize) -> bool {
        self.credentials[slot].is_disabled(&self.policy)
    }

    /// Requests still permittable for `slot` in the window ending at `now`.
    pub fn remaining_capacity(&self, slot: usize, now: Instant) -> usize {
        self.credentials[slot].remaining_capacity(now, &self.policy)
    }

    /// Sum of remaining capacity over credentials not disabled by failures.
    pub fn total_remaining_capacity(&self, now: Instant) -> usize {
        self.credentials
            .iter()
            .filter(|c| !c.is_disabled(&self.policy))
            .map(|c| c.remaining_capacity(now, &self.policy))
            .sum()
    }

    /// Time until `slot` becomes eligible; `None` when disabled.
    pub fn wait_until_eligible(&self, slot: usize, now: Instant) -> Option<Duration> {
        self.credentials[slot].wait_until_eligible(now, &self.policy)
    }

    /// Record an attempt against `slot` at `now`.
    pub fn record_attempt(&mut self, slot: usize, now: Instant) {
        self.credentials[slot].record_attempt(now, &self.policy);
    }

    /// Reset the failure counter for `slot` after a successful call.
    pub fn record_success(&mut self, slot: usize) {
        self.credentials[slot].record_success();
    }

    /// Count one more consecutive failure for `slot`.
    pub fn record_failure(&mut self, slot: usize) {
        self.credentials[slot].record_failure();
    }

    /// Consecutive failures currently recorded for `slot`.
    pub fn consecutive_failures(&self, slot: usize) -> u32 {
        self.credentials[slot].consecutive_failures()
    }

    /// Clear every credential's failure counter.
    ///
    /// The manual escape hatch for a pool where every credential has hit the
    /// failure threshold; usage windows are left untouched.
    #[instrument(skip(self))]
    pub fn reset_failures(&mut self) {
        debug!("resetting failure counters for all credentials");
        for credential in &mut self.credentials {
            credential.reset_failures();
        }
    }
}
