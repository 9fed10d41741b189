//! Per-credential usage and health tracking.

use crate::DispatchPolicy;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// One API credential with its quota bookkeeping.
///
/// Tracks the timestamps of recent requests (a sliding window), the most
/// recent request time, and a consecutive-failure counter. Created once per
/// configured credential and never deleted; only the failure counter resets.
///
/// Every read takes `now` explicitly so eligibility is a pure function of
/// state and time, and tests can probe arbitrary instants.
#[derive(Debug, Clone)]
pub struct Credential {
    key: String,
    recent_requests: VecDeque<Instant>,
    last_request: Option<Instant>,
    consecutive_failures: u32,
}

impl Credential {
    /// Create a fresh credential with no usage history.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            recent_requests: VecDeque::new(),
            last_request: None,
            consecutive_failures: 0,
        }
    }

    /// The full credential string, passed to the upstream API.
    ///
    /// Never log this; use [`Credential::redacted`] for any output.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display form showing only the last four characters.
    ///
    /// Keys of four characters or fewer are masked entirely; a suffix of
    /// such a key would be the whole key.
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.key.chars().collect();
        if chars.len() <= 4 {
            return "…****".to_string();
        }
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("…{}", suffix)
    }

    /// Consecutive failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Count of requests recorded inside the window ending at `now`.
    ///
    /// Pure read; entries older than the window are ignored, not removed.
    pub fn requests_in_window(&self, now: Instant, window: Duration) -> usize {
        self.recent_requests
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < window)
            .count()
    }

    /// Whether the failure threshold has disabled this credential.
    pub fn is_disabled(&self, policy: &DispatchPolicy) -> bool {
        self.consecutive_failures >= policy.failure_threshold
    }

    /// Whether this credential can carry a request right now.
    ///
    /// True iff the window has capacity, the minimum inter-request interval
    /// has elapsed, and the failure threshold has not been reached. Pure
    /// function of state and `now`; no side effects.
    pub fn is_eligible(&self, now: Instant, policy: &DispatchPolicy) -> bool {
        if self.is_disabled(policy) {
            return false;
        }
        if self.requests_in_window(now, policy.window()) >= policy.max_requests_per_credential {
            return false;
        }
        match self.last_request {
            Some(last) => now.saturating_duration_since(last) >= policy.min_interval(),
            None => true,
        }
    }

    /// Additional requests permittable in the current window. Diagnostics only.
    pub fn remaining_capacity(&self, now: Instant, policy: &DispatchPolicy) -> usize {
        policy
            .max_requests_per_credential
            .saturating_sub(self.requests_in_window(now, policy.window()))
    }

    /// How long until this credential becomes eligible.
    ///
    /// Returns `None` when the credential is disabled by the failure
    /// threshold (it will never recover on its own), otherwise the larger
    /// pending constraint: the remaining inter-request interval if positive,
    /// else the time until the oldest in-window entry ages out if the window
    /// is full, else zero.
    pub fn wait_until_eligible(&self, now: Instant, policy: &DispatchPolicy) -> Option<Duration> {
        if self.is_disabled(policy) {
            return None;
        }

        if let Some(last) = self.last_request {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < policy.min_interval() {
                return Some(policy.min_interval() - elapsed);
            }
        }

        if self.requests_in_window(now, policy.window()) >= policy.max_requests_per_credential {
            let oldest_in_window = self
                .recent_requests
                .iter()
                .find(|t| now.saturating_duration_since(**t) < policy.window());
            if let Some(oldest) = oldest_in_window {
                let age = now.saturating_duration_since(*oldest);
                return Some(policy.window().saturating_sub(age));
            }
        }

        Some(Duration::ZERO)
    }

    /// Record an attempt at `now`: prune stale entries, append `now`, and
    /// set the last-request time.
    ///
    /// Must be called exactly once per attempt, immediately before the
    /// network call, so interleaved dispatches cannot both book the same
    /// remaining capacity.
    pub fn record_attempt(&mut self, now: Instant, policy: &DispatchPolicy) {
        let window = policy.window();
        while let Some(front) = self.recent_requests.front() {
            if now.saturating_duration_since(*front) >= window {
                self.recent_requests.pop_front();
            } else {
                break;
            }
        }
        self.recent_requests.push_back(now);
        self.last_request = Some(now);
    }

    /// Reset the consecutive-failure counter after a successful call.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count one more consecutive failure.
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Clear the failure counter without touching usage history.
    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.redacted())
    }
}
