//! Exponential backoff with per-class jitter.

use crate::BackoffConfig;
use rand::Rng;
use scrivano_error::DispatchErrorKind;
use std::time::Duration;

/// Computes the delay before the next retry attempt.
///
/// `delay = base(class) × 2^(attempt − 1) + random(0..=jitter(class))`,
/// capped at `max_delay`. Rate-limit failures use a smaller base than
/// service-class failures; separate jitter ceilings keep concurrent callers
/// sharing the pool from retrying in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    rate_limit_base_ms: u64,
    rate_limit_jitter_ms: u64,
    service_base_ms: u64,
    service_jitter_ms: u64,
    max_delay_ms: u64,
}

impl BackoffPolicy {
    /// Build a policy from configuration.
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            rate_limit_base_ms: config.rate_limit_base_ms,
            rate_limit_jitter_ms: config.rate_limit_jitter_ms,
            service_base_ms: config.service_base_ms,
            service_jitter_ms: config.service_jitter_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    fn class_params(&self, kind: &DispatchErrorKind) -> (u64, u64) {
        match kind {
            DispatchErrorKind::RateLimited { .. } => {
                (self.rate_limit_base_ms, self.rate_limit_jitter_ms)
            }
            // Transient service errors, malformed responses, and anything
            // unclassified back off on the service schedule.
            _ => (self.service_base_ms, self.service_jitter_ms),
        }
    }

    /// The deterministic component of the delay for `attempt` (1-based).
    ///
    /// Monotone non-decreasing in `attempt` and never above the cap.
    pub fn base_delay(&self, attempt: u32, kind: &DispatchErrorKind) -> Duration {
        let (base_ms, _) = self.class_params(kind);
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1).min(32));
        let delay_ms = base_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Full delay for `attempt` (1-based): base plus random jitter, capped.
    pub fn delay(&self, attempt: u32, kind: &DispatchErrorKind) -> Duration {
        let (_, jitter_ceiling_ms) = self.class_params(kind);
        let jitter_ms = if jitter_ceiling_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ceiling_ms)
        };
        let base_ms = self.base_delay(attempt, kind).as_millis() as u64;
        Duration::from_millis(base_ms.saturating_add(jitter_ms).min(self.max_delay_ms))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(&BackoffConfig::default())
    }
}
