//! The dispatch loop: schedule, call, classify, retry or surface.

use crate::{
    BackoffPolicy, CredentialLease, CredentialPool, DispatchPolicy, DispatchStatus,
    GenerationBackend, GenerationRequest, Schedule, Scheduler, ScrivanoConfig,
};
use scrivano_error::{
    DispatchError, DispatchErrorKind, DispatchResult, RetryableError, ScrivanoResult,
};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Orchestrates rate-limited, retried dispatch over a credential pool.
///
/// Any number of `dispatch` calls may be in flight concurrently. All
/// credential-state transitions happen inside one synchronous critical
/// section on the scheduler mutex, which is never held across an `.await`,
/// so interleaved dispatches cannot race on a credential's counters.
pub struct Dispatcher<B> {
    backend: B,
    scheduler: Mutex<Scheduler>,
    policy: DispatchPolicy,
    backoff: BackoffPolicy,
}

impl<B: std::fmt::Debug> std::fmt::Debug for Dispatcher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backend", &self.backend)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<B: GenerationBackend> Dispatcher<B> {
    /// Assemble a dispatcher from its parts.
    pub fn new(backend: B, pool: CredentialPool, backoff: BackoffPolicy) -> Self {
        let policy = pool.policy().clone();
        Self {
            backend,
            scheduler: Mutex::new(Scheduler::new(pool)),
            policy,
            backoff,
        }
    }

    /// Build a dispatcher for `keys` using the policy in `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the credential list is empty.
    pub fn from_config(backend: B, keys: Vec<String>, config: &ScrivanoConfig) -> ScrivanoResult<Self> {
        let pool = CredentialPool::new(keys, config.dispatch.clone())?;
        Ok(Self::new(backend, pool, BackoffPolicy::new(&config.backoff)))
    }

    /// Perform one logical generation request.
    ///
    /// Runs a bounded attempt loop: lease a credential (waiting out short
    /// scheduling delays), issue the call under the hard timeout, and on
    /// failure classify, record, and either back off and retry or surface
    /// the error. Cancelling `cancel` aborts at the next suspension point.
    ///
    /// # Errors
    ///
    /// Non-retryable failures (auth, invalid request, filtered content,
    /// cancellation) surface immediately. Retryable failures surface once
    /// the attempt ceiling is exhausted, carrying a wait hint when one is
    /// known. Scheduling waits above the configured ceiling surface as
    /// `RateLimited` without consuming an attempt.
    #[instrument(skip_all)]
    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> DispatchResult<String> {
        let mut attempts = 0u32;
        let mut last_err: Option<DispatchError> = None;

        while attempts < self.policy.max_total_attempts {
            let lease = self.lease_credential(cancel).await?;
            attempts += 1;

            debug!(
                attempt = attempts,
                credential = %lease.label,
                "issuing generation attempt"
            );

            let outcome = self.attempt(&lease, request, cancel).await.and_then(|text| {
                if text.trim().is_empty() {
                    Err(DispatchError::new(DispatchErrorKind::MalformedResponse {
                        message: "generation succeeded but returned empty text".to_string(),
                    }))
                } else {
                    Ok(text)
                }
            });

            match outcome {
                Ok(text) => {
                    self.scheduler.lock().unwrap().record_success(lease.slot);
                    info!(
                        attempt = attempts,
                        credential = %lease.label,
                        chars = text.len(),
                        "generation succeeded"
                    );
                    return Ok(text);
                }
                Err(err) => {
                    self.scheduler.lock().unwrap().record_failure(lease.slot);

                    if !err.is_retryable() {
                        warn!(
                            attempt = attempts,
                            credential = %lease.label,
                            error = %err.kind,
                            "non-retryable failure, surfacing immediately"
                        );
                        return Err(err);
                    }

                    if attempts < self.policy.max_total_attempts {
                        let delay = self.backoff.delay(attempts, &err.kind);
                        warn!(
                            attempt = attempts,
                            credential = %lease.label,
                            error = %err.kind,
                            backoff_ms = delay.as_millis() as u64,
                            "retryable failure, backing off"
                        );
                        last_err = Some(err);
                        self.sleep(delay, cancel).await?;
                    } else {
                        last_err = Some(err);
                    }
                }
            }
        }

        let err = last_err.unwrap_or_else(|| {
            DispatchError::new(DispatchErrorKind::Unknown {
                message: "attempt ceiling is zero; no attempt was made".to_string(),
            })
        });
        warn!(attempts, error = %err.kind, "attempt ceiling exhausted");
        Err(self.with_wait_hint(err))
    }

    /// Availability snapshot for UI feedback. No side effects.
    pub fn status(&self) -> DispatchStatus {
        self.scheduler.lock().unwrap().status(Instant::now())
    }

    /// Clear every credential's failure counter (manual escape hatch).
    pub fn reset_failures(&self) {
        self.scheduler.lock().unwrap().reset_failures();
    }

    /// Ask the scheduler for a credential, sitting out short waits.
    ///
    /// Waits above the configured ceiling fail fast as `RateLimited` with
    /// the computed delay as the hint; an all-disabled pool reports the
    /// fixed fallback wait and points the caller at the reset escape hatch.
    async fn lease_credential(&self, cancel: &CancellationToken) -> DispatchResult<CredentialLease> {
        loop {
            if cancel.is_cancelled() {
                return Err(DispatchError::new(DispatchErrorKind::Cancelled));
            }

            let schedule = self.scheduler.lock().unwrap().acquire(Instant::now());

            let (delay, disabled) = match schedule {
                Schedule::Ready(lease) => return Ok(lease),
                Schedule::Wait(delay) => (delay, false),
                Schedule::Exhausted(delay) => (delay, true),
            };

            if delay > self.policy.max_schedule_wait() {
                let wait_ms = delay.as_millis() as u64;
                let message = if disabled {
                    "every credential is disabled by repeated failures; reset the pool or wait"
                        .to_string()
                } else {
                    format!("all credentials are saturated; retry in {} ms", wait_ms)
                };
                return Err(DispatchError::new(DispatchErrorKind::RateLimited {
                    message,
                    wait_ms: Some(wait_ms),
                }));
            }

            debug!(wait_ms = delay.as_millis() as u64, "waiting for an eligible credential");
            self.sleep(delay, cancel).await?;
        }
    }

    /// One network call under the hard timeout, raced with cancellation.
    async fn attempt(
        &self,
        lease: &CredentialLease,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> DispatchResult<String> {
        let timeout = self.policy.request_timeout();
        tokio::select! {
            _ = cancel.cancelled() => Err(DispatchError::new(DispatchErrorKind::Cancelled)),
            result = tokio::time::timeout(timeout, self.backend.call(&lease.key, request)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(DispatchError::new(DispatchErrorKind::TransientService {
                        status: 0,
                        message: format!(
                            "request timed out after {} s",
                            timeout.as_secs()
                        ),
                    })),
                }
            }
        }
    }

    /// Suspend for `delay` unless the caller cancels first.
    async fn sleep(&self, delay: Duration, cancel: &CancellationToken) -> DispatchResult<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(DispatchError::new(DispatchErrorKind::Cancelled)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Fill in a scheduler-derived wait hint on rate-limit errors lacking one.
    fn with_wait_hint(&self, err: DispatchError) -> DispatchError {
        if let DispatchErrorKind::RateLimited {
            message,
            wait_ms: None,
        } = err.kind.clone()
        {
            let status = self.status();
            return DispatchError {
                kind: DispatchErrorKind::RateLimited {
                    message,
                    wait_ms: Some(status.wait_ms),
                },
                ..err
            };
        }
        err
    }
}
