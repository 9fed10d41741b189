//! Request dispatch for quota-limited generation APIs.
//!
//! This crate turns a "generate text for this prompt" request into a
//! correctly scheduled, rate-limited, retried call against a pool of
//! interchangeable API credentials:
//!
//! - [`CredentialPool`] tracks per-credential usage in a sliding window,
//!   the last-request timestamp, and a consecutive-failure counter.
//! - [`Scheduler`] hands out credentials round-robin and computes how long
//!   a caller must wait when none is eligible.
//! - [`BackoffPolicy`] computes exponential retry delays with jitter, tuned
//!   per failure class.
//! - [`Dispatcher`] runs the bounded attempt loop against any
//!   [`GenerationBackend`] and classifies, retries, or surfaces failures.
//!
//! All time-dependent operations take the current instant explicitly, so
//! tests drive them with a paused tokio clock instead of wall time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod backoff;
mod config;
mod credential;
mod dispatcher;
mod pool;
mod scheduler;

pub use backend::{GenerationBackend, GenerationRequest, GenerationRequestBuilder};
pub use backoff::BackoffPolicy;
pub use config::{BackoffConfig, DispatchPolicy, GenerationDefaults, ScrivanoConfig};
pub use credential::Credential;
pub use dispatcher::Dispatcher;
pub use pool::CredentialPool;
pub use scheduler::{CredentialLease, DispatchStatus, Schedule, Scheduler};
