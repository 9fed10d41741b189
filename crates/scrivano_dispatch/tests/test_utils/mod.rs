//! Scripted backends for exercising the dispatch loop without a network.

use async_trait::async_trait;
use scrivano_dispatch::{GenerationBackend, GenerationRequest};
use scrivano_error::{DispatchError, DispatchErrorKind, DispatchResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Route tracing output through the test harness. Honors `RUST_LOG`;
/// repeated calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Failure(DispatchErrorKind),
    /// Never answers inside any sane timeout.
    Hang,
}

impl MockResponse {
    async fn into_result(self) -> DispatchResult<String> {
        match self {
            MockResponse::Success(text) => Ok(text),
            MockResponse::Failure(kind) => Err(DispatchError::new(kind)),
            MockResponse::Hang => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(DispatchError::new(DispatchErrorKind::Unknown {
                    message: "hung call woke up".to_string(),
                }))
            }
        }
    }
}

enum Script {
    /// Replies drawn in order; `fallback` repeats once the list is drained.
    Sequence {
        queue: Mutex<VecDeque<MockResponse>>,
        fallback: MockResponse,
    },
    /// Reply chosen by the credential the dispatcher leased.
    ByKey(HashMap<String, MockResponse>),
}

/// A [`GenerationBackend`] that replays a script and records every call.
pub struct MockBackend {
    script: Script,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl MockBackend {
    pub fn always_success(text: impl Into<String>) -> Self {
        Self::sequence(vec![], MockResponse::Success(text.into()))
    }

    pub fn always_failure(kind: DispatchErrorKind) -> Self {
        Self::sequence(vec![], MockResponse::Failure(kind))
    }

    /// Replies in order, then `fallback` forever.
    pub fn sequence(queue: Vec<MockResponse>, fallback: MockResponse) -> Self {
        Self {
            script: Script::Sequence {
                queue: Mutex::new(queue.into()),
                fallback,
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails `failures` times with `kind`, then succeeds with `text`.
    pub fn fail_then_succeed(
        failures: usize,
        kind: DispatchErrorKind,
        text: impl Into<String>,
    ) -> Self {
        let queue = (0..failures)
            .map(|_| MockResponse::Failure(kind.clone()))
            .collect();
        Self::sequence(queue, MockResponse::Success(text.into()))
    }

    /// Replies keyed by the credential string.
    pub fn by_key(replies: HashMap<String, MockResponse>) -> Self {
        Self {
            script: Script::ByKey(replies),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of calls carrying the given credential.
    pub fn calls_for(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .count()
    }

    /// Instants at which calls fired, in order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn call(&self, key: &str, _request: &GenerationRequest) -> DispatchResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((key.to_string(), Instant::now()));

        let reply = match &self.script {
            Script::Sequence { queue, fallback } => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| fallback.clone()),
            Script::ByKey(replies) => replies
                .get(key)
                .cloned()
                .unwrap_or(MockResponse::Failure(DispatchErrorKind::Unknown {
                    message: format!("no scripted reply for credential {key}"),
                })),
        };

        reply.into_result().await
    }
}
