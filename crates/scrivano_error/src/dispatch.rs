//! Dispatch failure taxonomy and retry eligibility.

/// Classification of a failed dispatch attempt.
///
/// Every failed network attempt maps to exactly one of these classes.
/// The class determines whether the dispatcher retries the attempt
/// (`is_retryable`) and which backoff parameters apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DispatchErrorKind {
    /// Upstream quota exhausted or request rate exceeded
    #[display("rate limited: {message}")]
    RateLimited {
        /// Human-readable explanation
        message: String,
        /// Suggested wait before the next attempt, when known
        wait_ms: Option<u64>,
    },
    /// Transient upstream failure (5xx, timeout, connection error)
    #[display("upstream service error (HTTP {status}): {message}")]
    TransientService {
        /// HTTP status code, 0 when the request never reached the server
        status: u16,
        /// Human-readable explanation
        message: String,
    },
    /// Request rejected by the upstream (4xx other than auth/rate-limit)
    #[display("invalid request (HTTP {status}): {message}")]
    InvalidRequest {
        /// HTTP status code
        status: u16,
        /// Human-readable explanation
        message: String,
    },
    /// Credential rejected (401/403)
    #[display("authentication rejected (HTTP {status}): {message}")]
    AuthError {
        /// HTTP status code
        status: u16,
        /// Human-readable explanation
        message: String,
    },
    /// Upstream stopped generation for safety/recitation with no usable text
    #[display("content filtered by upstream: {reason}")]
    ContentFiltered {
        /// The finish reason reported by the upstream
        reason: String,
    },
    /// 200 response missing expected fields or carrying empty text
    #[display("malformed response from upstream: {message}")]
    MalformedResponse {
        /// What was missing or empty
        message: String,
    },
    /// The caller's cancellation token fired during a suspension point
    #[display("dispatch cancelled by caller")]
    Cancelled,
    /// Anything that fits no other class
    #[display("unclassified dispatch failure: {message}")]
    Unknown {
        /// Human-readable explanation
        message: String,
    },
}

impl DispatchErrorKind {
    /// Check if this failure class should trigger a retry.
    ///
    /// Rate limits, transient service errors, malformed responses, and
    /// unclassified failures may resolve on a later attempt (possibly
    /// against a different credential). Auth rejections, invalid requests,
    /// filtered content, and cancellation never will.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrivano_error::DispatchErrorKind;
    ///
    /// let kind = DispatchErrorKind::TransientService {
    ///     status: 503,
    ///     message: "model overloaded".to_string(),
    /// };
    /// assert!(kind.is_retryable());
    ///
    /// let kind = DispatchErrorKind::AuthError {
    ///     status: 401,
    ///     message: "API key invalid".to_string(),
    /// };
    /// assert!(!kind.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchErrorKind::RateLimited { .. } => true,
            DispatchErrorKind::TransientService { .. } => true,
            DispatchErrorKind::MalformedResponse { .. } => true,
            DispatchErrorKind::Unknown { .. } => true,
            DispatchErrorKind::InvalidRequest { .. } => false,
            DispatchErrorKind::AuthError { .. } => false,
            DispatchErrorKind::ContentFiltered { .. } => false,
            DispatchErrorKind::Cancelled => false,
        }
    }

    /// Suggested wait in milliseconds before the next attempt, when known.
    ///
    /// Only `RateLimited` failures carry a hint; callers are expected to
    /// render it alongside the error message.
    pub fn wait_hint_ms(&self) -> Option<u64> {
        match self {
            DispatchErrorKind::RateLimited { wait_ms, .. } => *wait_ms,
            _ => None,
        }
    }
}

/// Dispatch error with source location tracking.
///
/// # Examples
///
/// ```
/// use scrivano_error::{DispatchError, DispatchErrorKind};
///
/// let err = DispatchError::new(DispatchErrorKind::Cancelled);
/// assert!(format!("{}", err).contains("cancelled"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    /// The kind of error that occurred
    pub kind: DispatchErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DispatchError {
    /// Create a new DispatchError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use scrivano_error::{DispatchError, DispatchErrorKind, RetryableError};
///
/// let err = DispatchError::new(DispatchErrorKind::RateLimited {
///     message: "quota exceeded".to_string(),
///     wait_ms: Some(4_000),
/// });
///
/// assert!(err.is_retryable());
/// assert_eq!(err.wait_hint_ms(), Some(4_000));
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Suggested wait in milliseconds before the next attempt, when known.
    fn wait_hint_ms(&self) -> Option<u64> {
        None
    }
}

impl RetryableError for DispatchError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn wait_hint_ms(&self) -> Option<u64> {
        self.kind.wait_hint_ms()
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
