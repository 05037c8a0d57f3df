// =============================================================================
// Collaborator failure taxonomy
// =============================================================================
//
// Every external call (quote fetch, decision request, trade placement,
// outcome check) returns `Result<T, CallFailure>`. The retry layer is the
// only place allowed to inspect the failure kind and decide retry vs.
// fallback; the session loop never sees a raw transport error.
// =============================================================================

use serde::Serialize;

/// Classification of a single failed collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Upstream throttled us (HTTP 429 or explicit rate-limit signal).
    RateLimited,
    /// The request did not complete within its deadline.
    Timeout,
    /// Upstream answered, but the body was structurally unusable
    /// (no choices, no quote, null trade id). Not retried.
    InvalidResponse,
    /// The input itself was malformed (bad symbol format). Not retried.
    Validation,
    /// Connection failures and anything else transient.
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate-limited"),
            Self::Timeout => write!(f, "timeout"),
            Self::InvalidResponse => write!(f, "invalid-response"),
            Self::Validation => write!(f, "validation"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A typed failure from one collaborator call attempt.
#[derive(Debug, Clone)]
pub struct CallFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl CallFailure {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::RateLimited,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::InvalidResponse,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Validation,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Other,
            message: message.into(),
        }
    }

    /// Classify a reqwest transport error into our taxonomy.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            Self::rate_limited(err.to_string())
        } else {
            Self::other(err.to_string())
        }
    }

    /// Whether the retry layer should attempt this call again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.kind,
            FailureKind::InvalidResponse | FailureKind::Validation
        )
    }
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CallFailure {}

/// Terminal result of a retried call that never produced a value.
#[derive(Debug, Clone)]
pub enum RetryError {
    /// A non-retryable failure ended the attempt cycle immediately.
    Invalid(CallFailure),
    /// All attempts were consumed; `last` is the final failure observed.
    Exhausted { attempts: u32, last: CallFailure },
}

impl RetryError {
    /// The underlying failure, whichever way the cycle ended.
    pub fn failure(&self) -> &CallFailure {
        match self {
            Self::Invalid(f) => f,
            Self::Exhausted { last, .. } => last,
        }
    }
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(failure) => write!(f, "non-retryable failure: {failure}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "exhausted after {attempts} attempts, last failure: {last}")
            }
        }
    }
}

impl std::error::Error for RetryError {}
