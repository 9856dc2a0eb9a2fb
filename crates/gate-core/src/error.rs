use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("calls must be at least 1, got {0}")]
    InvalidCalls(i64),
    #[error("period must be a positive duration, got {0}s")]
    InvalidPeriod(f64),
}

/// Raised when the fresh-call budget of the current window is spent.
///
/// `remaining` is measured from the moment the gate entered the call, before
/// the wrapped operation ran, so it can overshoot by that operation's latency.
/// Treat it as a backoff hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("too many calls, window resets in {:.3}s", .remaining.as_secs_f64())]
pub struct RateLimitExceeded {
    remaining: Duration,
}

impl RateLimitExceeded {
    pub fn new(remaining: Duration) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining.as_secs_f64()
    }
}

#[derive(Debug, Error)]
pub enum GateError<E> {
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),
    /// Failure from the wrapped operation, passed through untouched.
    #[error(transparent)]
    Operation(E),
}

impl<E> GateError<E> {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GateError::RateLimited(_))
    }

    pub fn rate_limit(&self) -> Option<&RateLimitExceeded> {
        match self {
            GateError::RateLimited(limit) => Some(limit),
            GateError::Operation(_) => None,
        }
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            GateError::Operation(err) => Some(err),
            GateError::RateLimited(_) => None,
        }
    }
}
