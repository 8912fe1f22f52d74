//! Remote API error taxonomy
//!
//! Failures of the request/response mutation API. The engine maps every
//! variant to the same rollback path; the distinctions matter for logging
//! and for the no-automatic-retry rule (only a clear transport-level timeout
//! is eligible for caller-driven retry).

use thiserror::Error;

/// Failure of a remote mutation or fetch call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The call did not resolve within the bounded confirm interval
    #[error("remote call timed out")]
    Timeout,

    /// Transport-level failure (connection reset, 5xx, DNS, ...)
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote system rejected the mutation
    #[error("mutation rejected: {reason}")]
    Rejected {
        /// Human-readable rejection reason from the remote system
        reason: String,
    },

    /// The session no longer has rights to act on the entity
    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    /// Create a transport failure
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }

    /// Create a rejection
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether this failure is transient (timeout or transport)
    ///
    /// Transient failures are recovered locally by rollback and surfaced as
    /// a non-blocking notice; they are never fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }
}
