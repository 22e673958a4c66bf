//! Error types for the matching and dispatch core
//!
//! Comprehensive error taxonomy using thiserror

use crate::ids::UserId;
use thiserror::Error;

/// Matching engine errors
///
/// The engine degrades gracefully on sparse profiles; it only fails on
/// malformed call arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

/// Whole-call dispatcher errors
///
/// Per-platform failures never surface here; they are reported in the
/// outcome list. Only the nothing-to-notify case propagates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("user {user_id} has no linked platform accounts")]
    NoLinkedPlatforms { user_id: UserId },
}

/// Per-platform send errors
///
/// Subdivided into retryable (timeout, rate limit) and terminal
/// (unlinked account, permanently invalid target) per retry policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    #[error("send timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    #[error("rate limited by platform")]
    RateLimited,

    #[error("account is no longer linked")]
    AccountUnlinked,

    #[error("invalid target: {external_id}")]
    InvalidTarget { external_id: String },

    #[error("platform error: {message}")]
    Platform { message: String, retryable: bool },
}

impl SendFailure {
    /// Whether the failure is eligible for retry
    pub fn is_retryable(&self) -> bool {
        match self {
            SendFailure::Timeout { .. } | SendFailure::RateLimited => true,
            SendFailure::AccountUnlinked | SendFailure::InvalidTarget { .. } => false,
            SendFailure::Platform { retryable, .. } => *retryable,
        }
    }
}
