//! Similarity delegate error types.
//!
//! Defined in `quizgrade-core` so the grader can classify delegate failures
//! when it falls back to the local matcher, without string matching.

use thiserror::Error;

/// Errors that can occur when consulting a remote similarity delegate.
#[derive(Debug, Error)]
pub enum DelegateError {
    /// The delegate did not answer within the grading timeout.
    #[error("delegate timed out after {0}ms")]
    Timeout(u64),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The delegate returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The delegate answered, but not with a usable similarity.
    #[error("malformed delegate response: {0}")]
    MalformedResponse(String),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl DelegateError {
    /// Returns `true` if the delegate cannot serve any further request.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DelegateError::AuthenticationFailed(_))
    }
}
