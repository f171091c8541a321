//! Error types for the integration crate.
//!
//! `CollaboratorError` carries only what the adapter knows about the failed
//! call. Which collaborator failed, and on behalf of which step, is added by
//! the workflow engine when it records the failure.

use std::fmt;

/// Errors from collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The service could not be reached.
    Unavailable { reason: String },
    /// The service answered with a failure.
    RequestFailed { reason: String },
    /// The service answered but the response could not be understood.
    InvalidResponse { reason: String },
    /// The service refused the input.
    Rejected { reason: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// No answer within the collaborator's deadline.
    Timeout { after_secs: u64 },
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "service unavailable: {reason}"),
            Self::RequestFailed { reason } => write!(f, "request failed: {reason}"),
            Self::InvalidResponse { reason } => {
                write!(f, "could not parse response: {reason}")
            }
            Self::Rejected { reason } => write!(f, "input rejected: {reason}"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::Timeout { after_secs } => write!(f, "timed out after {after_secs}s"),
        }
    }
}

impl std::error::Error for CollaboratorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = CollaboratorError::Timeout { after_secs: 30 };
        assert_eq!(err.to_string(), "timed out after 30s");
    }

    #[test]
    fn rate_limited_display() {
        let err = CollaboratorError::RateLimited {
            retry_after_secs: Some(5),
        };
        assert!(err.to_string().contains("retry after 5s"));
        let err = CollaboratorError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn request_failed_display() {
        let err = CollaboratorError::RequestFailed {
            reason: "HTTP 500".to_string(),
        };
        assert!(err.to_string().contains("HTTP 500"));
    }
}
