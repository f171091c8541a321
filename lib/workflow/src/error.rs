//! Error types for the workflow crate.
//!
//! - `StoreError`: session store failures, knows nothing about steps
//! - `WorkflowError`: everything a caller of the orchestrator can see
//!
//! Orchestrator operations return `Report<WorkflowError>`; callers read
//! the kind back through `Report::current_context()`.

use crate::step::{Field, StepId};
use adpipe_core::SessionId;
use adpipe_integration::{Collaborator, CollaboratorError};
use std::fmt;

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `create` was asked for an id that is already stored.
    AlreadyExists { session_id: SessionId },
    /// Reading a stored session failed.
    ReadFailed { message: String },
    /// Writing a session failed.
    WriteFailed { message: String },
    /// A stored session could not be decoded.
    Corrupt { session_id: SessionId, message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists { session_id } => {
                write!(f, "session already exists: {session_id}")
            }
            Self::ReadFailed { message } => write!(f, "session read failed: {message}"),
            Self::WriteFailed { message } => write!(f, "session write failed: {message}"),
            Self::Corrupt {
                session_id,
                message,
            } => write!(f, "stored session {session_id} is corrupt: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from workflow operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// No state is stored for the session.
    NotFound { session_id: SessionId },
    /// A session with this id already exists.
    AlreadyExists { session_id: SessionId },
    /// The step cannot run because prerequisite fields are unset.
    StepNotReady { step: StepId, missing: Vec<Field> },
    /// No step could be recognized in the navigation text.
    AmbiguousNavigation { text: String },
    /// The navigation target is not reachable yet.
    PrerequisiteNotMet { target: StepId, missing: Vec<Field> },
    /// Another operation on the session is in flight.
    SessionBusy { session_id: SessionId },
    /// An external call failed or timed out.
    CollaboratorFailure {
        collaborator: Collaborator,
        message: String,
    },
    /// The input was malformed.
    Validation { message: String },
    /// The session store failed.
    Storage { message: String },
}

impl WorkflowError {
    /// Wraps a collaborator failure with the collaborator's name.
    #[must_use]
    pub fn collaborator(collaborator: Collaborator, error: &CollaboratorError) -> Self {
        Self::CollaboratorFailure {
            collaborator,
            message: error.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// A stable snake_case token for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::StepNotReady { .. } => "step_not_ready",
            Self::AmbiguousNavigation { .. } => "ambiguous_navigation",
            Self::PrerequisiteNotMet { .. } => "prerequisite_not_met",
            Self::SessionBusy { .. } => "session_busy",
            Self::CollaboratorFailure { .. } => "collaborator_failure",
            Self::Validation { .. } => "validation",
            Self::Storage { .. } => "storage",
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { session_id } => write!(f, "session not found: {session_id}"),
            Self::AlreadyExists { session_id } => {
                write!(f, "session already exists: {session_id}")
            }
            Self::StepNotReady { step, missing } => {
                write!(f, "step {step} is not ready, missing: {}", join_fields(missing))
            }
            Self::AmbiguousNavigation { text } => {
                write!(f, "could not tell which step '{text}' refers to")
            }
            Self::PrerequisiteNotMet { target, missing } => {
                write!(
                    f,
                    "cannot go to {target} yet, missing: {}",
                    join_fields(missing)
                )
            }
            Self::SessionBusy { session_id } => {
                write!(f, "session {session_id} is busy with another operation")
            }
            Self::CollaboratorFailure {
                collaborator,
                message,
            } => write!(f, "{collaborator} failed: {message}"),
            Self::Validation { message } => write!(f, "invalid input: {message}"),
            Self::Storage { message } => write!(f, "storage error: {message}"),
        }
    }
}

impl std::error::Error for WorkflowError {}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { session_id } => Self::AlreadyExists { session_id },
            other => Self::Storage {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_not_ready_lists_missing_fields() {
        let err = WorkflowError::StepNotReady {
            step: StepId::GenerateVideo,
            missing: vec![Field::SelectedAvatarId, Field::Audio],
        };
        assert_eq!(
            err.to_string(),
            "step generate_video is not ready, missing: selected_avatar_id, audio"
        );
        assert_eq!(err.kind(), "step_not_ready");
    }

    #[test]
    fn collaborator_failure_names_collaborator() {
        let err = WorkflowError::collaborator(
            Collaborator::VoiceSynthesizer,
            &CollaboratorError::Timeout { after_secs: 120 },
        );
        assert_eq!(err.to_string(), "voice_synthesizer failed: timed out after 120s");
        assert_eq!(err.kind(), "collaborator_failure");
    }

    #[test]
    fn store_already_exists_keeps_kind() {
        let session_id = SessionId::new();
        let err: WorkflowError = StoreError::AlreadyExists { session_id }.into();
        assert_eq!(err, WorkflowError::AlreadyExists { session_id });

        let err: WorkflowError = StoreError::WriteFailed {
            message: "disk full".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "storage");
        assert!(err.to_string().contains("disk full"));
    }
}
