//! HTTP rendering of workflow errors.
//!
//! Every failure becomes a JSON body `{ "kind": ..., "message": ... }` with a
//! status derived from the error kind.

use adpipe_workflow::WorkflowError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rootcause::Report;
use serde::Serialize;
use std::fmt;

/// Errors returned by the API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The engine rejected or failed the operation.
    Workflow(Report<WorkflowError>),
    /// A session id in the path or body could not be parsed.
    InvalidSessionId { raw: String, reason: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
}

impl ApiError {
    /// The stable error token sent to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workflow(report) => report.current_context().kind(),
            Self::InvalidSessionId { .. } => "validation",
        }
    }

    /// The HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Workflow(report) => status_for(report.current_context()),
            Self::InvalidSessionId { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

fn status_for(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::StepNotReady { .. }
        | WorkflowError::PrerequisiteNotMet { .. }
        | WorkflowError::AlreadyExists { .. } => StatusCode::CONFLICT,
        WorkflowError::SessionBusy { .. } => StatusCode::LOCKED,
        WorkflowError::AmbiguousNavigation { .. } | WorkflowError::Validation { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::CollaboratorFailure { .. } => StatusCode::BAD_GATEWAY,
        WorkflowError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow(report) => write!(f, "{}", report.current_context()),
            Self::InvalidSessionId { raw, reason } => {
                write!(f, "invalid session id '{raw}': {reason}")
            }
        }
    }
}

impl From<Report<WorkflowError>> for ApiError {
    fn from(report: Report<WorkflowError>) -> Self {
        Self::Workflow(report)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpipe_core::SessionId;
    use adpipe_workflow::StepId;

    fn api(err: WorkflowError) -> ApiError {
        ApiError::from(Report::new(err))
    }

    #[test]
    fn status_mapping() {
        let id = SessionId::new();
        assert_eq!(
            api(WorkflowError::NotFound { session_id: id }).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            api(WorkflowError::StepNotReady {
                step: StepId::Analyze,
                missing: Vec::new()
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            api(WorkflowError::SessionBusy { session_id: id }).status(),
            StatusCode::LOCKED
        );
        assert_eq!(
            api(WorkflowError::validation("bad index")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            api(WorkflowError::Storage {
                message: "disk full".to_string()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn bad_session_id_is_validation() {
        let err = ApiError::InvalidSessionId {
            raw: "nope".to_string(),
            reason: "invalid length".to_string(),
        };
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
