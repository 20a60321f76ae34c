use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::external::registry::RegistryError;

/// The error taxonomy behind every HTTP status this service returns.
/// `RegistryFetchFailure` deliberately has no variant here: a single file's
/// fetch failure is logged and skipped inside the orchestrator, never
/// propagated.
#[derive(Debug, Clone)]
pub enum AppError {
    BadRequest { message: String },
    RegistryListFailure { repo: String, rev: String, message: String },
    EmptyRepository { repo: String, rev: String },
    AllFetchesFailed { repo: String, rev: String, attempted: usize },
    SinkFailure { message: String },
    InvariantViolation { message: String },
    Internal { message: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest { message } => write!(f, "bad request: {message}"),
            AppError::RegistryListFailure { repo, rev, message } => {
                write!(f, "failed to list {repo}@{rev}: {message}")
            }
            AppError::EmptyRepository { repo, rev } => {
                write!(f, "{repo}@{rev} contains no files")
            }
            AppError::AllFetchesFailed { repo, rev, attempted } => {
                write!(f, "{repo}@{rev}: all {attempted} listed file(s) failed to fetch")
            }
            AppError::SinkFailure { message } => write!(f, "object store sink failure: {message}"),
            AppError::InvariantViolation { message } => write!(f, "invariant violation: {message}"),
            AppError::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ListFailed { repo, rev, message } => {
                AppError::RegistryListFailure { repo, rev, message }
            }
            RegistryError::FetchFailed { repo, rev, path, message } => AppError::Internal {
                message: format!("fetch failure for {repo}@{rev}/{path} reached AppError: {message}"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.clone()),
            AppError::RegistryListFailure { repo, rev, message } => (
                StatusCode::BAD_GATEWAY,
                "REGISTRY_LIST_FAILURE",
                format!("could not list {repo}@{rev}: {message}"),
            ),
            AppError::EmptyRepository { repo, rev } => (
                StatusCode::NOT_FOUND,
                "EMPTY_REPOSITORY",
                format!("{repo}@{rev} contains no files"),
            ),
            AppError::AllFetchesFailed { repo, rev, attempted } => (
                StatusCode::BAD_GATEWAY,
                "ALL_FETCHES_FAILED",
                format!("{repo}@{rev}: all {attempted} listed file(s) failed to fetch from the registry"),
            ),
            AppError::SinkFailure { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SINK_FAILURE", message.clone())
            }
            AppError::InvariantViolation { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INVARIANT_VIOLATION",
                message.clone(),
            ),
            AppError::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let err = AppError::BadRequest { message: "missing repo".to_string() };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_repository_maps_to_404() {
        let err = AppError::EmptyRepository { repo: "owner/name".to_string(), rev: "main".to_string() };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn all_fetches_failed_maps_to_502() {
        let err = AppError::AllFetchesFailed {
            repo: "owner/name".to_string(),
            rev: "main".to_string(),
            attempted: 3,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn registry_list_failure_maps_to_502() {
        let err = AppError::RegistryListFailure {
            repo: "owner/name".to_string(),
            rev: "main".to_string(),
            message: "timeout".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn sink_failure_maps_to_500() {
        let err = AppError::SinkFailure { message: "upload failed".to_string() };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
