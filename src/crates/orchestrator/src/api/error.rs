//! API error types and HTTP response conversion
//!
//! Orchestrator errors are mapped onto HTTP status codes here so handlers can
//! use `?` throughout.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OrchestratorError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Custom API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found or expired
    #[error("{0}")]
    NotFound(String),

    /// Invalid request data
    #[error("{0}")]
    BadRequest(String),

    /// The task exists but is in the wrong state
    #[error("{0}")]
    Conflict(String),

    /// The generation service or a source failed
    #[error("{0}")]
    Upstream(String),

    /// Internal server error
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "INVALID_STATE",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Upstream(_) => "UpstreamError",
            ApiError::InternalError(_) => "InternalError",
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let message = err.to_string();
        match err {
            OrchestratorError::TaskNotFound(_) => ApiError::NotFound(message),
            OrchestratorError::Configuration(_) => ApiError::BadRequest(message),
            OrchestratorError::TaskNotCompleted { .. } | OrchestratorError::MissingResultText(_) => {
                ApiError::Conflict(message)
            }
            OrchestratorError::Generation(_)
            | OrchestratorError::Parse(_)
            | OrchestratorError::SourceFetch { .. }
            | OrchestratorError::NoUsableData => ApiError::Upstream(message),
            OrchestratorError::Store(ref db) if db.is_not_found() => ApiError::NotFound(message),
            OrchestratorError::DocumentBuild(_)
            | OrchestratorError::Store(_)
            | OrchestratorError::Serialization(_) => ApiError::InternalError(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!(code = body.code, message = %body.message, "API error");
        } else {
            tracing::debug!(code = body.code, message = %body.message, "API error");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseError;

    #[test]
    fn test_orchestrator_errors_map_to_status() {
        let cases = [
            (OrchestratorError::TaskNotFound("t1".into()), StatusCode::NOT_FOUND),
            (OrchestratorError::Configuration("no sources".into()), StatusCode::BAD_REQUEST),
            (
                OrchestratorError::TaskNotCompleted {
                    task_id: "t1".into(),
                    status: "running".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (OrchestratorError::MissingResultText("t1".into()), StatusCode::BAD_REQUEST),
            (OrchestratorError::Generation("quota".into()), StatusCode::BAD_GATEWAY),
            (OrchestratorError::Parse("bad json".into()), StatusCode::BAD_GATEWAY),
            (
                OrchestratorError::Store(DatabaseError::ConnectionError("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_message_is_the_orchestrator_text() {
        let err = ApiError::from(OrchestratorError::TaskNotFound("abc".into()));
        assert_eq!(err.to_string(), "Task not found: abc");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ApiError::BadRequest("product_name must not be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ApiErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "BadRequest");
        assert_eq!(body.code, "BAD_REQUEST");
        assert_eq!(body.message, "product_name must not be empty");
    }
}
