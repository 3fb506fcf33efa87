//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured
//! to Sentry before the response is built, and their details are replaced
//! with a generic message. Bodies are JSON: `{"detail": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::WorkflowError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Workflow operation failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Database operation failed outside a workflow operation.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller identity is missing or unknown.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is known but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Workflow(err) => match err {
                WorkflowError::NotFound(_)
                | WorkflowError::CommentNotFound(_)
                | WorkflowError::UserNotFound(_) => StatusCode::NOT_FOUND,
                WorkflowError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                WorkflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                WorkflowError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Workflow(WorkflowError::StoreUnavailable(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Workflow(WorkflowError::StoreUnavailable(_)) => {
                "Service temporarily unavailable".to_string()
            }
            Self::Workflow(WorkflowError::NotFound(_)) => "Request not found".to_string(),
            Self::Workflow(WorkflowError::CommentNotFound(_)) => "Comment not found".to_string(),
            Self::Workflow(WorkflowError::UserNotFound(_)) => "User not found".to_string(),
            Self::Workflow(
                WorkflowError::PermissionDenied(msg) | WorkflowError::InvalidInput(msg),
            )
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use preconfig_core::{CommentId, RequestId, UserId};

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_workflow_error_status_codes() {
        let id = RequestId::parse("REQ1").unwrap();
        assert_eq!(get_status(WorkflowError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(WorkflowError::CommentNotFound(CommentId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(WorkflowError::UserNotFound(UserId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(WorkflowError::PermissionDenied("no".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(WorkflowError::InvalidInput("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(WorkflowError::StoreUnavailable(RepositoryError::Unavailable(
                "down".to_string()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::NotFound),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Workflow(WorkflowError::StoreUnavailable(
            RepositoryError::DataCorruption("secret table detail".to_string()),
        ))
        .into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["detail"], "Service temporarily unavailable");
    }
}
