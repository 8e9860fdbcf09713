//! HTTP error handling and response types.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    Service(ServiceError),
    /// Malformed request that never reached a service.
    BadRequest(String),
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::Service(ServiceError::Unauthenticated(message.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("INVALID_ARGUMENT", msg))
            }
            AppError::Service(err) => {
                let code = err.code();
                match err {
                    ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new(code, msg)),
                    ServiceError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new(code, msg)),
                    ServiceError::InvalidArgument(msg) => {
                        (StatusCode::BAD_REQUEST, ApiError::new(code, msg))
                    }
                    ServiceError::Unauthenticated(msg) => {
                        (StatusCode::UNAUTHORIZED, ApiError::new(code, msg))
                    }
                    ServiceError::Internal(source) => {
                        tracing::error!(error = %source, "request failed");
                        let api = ApiError::new(code, "internal server error");
                        let api = if source.is_retryable() {
                            api.with_details("temporary storage failure, retry later")
                        } else {
                            api
                        };
                        (StatusCode::INTERNAL_SERVER_ERROR, api)
                    }
                }
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "rejected request body");
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "rejected path parameter");
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<crate::db::RepositoryError> for AppError {
    fn from(err: crate::db::RepositoryError) -> Self {
        AppError::Service(err.into())
    }
}
