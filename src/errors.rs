use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::product::{describe_violations, Violation};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "msg": "No product found with this id...",
    "request_id": "req-abc123xyz"
}))]
pub struct ErrorResponse {
    /// Human-readable error description
    pub msg: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Body returned by the delete endpoint, on success and on failure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl DeleteResponse {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            msg: None,
            request_id: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),
}

impl From<Vec<Violation>> for ServiceError {
    fn from(violations: Vec<Violation>) -> Self {
        ServiceError::ValidationError(describe_violations(&violations))
    }
}

impl ServiceError {
    /// Returns the error message suitable for HTTP responses.
    /// Store failures return a generic message so driver details never leak.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A store failure reported under the endpoint's own failure status.
    #[error("Endpoint failure ({status}): {source}")]
    Endpoint {
        status: StatusCode,
        source: ServiceError,
    },

    /// Delete failures carry `success: false` alongside the message.
    #[error("Delete failed ({status}): {message}")]
    Delete { status: StatusCode, message: String },
}

impl ApiError {
    /// Maps a service error for an endpoint whose generic failures are
    /// reported as `status`. Validation and not-found keep their own codes.
    pub fn with_failure_status(status: StatusCode) -> impl Fn(ServiceError) -> ApiError {
        move |err| match err {
            ServiceError::ValidationError(msg) => ApiError::ValidationError(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Endpoint {
                status,
                source: other,
            },
        }
    }

    pub fn delete(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Delete {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Endpoint { status, .. } | ApiError::Delete { status, .. } => *status,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::ValidationError(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Endpoint { source, .. } => source.response_message(),
            ApiError::Delete { message, .. } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();
        let request_id = current_request_id();

        match &self {
            ApiError::Endpoint { source, .. } => {
                tracing::error!(error = %source, status = %status, "Request failed");
            }
            _ => tracing::debug!(error = %self, status = %status, "Request rejected"),
        }

        if let ApiError::Delete { .. } = self {
            let body = DeleteResponse {
                success: false,
                msg: Some(message),
                request_id,
            };
            return (status, Json(body)).into_response();
        }

        let body = ErrorResponse {
            msg: message,
            request_id,
        };
        (status, Json(body)).into_response()
    }
}
