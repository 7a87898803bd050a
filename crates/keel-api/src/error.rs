//! API error type and its mapping onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use keel_lifecycle::LifecycleError;
use keel_metrics::ProbeError;

use crate::response::{ApiResponse, ErrorBody};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "DEPLOYMENT_NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotFound(id) => format!("deployment {id} not found"),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Unavailable(service) => format!("service {service} is unavailable"),
            // Internal details stay in the log.
            ApiError::Internal(_) => "an unexpected error occurred".to_string(),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(id) => ApiError::NotFound(id),
            LifecycleError::Unavailable(service) => ApiError::Unavailable(service),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProbeError> for ApiError {
    fn from(err: ProbeError) -> Self {
        error!(error = %err, "host probe unavailable");
        ApiError::Unavailable("host-metrics".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(%detail, "internal error");
        }
        let body = ApiResponse::<()>::failure(ErrorBody {
            code: self.code(),
            message: self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}
