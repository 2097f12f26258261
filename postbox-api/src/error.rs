//! Mapping of core failures onto HTTP responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use postbox_core::ServiceError;
use thiserror::Error;
use tracing::error;

use crate::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Body was not JSON, had the wrong content type, or did not match the schema
    #[error("Invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Unauthorized | ServiceError::InvalidCredentials) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Service(ServiceError::MissingReceiver | ServiceError::EmptyMessage) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Service(ServiceError::Token(_) | ServiceError::Directory(_))
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(rejection) => rejection.status(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Service(e) => e.code(),
            ApiError::Body(_) => "INVALID_REQUEST",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
