//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use imghost_core::error::{AppError, ErrorKind};

use crate::dto::response::ApiResponse;

/// Message returned in place of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// HTTP-facing wrapper around [`AppError`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// The real message of a hidden internal error, attached to the response
/// so the error-detail middleware can restore it when configured to.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail {
    pub message: String,
    pub error_code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(self.0.kind)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::StorageIo => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Database
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::validation(rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self(AppError::validation(format!("Multipart error: {}", err.body_text())))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self(AppError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let err = self.0;
        let error_code = err
            .code
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| err.kind.to_string());

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(
                kind = %err.kind,
                error = %err.message,
                source = ?err.source,
                "Internal server error"
            );
            let body = ApiResponse::<()>::error(INTERNAL_ERROR_MESSAGE, error_code.clone());
            let mut response = (status, Json(body)).into_response();
            response.extensions_mut().insert(InternalErrorDetail {
                message: err.message,
                error_code,
            });
            return response;
        }

        tracing::debug!(status = status.as_u16(), error_code = %error_code, message = %err.message, "Request failed");
        (status, Json(ApiResponse::<()>::error(err.message, error_code))).into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
