//! Restores internal error messages in responses when enabled by
//! `server.expose_internal_errors`.

use axum::Json;
use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::dto::ApiResponse;
use crate::error::InternalErrorDetail;

/// Replaces the generic 500 message with the real one.
pub async fn expose_internal_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(detail) = response.extensions().get::<InternalErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = Json(ApiResponse::<()>::error(detail.message, detail.error_code)).into_response();
    Response::from_parts(parts, body.into_body())
}
