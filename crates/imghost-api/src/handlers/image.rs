//! Image upload, listing, download and delete handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use serde_json::{Value, json};

use imghost_core::error::AppError;
use imghost_core::types::PageResponse;
use imghost_entity::image::Image;
use imghost_service::{BatchUploadResult, UploadRequest};

use crate::dto::ApiResponse;
use crate::dto::request::{DeleteParams, ImageListParams, UploadParams};
use crate::dto::response::BatchDeleteResponse;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, ClientIp};
use crate::state::AppState;

/// Most ids accepted by one batch delete.
const MAX_BATCH_DELETE: usize = 100;

/// A file part read from a multipart body.
struct FilePart {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// Collect every file part named `field_name`.
async fn read_files(multipart: &mut Multipart, field_name: &str) -> ApiResult<Vec<FilePart>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;
        files.push(FilePart {
            filename,
            content_type,
            data,
        });
    }
    Ok(files)
}

fn upload_request(part: FilePart, params: &UploadParams, ip: &ClientIp) -> UploadRequest {
    UploadRequest {
        filename: part.filename,
        content_type: part.content_type,
        data: part.data,
        storage_engine_id: params.storage_engine_id,
        upload_ip: ip.0.clone(),
    }
}

/// POST /api/images/upload
pub async fn upload_image(
    State(state): State<AppState>,
    ip: ClientIp,
    ApiQuery(params): ApiQuery<UploadParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Image>>)> {
    let mut multipart = multipart?;
    let part = read_files(&mut multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::validation("Multipart field 'file' is required"))?;

    let image = state
        .image_service
        .upload(upload_request(part, &params, &ip))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Image uploaded", image)),
    ))
}

/// POST /api/images/upload/batch
pub async fn batch_upload(
    State(state): State<AppState>,
    ip: ClientIp,
    ApiQuery(params): ApiQuery<UploadParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BatchUploadResult>>)> {
    let mut multipart = multipart?;
    let parts = read_files(&mut multipart, "files").await?;
    if parts.is_empty() {
        return Err(AppError::validation("Multipart field 'files' is required").into());
    }

    let requests = parts
        .into_iter()
        .map(|part| upload_request(part, &params, &ip))
        .collect();
    let result = state.image_service.batch_upload(requests).await;
    let message = format!(
        "{} uploaded, {} failed",
        result.succeeded.len(),
        result.failed.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, result)),
    ))
}

/// GET /api/images
pub async fn list_images(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ImageListParams>,
) -> ApiResult<Json<ApiResponse<PageResponse<Image>>>> {
    let page = state.image_service.list(&params.into_query()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/images/{id}
pub async fn get_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Image>>> {
    let image = state.image_service.get(id).await?;
    Ok(Json(ApiResponse::ok(image)))
}

/// GET /api/images/{id}/raw
pub async fn download_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Response> {
    let image = state.image_service.download(id).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", image.filename.replace('"', "")),
        )
        .header(header::CONTENT_LENGTH, image.data.len())
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(image.data))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}

/// DELETE /api/images/{id}?hard_delete=
pub async fn delete_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<DeleteParams>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    state.image_service.delete(id, params.hard_delete).await?;
    Ok(Json(ApiResponse::with_message(
        "Image deleted",
        json!({ "id": id, "hard_delete": params.hard_delete }),
    )))
}

/// POST /api/images/batch-delete?hard_delete=
pub async fn batch_delete(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DeleteParams>,
    ApiJson(ids): ApiJson<Vec<i64>>,
) -> ApiResult<Json<ApiResponse<BatchDeleteResponse>>> {
    if ids.is_empty() {
        return Err(AppError::validation("At least one image id is required").into());
    }
    if ids.len() > MAX_BATCH_DELETE {
        return Err(AppError::validation(format!(
            "At most {MAX_BATCH_DELETE} images can be deleted at once"
        ))
        .into());
    }

    let deleted = state
        .image_service
        .batch_delete(&ids, params.hard_delete)
        .await;
    Ok(Json(ApiResponse::ok(BatchDeleteResponse {
        requested: ids.len(),
        deleted,
    })))
}
