//! Storage engine administration handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use imghost_entity::engine::UpdateEngine;
use imghost_service::{ConnectionTestResult, EngineUsage};
use imghost_storage::CacheInfo;

use crate::dto::ApiResponse;
use crate::dto::request::{CreateEngineRequest, EngineListParams};
use crate::dto::response::{EngineResponse, restore_secrets};
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;

/// GET /api/storage/engines
pub async fn list_engines(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<EngineListParams>,
) -> ApiResult<Json<ApiResponse<Vec<EngineResponse>>>> {
    let engines = state.engine_service.list(params.is_active).await?;
    Ok(Json(ApiResponse::ok(
        engines.into_iter().map(EngineResponse::from).collect(),
    )))
}

/// GET /api/storage/engines/{id}
pub async fn get_engine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<EngineResponse>>> {
    let engine = state.engine_service.get(id).await?;
    Ok(Json(ApiResponse::ok(engine.into())))
}

/// POST /api/storage/engines
pub async fn create_engine(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateEngineRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<EngineResponse>>)> {
    let engine = state.engine_service.create(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Storage engine created", engine.into())),
    ))
}

/// PUT /api/storage/engines/{id}
pub async fn update_engine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(mut req): ApiJson<UpdateEngine>,
) -> ApiResult<Json<ApiResponse<EngineResponse>>> {
    if let Some(config) = req.config.as_mut() {
        let current = state.engine_service.get(id).await?;
        restore_secrets(config, &current.config.0);
    }
    let engine = state.engine_service.update(id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Storage engine updated",
        engine.into(),
    )))
}

/// DELETE /api/storage/engines/{id}
pub async fn delete_engine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    state.engine_service.delete(id).await?;
    Ok(Json(ApiResponse::with_message(
        "Storage engine deleted",
        json!({ "id": id }),
    )))
}

/// POST /api/storage/engines/{id}/default
pub async fn set_default_engine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<EngineResponse>>> {
    let engine = state.engine_service.set_default(id).await?;
    Ok(Json(ApiResponse::with_message(
        "Default storage engine changed",
        engine.into(),
    )))
}

/// POST /api/storage/engines/{id}/test
pub async fn test_engine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<ConnectionTestResult>>> {
    let result = state.engine_service.test_connection(id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/storage/engines/{id}/usage
pub async fn engine_usage(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<EngineUsage>>> {
    let usage = state.engine_service.usage(id).await?;
    Ok(Json(ApiResponse::ok(usage)))
}

/// GET /api/storage/types
pub async fn supported_types(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::ok(state.engine_service.supported_types()))
}

/// POST /api/storage/cache/reload
pub async fn reload_cache(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<CacheInfo>>> {
    let info = state.engine_service.reload_cache().await?;
    Ok(Json(ApiResponse::with_message("Storage engine cache reloaded", info)))
}
