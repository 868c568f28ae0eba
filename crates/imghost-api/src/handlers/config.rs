//! Runtime settings handlers.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use imghost_entity::setting::SystemConfig;

use crate::dto::ApiResponse;
use crate::dto::request::{BatchUpdateConfigRequest, UpdateConfigRequest};
use crate::error::ApiResult;
use crate::extractors::{ApiPath, ValidatedJson};
use crate::state::AppState;

/// GET /api/configs
pub async fn list_configs(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<SystemConfig>>>> {
    let configs = state.settings_service.list().await?;
    Ok(Json(ApiResponse::ok(configs)))
}

/// GET /api/configs/{key}
pub async fn get_config(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Json<ApiResponse<SystemConfig>>> {
    let config = state.settings_service.get(&key).await?;
    Ok(Json(ApiResponse::ok(config)))
}

/// PUT /api/configs/{key}
pub async fn update_config(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<UpdateConfigRequest>,
) -> ApiResult<Json<ApiResponse<SystemConfig>>> {
    let config = state
        .settings_service
        .set(&key, &req.value, req.description.as_deref())
        .await?;
    Ok(Json(ApiResponse::with_message("Config updated", config)))
}

/// PUT /api/configs/batch
pub async fn batch_update_configs(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BatchUpdateConfigRequest>,
) -> ApiResult<Json<ApiResponse<Vec<SystemConfig>>>> {
    let configs = state.settings_service.set_many(req.configs).await?;
    Ok(Json(ApiResponse::with_message("Configs updated", configs)))
}

/// DELETE /api/configs/{key}
pub async fn delete_config(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    state.settings_service.delete(&key).await?;
    Ok(Json(ApiResponse::with_message("Config deleted", json!({ "key": key }))))
}

/// POST /api/configs/reload
pub async fn reload_configs(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Value>>> {
    let count = state.settings_service.reload().await?;
    Ok(Json(ApiResponse::with_message(
        "Config cache reloaded",
        json!({ "count": count }),
    )))
}
