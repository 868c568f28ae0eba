//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use imghost_entity::engine::StorageEngine;

/// Placeholder shown instead of stored credentials.
pub const SECRET_MASK: &str = "******";

/// Envelope wrapping every JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Machine-readable error code on failure.
    pub error_code: Option<String>,
    /// Response data.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self::with_message("success", data)
    }

    /// Creates a successful response with a custom message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            data: Some(data),
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>, error_code: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code: Some(error_code.into()),
            data: None,
        }
    }
}

/// Storage engine as returned to clients, with credentials masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResponse {
    pub id: i64,
    pub name: String,
    pub engine_type: String,
    pub config: Value,
    pub path_rule: String,
    pub is_active: bool,
    pub is_default: bool,
    pub max_capacity: Option<i64>,
    pub used_capacity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StorageEngine> for EngineResponse {
    fn from(engine: StorageEngine) -> Self {
        Self {
            id: engine.id,
            name: engine.name,
            engine_type: engine.engine_type,
            config: mask_secrets(&engine.config.0),
            path_rule: engine.path_rule,
            is_active: engine.is_active,
            is_default: engine.is_default,
            max_capacity: engine.max_capacity,
            used_capacity: engine.used_capacity,
            created_at: engine.created_at,
            updated_at: engine.updated_at,
        }
    }
}

fn is_secret_key(key: &str) -> bool {
    key.to_ascii_lowercase().contains("secret")
}

/// Copy of `config` with every non-empty secret value replaced by [`SECRET_MASK`].
pub fn mask_secrets(config: &Value) -> Value {
    let mut masked = config.clone();
    if let Some(map) = masked.as_object_mut() {
        for (key, value) in map.iter_mut() {
            if is_secret_key(key) && value.as_str().is_some_and(|s| !s.is_empty()) {
                *value = Value::String(SECRET_MASK.to_string());
            }
        }
    }
    masked
}

/// Put stored secrets back where a client echoed [`SECRET_MASK`].
pub fn restore_secrets(incoming: &mut Value, stored: &Value) {
    let (Some(incoming), Some(stored)) = (incoming.as_object_mut(), stored.as_object()) else {
        return;
    };
    for (key, value) in incoming.iter_mut() {
        if is_secret_key(key) && value.as_str() == Some(SECRET_MASK) {
            if let Some(original) = stored.get(key) {
                *value = original.clone();
            }
        }
    }
}

/// Outcome of a batch delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDeleteResponse {
    pub requested: usize,
    pub deleted: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
    /// Number of storage engines currently loaded.
    pub engines_loaded: usize,
    pub default_engine_id: Option<i64>,
}
