//! Request DTOs with validation.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use imghost_core::types::PageRequest;
use imghost_entity::engine::CreateEngine;
use imghost_entity::image::ImageQuery;

/// Query string of the upload endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadParams {
    /// Target engine; the default engine when absent.
    pub storage_engine_id: Option<i64>,
}

/// Query string of `GET /api/images`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub storage_engine_id: Option<i64>,
    pub file_type: Option<String>,
    pub is_deleted: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

impl ImageListParams {
    /// Converts to an `ImageQuery`, clamping the page.
    pub fn into_query(self) -> ImageQuery {
        ImageQuery {
            page: PageRequest::new(self.page, self.page_size),
            storage_engine_id: self.storage_engine_id,
            file_type: self.file_type.filter(|t| !t.is_empty()),
            is_deleted: self.is_deleted,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Query string of the delete endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteParams {
    /// Remove the row and the stored object instead of flagging the row.
    #[serde(default)]
    pub hard_delete: bool,
}

/// Query string of `GET /api/storage/engines`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineListParams {
    pub is_active: Option<bool>,
}

/// Create storage engine request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEngineRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Engine type is required"))]
    pub engine_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[validate(length(min = 1, max = 255))]
    pub path_rule: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[validate(range(min = 0, message = "Capacity must not be negative"))]
    pub max_capacity: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl From<CreateEngineRequest> for CreateEngine {
    fn from(req: CreateEngineRequest) -> Self {
        Self {
            name: req.name,
            engine_type: req.engine_type,
            config: req.config,
            path_rule: req.path_rule,
            is_active: req.is_active,
            is_default: req.is_default,
            max_capacity: req.max_capacity,
        }
    }
}

/// Update (or create) a single setting.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateConfigRequest {
    #[validate(length(max = 500, message = "Value must be at most 500 characters"))]
    pub value: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Update several settings at once: key to value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchUpdateConfigRequest {
    #[validate(length(min = 1, message = "At least one config is required"))]
    pub configs: HashMap<String, String>,
}
