//! Storage engine entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use super::quota::EngineQuota;

/// Key template applied when an engine does not specify its own.
pub const DEFAULT_PATH_RULE: &str = "uploads/{date}/{filename}.{ext}";

/// A configured storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StorageEngine {
    /// Unique engine identifier.
    pub id: i64,
    /// Human-readable name.
    pub name: String,
    /// Backend type tag (`local`, `s3`, `aliyun_oss`, ...).
    pub engine_type: String,
    /// Provider-specific configuration.
    pub config: Json<serde_json::Value>,
    /// Template used to build object keys for new uploads.
    pub path_rule: String,
    /// Whether the engine accepts traffic.
    pub is_active: bool,
    /// Whether this is the default engine for new uploads.
    pub is_default: bool,
    /// Capacity limit in bytes (NULL = unlimited).
    pub max_capacity: Option<i64>,
    /// Bytes accounted to images stored on this engine.
    pub used_capacity: i64,
    /// When the engine was created.
    pub created_at: DateTime<Utc>,
    /// When the engine was last updated.
    pub updated_at: DateTime<Utc>,
}

impl StorageEngine {
    /// Capacity bookkeeping for this engine.
    pub fn quota(&self) -> EngineQuota {
        EngineQuota::new(self.max_capacity, self.used_capacity)
    }
}

/// Data required to create a new storage engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEngine {
    pub name: String,
    pub engine_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    /// Key template; [`DEFAULT_PATH_RULE`] when absent.
    #[serde(default)]
    pub path_rule: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub max_capacity: Option<i64>,
}

/// Partial update of an existing engine. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEngine {
    pub name: Option<String>,
    pub config: Option<serde_json::Value>,
    pub path_rule: Option<String>,
    pub is_active: Option<bool>,
    /// Only `Some(true)` has an effect; clearing the default is done by
    /// promoting another engine.
    pub is_default: Option<bool>,
    /// `Some(None)` removes the limit.
    #[serde(default, with = "double_option")]
    pub max_capacity: Option<Option<i64>>,
}

fn default_true() -> bool {
    true
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Option<i64>>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<i64>>, D::Error> {
        Option::<i64>::deserialize(d).map(Some)
    }
}
