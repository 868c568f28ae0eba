//! System configuration repository implementation.

use chrono::Utc;
use sqlx::SqlitePool;

use imghost_core::error::{AppError, ErrorKind};
use imghost_core::result::AppResult;
use imghost_entity::setting::SystemConfig;

/// Repository for runtime key/value settings.
#[derive(Debug, Clone)]
pub struct SystemConfigRepository {
    pool: SqlitePool,
}

impl SystemConfigRepository {
    /// Create a new system config repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every setting.
    pub async fn find_all(&self) -> AppResult<Vec<SystemConfig>> {
        sqlx::query_as::<_, SystemConfig>("SELECT * FROM system_configs ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list configs", e))
    }

    /// Find a setting by key.
    pub async fn find_by_key(&self, key: &str) -> AppResult<Option<SystemConfig>> {
        sqlx::query_as::<_, SystemConfig>("SELECT * FROM system_configs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find config", e))
    }

    /// Insert or overwrite a setting. The description is only replaced when given.
    pub async fn upsert(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> AppResult<SystemConfig> {
        sqlx::query_as::<_, SystemConfig>(
            "INSERT INTO system_configs (key, value, description, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, \
             description = COALESCE(excluded.description, system_configs.description), \
             updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save config", e))
    }

    /// Insert a setting unless the key already exists. Returns whether a row was added.
    pub async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        description: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO system_configs (key, value, description, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to seed config", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a setting. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM system_configs WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete config", e))?;
        Ok(result.rows_affected() > 0)
    }
}
