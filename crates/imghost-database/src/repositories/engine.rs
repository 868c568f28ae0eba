//! Storage engine repository implementation.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

use imghost_core::error::{AppError, ErrorKind};
use imghost_core::result::AppResult;
use imghost_entity::engine::StorageEngine;

/// Column values for a new engine row, already validated by the caller.
#[derive(Debug, Clone)]
pub struct NewEngineRow<'a> {
    pub name: &'a str,
    pub engine_type: &'a str,
    pub config: &'a serde_json::Value,
    pub path_rule: &'a str,
    pub is_active: bool,
    pub is_default: bool,
    pub max_capacity: Option<i64>,
}

/// Repository for storage engine CRUD operations.
#[derive(Debug, Clone)]
pub struct EngineRepository {
    pool: SqlitePool,
}

impl EngineRepository {
    /// Create a new engine repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find an engine by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<StorageEngine>> {
        sqlx::query_as::<_, StorageEngine>("SELECT * FROM storage_engines WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find engine", e))
    }

    /// Find an engine by ID on an open connection or transaction.
    pub async fn find_by_id_in(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> AppResult<Option<StorageEngine>> {
        sqlx::query_as::<_, StorageEngine>("SELECT * FROM storage_engines WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find engine", e))
    }

    /// Find the active default engine.
    pub async fn find_default(&self) -> AppResult<Option<StorageEngine>> {
        sqlx::query_as::<_, StorageEngine>(
            "SELECT * FROM storage_engines WHERE is_default = 1 AND is_active = 1 LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find default engine", e)
        })
    }

    /// List engines, optionally filtered by the active flag.
    pub async fn find_all(&self, is_active: Option<bool>) -> AppResult<Vec<StorageEngine>> {
        let result = match is_active {
            Some(active) => {
                sqlx::query_as::<_, StorageEngine>(
                    "SELECT * FROM storage_engines WHERE is_active = ? ORDER BY id ASC",
                )
                .bind(active)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, StorageEngine>("SELECT * FROM storage_engines ORDER BY id ASC")
                    .fetch_all(&self.pool)
                    .await
            }
        };
        result.map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list engines", e))
    }

    /// Count all engines.
    pub async fn count_in(conn: &mut SqliteConnection) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM storage_engines")
            .fetch_one(conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count engines", e))
    }

    /// Insert a new engine.
    pub async fn create(
        conn: &mut SqliteConnection,
        data: &NewEngineRow<'_>,
    ) -> AppResult<StorageEngine> {
        let now = Utc::now();
        sqlx::query_as::<_, StorageEngine>(
            "INSERT INTO storage_engines \
             (name, engine_type, config, path_rule, is_active, is_default, max_capacity, used_capacity, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?) RETURNING *",
        )
        .bind(data.name)
        .bind(data.engine_type)
        .bind(Json(data.config))
        .bind(data.path_rule)
        .bind(data.is_active)
        .bind(data.is_default)
        .bind(data.max_capacity)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create engine", e))
    }

    /// Persist the mutable columns of `engine`. `used_capacity` is left alone.
    pub async fn save(
        conn: &mut SqliteConnection,
        engine: &StorageEngine,
    ) -> AppResult<StorageEngine> {
        sqlx::query_as::<_, StorageEngine>(
            "UPDATE storage_engines \
             SET name = ?, config = ?, path_rule = ?, is_active = ?, is_default = ?, max_capacity = ?, updated_at = ? \
             WHERE id = ? RETURNING *",
        )
        .bind(&engine.name)
        .bind(&engine.config)
        .bind(&engine.path_rule)
        .bind(engine.is_active)
        .bind(engine.is_default)
        .bind(engine.max_capacity)
        .bind(Utc::now())
        .bind(engine.id)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update engine", e))
    }

    /// Clear the default flag on every engine except `keep`.
    pub async fn clear_default(conn: &mut SqliteConnection, keep: Option<i64>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE storage_engines SET is_default = 0, updated_at = ? \
             WHERE is_default = 1 AND (? IS NULL OR id <> ?)",
        )
        .bind(Utc::now())
        .bind(keep)
        .bind(keep)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to clear default engine", e)
        })?;
        Ok(result.rows_affected())
    }

    /// Mark `id` as the default engine. Callers clear the previous default first.
    pub async fn set_default(conn: &mut SqliteConnection, id: i64) -> AppResult<StorageEngine> {
        sqlx::query_as::<_, StorageEngine>(
            "UPDATE storage_engines SET is_default = 1, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to set default engine", e)
        })
    }

    /// Add `bytes` to the engine's used capacity.
    pub async fn increment_used_capacity(
        conn: &mut SqliteConnection,
        id: i64,
        bytes: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE storage_engines SET used_capacity = used_capacity + ?, updated_at = ? WHERE id = ?",
        )
        .bind(bytes)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to increment used capacity", e)
        })?;
        Ok(())
    }

    /// Subtract `bytes` from the engine's used capacity, never going below zero.
    pub async fn decrement_used_capacity(
        conn: &mut SqliteConnection,
        id: i64,
        bytes: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE storage_engines SET used_capacity = MAX(used_capacity - ?, 0), updated_at = ? WHERE id = ?",
        )
        .bind(bytes)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to decrement used capacity", e)
        })?;
        Ok(())
    }

    /// Delete an engine.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM storage_engines WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete engine", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DatabasePool;
    use crate::migration::run_migrations;
    use imghost_core::config::database::DatabaseConfig;
    use serde_json::json;

    async fn setup() -> (tempfile::TempDir, DatabasePool) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("test.db").display()),
            ..DatabaseConfig::default()
        };
        let db = DatabasePool::connect(&config).await.unwrap();
        run_migrations(db.pool()).await.unwrap();
        (dir, db)
    }

    fn row<'a>(name: &'a str, config: &'a serde_json::Value) -> NewEngineRow<'a> {
        NewEngineRow {
            name,
            engine_type: "local",
            config,
            path_rule: "uploads/{filename}.{ext}",
            is_active: true,
            is_default: false,
            max_capacity: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (_dir, db) = setup().await;
        let repo = EngineRepository::new(db.pool().clone());
        let mut conn = db.pool().acquire().await.unwrap();

        let config = json!({"base_path": "a"});
        let created = EngineRepository::create(&mut conn, &row("disk", &config))
            .await
            .unwrap();
        assert_eq!(created.used_capacity, 0);
        assert_eq!(created.config.0["base_path"], "a");

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "disk");
        assert!(repo.find_by_id(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_used_capacity_never_negative() {
        let (_dir, db) = setup().await;
        let repo = EngineRepository::new(db.pool().clone());
        let mut conn = db.pool().acquire().await.unwrap();
        let config = json!({});
        let engine = EngineRepository::create(&mut conn, &row("disk", &config))
            .await
            .unwrap();

        EngineRepository::increment_used_capacity(&mut conn, engine.id, 10)
            .await
            .unwrap();
        EngineRepository::decrement_used_capacity(&mut conn, engine.id, 25)
            .await
            .unwrap();

        let found = repo.find_by_id(engine.id).await.unwrap().unwrap();
        assert_eq!(found.used_capacity, 0);
    }

    #[tokio::test]
    async fn test_single_default_enforced_by_index() {
        let (_dir, db) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let config = json!({});
        let a = EngineRepository::create(&mut conn, &row("a", &config)).await.unwrap();
        let b = EngineRepository::create(&mut conn, &row("b", &config)).await.unwrap();

        EngineRepository::set_default(&mut conn, a.id).await.unwrap();
        assert!(EngineRepository::set_default(&mut conn, b.id).await.is_err());

        EngineRepository::clear_default(&mut conn, Some(b.id))
            .await
            .unwrap();
        EngineRepository::set_default(&mut conn, b.id).await.unwrap();

        let repo = EngineRepository::new(db.pool().clone());
        assert_eq!(repo.find_default().await.unwrap().unwrap().id, b.id);
    }
}
