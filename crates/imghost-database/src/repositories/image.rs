//! Image repository implementation.

use chrono::{Days, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use imghost_core::error::{AppError, ErrorKind};
use imghost_core::result::AppResult;
use imghost_entity::image::{DedupPolicy, Image, ImageQuery, NewImage};

/// Repository for image records.
#[derive(Debug, Clone)]
pub struct ImageRepository {
    pool: SqlitePool,
}

impl ImageRepository {
    /// Create a new image repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find an image by ID, deleted or not.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Image>> {
        sqlx::query_as::<_, Image>("SELECT * FROM images WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find image", e))
    }

    /// Find a live image with the same content.
    pub async fn find_duplicate(
        &self,
        md5: &str,
        sha256: &str,
        policy: DedupPolicy,
    ) -> AppResult<Option<Image>> {
        let sql = match policy {
            DedupPolicy::Any => {
                "SELECT * FROM images WHERE is_deleted = 0 AND (md5 = ? OR sha256 = ?) \
                 ORDER BY id ASC LIMIT 1"
            }
            DedupPolicy::Both => {
                "SELECT * FROM images WHERE is_deleted = 0 AND md5 = ? AND sha256 = ? \
                 ORDER BY id ASC LIMIT 1"
            }
        };
        sqlx::query_as::<_, Image>(sql)
            .bind(md5)
            .bind(sha256)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to look up duplicate image", e)
            })
    }

    /// List images matching `query`, newest first, with the total match count.
    pub async fn list(&self, query: &ImageQuery) -> AppResult<(Vec<Image>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM images WHERE 1 = 1");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count images", e))?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM images WHERE 1 = 1");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.page.limit())
            .push(" OFFSET ")
            .push_bind(query.page.offset());
        let items = select
            .build_query_as::<Image>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list images", e))?;

        Ok((items, total.max(0) as u64))
    }

    /// Count live images stored on an engine.
    pub async fn count_live_by_engine(&self, engine_id: i64) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM images WHERE storage_engine_id = ? AND is_deleted = 0",
        )
        .bind(engine_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count images", e))
    }

    /// Count live images on an engine inside an open transaction.
    pub async fn count_live_by_engine_in(
        conn: &mut SqliteConnection,
        engine_id: i64,
    ) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM images WHERE storage_engine_id = ? AND is_deleted = 0",
        )
        .bind(engine_id)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count images", e))
    }

    /// Count rows, deleted or not, that point at a stored object.
    pub async fn count_referencing_object(&self, engine_id: i64, storage_filename: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM images WHERE storage_engine_id = ? AND storage_filename = ?",
        )
        .bind(engine_id)
        .bind(storage_filename)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count images", e))
    }

    /// Count rows whose thumbnail URL ends with `suffix`.
    ///
    /// Thumbnail files are shared by every row with the same content and
    /// day, whatever engine holds the original, and the domain part of the
    /// URL may differ between rows.
    pub async fn count_referencing_thumbnail(&self, suffix: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM images \
             WHERE thumbnail_url IS NOT NULL AND substr(thumbnail_url, -length(?)) = ?",
        )
        .bind(suffix)
        .bind(suffix)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count images", e))
    }

    /// Insert an image record.
    ///
    /// A live record with the same `(md5, sha256)` already existing is
    /// reported as a [`ErrorKind::Conflict`].
    pub async fn create(conn: &mut SqliteConnection, data: &NewImage) -> AppResult<Image> {
        sqlx::query_as::<_, Image>(
            "INSERT INTO images \
             (md5, sha256, original_filename, storage_filename, storage_engine_id, file_size, file_type, \
              width, height, upload_ip, extra_metadata, original_url, thumbnail_url, is_deleted, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?) RETURNING *",
        )
        .bind(&data.md5)
        .bind(&data.sha256)
        .bind(&data.original_filename)
        .bind(&data.storage_filename)
        .bind(data.storage_engine_id)
        .bind(data.file_size)
        .bind(&data.file_type)
        .bind(data.width)
        .bind(data.height)
        .bind(&data.upload_ip)
        .bind(Json(&data.extra_metadata))
        .bind(&data.original_url)
        .bind(&data.thumbnail_url)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                AppError::with_source(ErrorKind::Conflict, "Image content already stored", e)
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create image", e)
            }
        })
    }

    /// Mark an image as deleted. Returns `false` when no row changed.
    pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE images SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to soft-delete image", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove an image row.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete image", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every soft-deleted row referencing an engine.
    pub async fn purge_deleted_by_engine(
        conn: &mut SqliteConnection,
        engine_id: i64,
    ) -> AppResult<Vec<Image>> {
        sqlx::query_as::<_, Image>(
            "DELETE FROM images WHERE storage_engine_id = ? AND is_deleted = 1 RETURNING *",
        )
        .bind(engine_id)
        .fetch_all(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to purge deleted images", e))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ImageQuery) {
    builder
        .push(" AND is_deleted = ")
        .push_bind(query.is_deleted.unwrap_or(false));
    if let Some(engine_id) = query.storage_engine_id {
        builder.push(" AND storage_engine_id = ").push_bind(engine_id);
    }
    if let Some(file_type) = &query.file_type {
        builder.push(" AND file_type = ").push_bind(file_type.clone());
    }
    if let Some(start) = query.start_date {
        let start = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = query.end_date.and_then(|d| d.checked_add_days(Days::new(1))) {
        let end = end.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        builder.push(" AND created_at < ").push_bind(end);
    }
}
