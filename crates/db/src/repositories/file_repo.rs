//! Repository for the `files` table.
//!
//! Files go through a two-phase creation: [`FileRepo::create_pending`] when
//! the upload slot is issued, then [`FileRepo::complete_details`] once the
//! client confirms the upload. A failed upload removes the pending row via
//! [`FileRepo::delete_unprocessed`].

use cuedeck_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::file::{CompleteFileDetails, File};

/// Column list for `files` queries.
const COLUMNS: &str = "\
    id, collection_id, user_id, object_key, file_name, format, \
    processed, uploaded_at, created_at";

/// Provides CRUD operations for uploaded files.
pub struct FileRepo;

impl FileRepo {
    /// Allocate a bare file row for an upload slot.
    ///
    /// The row id doubles as the object storage key.
    pub async fn create_pending(
        pool: &PgPool,
        collection_id: DbId,
        user_id: DbId,
    ) -> Result<File, sqlx::Error> {
        let id = DbId::now_v7();
        let query = format!(
            "INSERT INTO files (id, collection_id, user_id, object_key) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, File>(&query)
            .bind(id)
            .bind(collection_id)
            .bind(user_id)
            .bind(id.to_string())
            .fetch_one(pool)
            .await
    }

    /// Fill in the display name and format after a confirmed upload.
    ///
    /// Scoped to the owning collection and user. Returns `false` if no such
    /// row exists.
    pub async fn complete_details(
        pool: &PgPool,
        id: DbId,
        collection_id: DbId,
        user_id: DbId,
        details: &CompleteFileDetails,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE files SET file_name = $4, format = $5, uploaded_at = NOW() \
             WHERE id = $1 AND collection_id = $2 AND user_id = $3",
        )
        .bind(id)
        .bind(collection_id)
        .bind(user_id)
        .bind(&details.file_name)
        .bind(&details.format)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a file row the client reported as failed to upload.
    ///
    /// Processed rows are never deleted here. Returns `true` if a row was
    /// removed.
    pub async fn delete_unprocessed(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM files WHERE id = $1 AND user_id = $2 AND processed = FALSE",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a file by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<File>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files WHERE id = $1");
        sqlx::query_as::<_, File>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Read the idempotency flag. `None` if the file does not exist.
    pub async fn processed(pool: &PgPool, id: DbId) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT processed FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a collection's files for its owner, newest first.
    pub async fn list_by_collection(
        pool: &PgPool,
        collection_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<File>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM files \
             WHERE collection_id = $1 AND user_id = $2 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, File>(&query)
            .bind(collection_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Read the `processed` flag and lock the row until the caller's
    /// transaction ends. `None` if the file does not exist.
    pub async fn lock_processed(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT processed FROM files WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Flip `processed` from false to true inside the caller's transaction.
    ///
    /// Returns `false` if the row does not exist or is already processed.
    pub async fn mark_processed(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE files SET processed = TRUE WHERE id = $1 AND processed = FALSE")
                .bind(id)
                .execute(conn)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
