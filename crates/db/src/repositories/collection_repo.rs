//! Repository for the `collections` table.

use cuedeck_core::types::DbId;
use sqlx::PgPool;

use crate::models::collection::{Collection, CreateCollection};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, name, created_at, updated_at";

/// Provides CRUD operations for collections.
pub struct CollectionRepo;

impl CollectionRepo {
    /// Insert a new collection owned by `user_id`.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateCollection,
    ) -> Result<Collection, sqlx::Error> {
        let query = format!(
            "INSERT INTO collections (id, user_id, name) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Collection>(&query)
            .bind(DbId::now_v7())
            .bind(user_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// List a user's collections, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Collection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collections WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Collection>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Find a collection owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Collection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collections WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Collection>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a collection with its files and cards. Returns `true` if a
    /// row was removed.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether `collection_id` exists and belongs to `user_id`.
    pub async fn is_owned_by(
        pool: &PgPool,
        collection_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM collections WHERE id = $1 AND user_id = $2)",
        )
        .bind(collection_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
