//! Durable job state: the `processed` flag and generated cards.

use async_trait::async_trait;
use cuedeck_core::cards::GeneratedCard;
use cuedeck_core::types::DbId;
use cuedeck_db::models::card::PersistOutcome;
use cuedeck_db::repositories::{CardRepo, FileRepo};
use cuedeck_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("File {0} no longer exists")]
    FileMissing(DbId),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// The file's `processed` flag, or `None` if the row does not exist.
    async fn processed(&self, file_id: DbId) -> Result<Option<bool>, StoreError>;

    /// Insert `cards` and mark the file processed, atomically. A file that
    /// another delivery already processed gets no cards.
    async fn persist_generated(
        &self,
        file_id: DbId,
        collection_id: DbId,
        cards: &[GeneratedCard],
    ) -> Result<PersistOutcome, StoreError>;
}

/// [`JobStore`] over the PostgreSQL repositories.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn processed(&self, file_id: DbId) -> Result<Option<bool>, StoreError> {
        Ok(FileRepo::processed(&self.pool, file_id).await?)
    }

    async fn persist_generated(
        &self,
        file_id: DbId,
        collection_id: DbId,
        cards: &[GeneratedCard],
    ) -> Result<PersistOutcome, StoreError> {
        CardRepo::persist_generated(&self.pool, file_id, collection_id, cards)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => StoreError::FileMissing(file_id),
                other => StoreError::Database(other),
            })
    }
}
