//! Repository for the `cards` table.

use cuedeck_core::cards::GeneratedCard;
use cuedeck_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::card::{Card, CreateCard, PersistOutcome, UpdateCard};
use crate::repositories::FileRepo;

/// Column list for `cards` queries.
const COLUMNS: &str = "id, collection_id, front, back, created_at";

/// Provides data access for flashcards.
pub struct CardRepo;

impl CardRepo {
    /// Insert a batch of generated cards inside the caller's transaction.
    ///
    /// Stops at the first failing insert; the caller's transaction must then
    /// be rolled back.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        collection_id: DbId,
        cards: &[GeneratedCard],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for card in cards {
            sqlx::query("INSERT INTO cards (id, collection_id, front, back) VALUES ($1, $2, $3, $4)")
                .bind(DbId::now_v7())
                .bind(collection_id)
                .bind(&card.front)
                .bind(&card.back)
                .execute(&mut *conn)
                .await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Persist a job's generated cards and mark its file processed in one
    /// transaction.
    ///
    /// The file row is locked first, so concurrent deliveries of the same
    /// job serialize here and only the first one inserts. Either every card
    /// becomes visible together with `processed = true`, or nothing does.
    /// A missing file row rolls back with [`sqlx::Error::RowNotFound`].
    pub async fn persist_generated(
        pool: &PgPool,
        file_id: DbId,
        collection_id: DbId,
        cards: &[GeneratedCard],
    ) -> Result<PersistOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        match FileRepo::lock_processed(&mut *tx, file_id).await? {
            None => {
                tx.rollback().await?;
                return Err(sqlx::Error::RowNotFound);
            }
            Some(true) => {
                tx.rollback().await?;
                tracing::debug!(%file_id, "File already processed, cards discarded");
                return Ok(PersistOutcome::AlreadyProcessed);
            }
            Some(false) => {}
        }

        let inserted = Self::insert_batch(&mut *tx, collection_id, cards).await?;
        FileRepo::mark_processed(&mut *tx, file_id).await?;

        tx.commit().await?;
        tracing::debug!(%file_id, %collection_id, inserted, "Generated cards committed");
        Ok(PersistOutcome::Committed(inserted))
    }

    /// Insert a single hand-written card.
    pub async fn create(
        pool: &PgPool,
        collection_id: DbId,
        input: &CreateCard,
    ) -> Result<Card, sqlx::Error> {
        let query = format!(
            "INSERT INTO cards (id, collection_id, front, back) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Card>(&query)
            .bind(DbId::now_v7())
            .bind(collection_id)
            .bind(&input.front)
            .bind(&input.back)
            .fetch_one(pool)
            .await
    }

    /// Find a card within a collection.
    pub async fn find_in_collection(
        pool: &PgPool,
        id: DbId,
        collection_id: DbId,
    ) -> Result<Option<Card>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM cards WHERE id = $1 AND collection_id = $2");
        sqlx::query_as::<_, Card>(&query)
            .bind(id)
            .bind(collection_id)
            .fetch_optional(pool)
            .await
    }

    /// Update either side of a card. Returns `None` if the card is not in
    /// the collection.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        collection_id: DbId,
        input: &UpdateCard,
    ) -> Result<Option<Card>, sqlx::Error> {
        let query = format!(
            "UPDATE cards SET
                front = COALESCE($3, front),
                back = COALESCE($4, back)
             WHERE id = $1 AND collection_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Card>(&query)
            .bind(id)
            .bind(collection_id)
            .bind(&input.front)
            .bind(&input.back)
            .fetch_optional(pool)
            .await
    }

    /// Delete a card. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId, collection_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1 AND collection_id = $2")
            .bind(id)
            .bind(collection_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a collection's cards in creation order.
    pub async fn list_by_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<Card>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cards WHERE collection_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Card>(&query)
            .bind(collection_id)
            .fetch_all(pool)
            .await
    }

    /// Count a collection's cards.
    pub async fn count_by_collection(pool: &PgPool, collection_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cards WHERE collection_id = $1")
            .bind(collection_id)
            .fetch_one(pool)
            .await
    }
}
