//! Card entity model.

use cuedeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `cards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Card {
    pub id: DbId,
    pub collection_id: DbId,
    pub front: String,
    pub back: String,
    pub created_at: Timestamp,
}

/// DTO for a card written by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCard {
    pub front: String,
    pub back: String,
}

/// DTO for editing a card. Omitted sides are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCard {
    pub front: Option<String>,
    pub back: Option<String>,
}

/// What persisting a job's generated cards did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Cards were inserted and the file marked processed.
    Committed(u64),
    /// The file was already processed; nothing was inserted.
    AlreadyProcessed,
}
