//! Uploaded file entity model and DTOs.

use cuedeck_core::lifecycle::FileState;
use cuedeck_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `files` table.
///
/// `file_name` and `format` stay `NULL` until the client confirms its upload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct File {
    pub id: DbId,
    pub collection_id: DbId,
    pub user_id: DbId,
    pub object_key: String,
    pub file_name: Option<String>,
    pub format: Option<String>,
    pub processed: bool,
    pub uploaded_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl File {
    /// Lifecycle state derived from the row.
    pub fn state(&self) -> FileState {
        FileState::from_columns(self.file_name.as_deref(), self.processed)
    }
}

/// Details supplied by the client once its direct upload succeeded.
#[derive(Debug, Clone)]
pub struct CompleteFileDetails {
    pub file_name: String,
    /// Normalized source format tag.
    pub format: String,
}
