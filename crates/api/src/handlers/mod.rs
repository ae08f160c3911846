pub mod cards;
pub mod collections;
pub mod uploads;

use cuedeck_core::error::CoreError;
use cuedeck_core::types::DbId;
use cuedeck_db::repositories::CollectionRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Fail with 404 unless `collection_id` belongs to `user_id`.
///
/// Collections of other users are reported as missing rather than
/// forbidden so ids cannot be discovered.
pub(crate) async fn ensure_collection_owned(
    state: &AppState,
    collection_id: DbId,
    user_id: DbId,
) -> AppResult<()> {
    if CollectionRepo::is_owned_by(&state.pool, collection_id, user_id).await? {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Collection",
            id: collection_id,
        }))
    }
}
