//! Handlers for collections and their read-only contents.
//!
//! Clients that are not connected to the hub poll these endpoints to see
//! whether a file has been processed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cuedeck_core::error::CoreError;
use cuedeck_core::lifecycle::FileState;
use cuedeck_core::types::DbId;
use cuedeck_db::models::collection::CreateCollection;
use cuedeck_db::models::file::File;
use cuedeck_db::repositories::{CardRepo, CollectionRepo, FileRepo};
use serde::Serialize;

use super::ensure_collection_owned;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum collection name length in characters.
const MAX_NAME_LEN: usize = 200;

/// A file row plus its derived lifecycle state.
#[derive(Debug, Serialize)]
pub struct FileView {
    #[serde(flatten)]
    pub file: File,
    pub state: FileState,
}

/// GET /api/v1/collections
pub async fn list_collections(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let collections = CollectionRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: collections }))
}

/// POST /api/v1/collections
pub async fn create_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCollection>,
) -> AppResult<impl IntoResponse> {
    let name = input.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Collection name must be between 1 and {MAX_NAME_LEN} characters"
        ))
        .into());
    }

    let collection = CollectionRepo::create(
        &state.pool,
        auth.user_id,
        &CreateCollection { name: name.into() },
    )
    .await?;

    tracing::info!(collection_id = %collection.id, user_id = %auth.user_id, "Collection created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: collection })))
}

/// GET /api/v1/collections/{id}
pub async fn get_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let collection = CollectionRepo::find_for_user(&state.pool, id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Collection",
            id,
        }))?;
    Ok(Json(DataResponse { data: collection }))
}

/// DELETE /api/v1/collections/{id}
///
/// Files and cards go with the collection. Stored objects are left in place.
pub async fn delete_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CollectionRepo::delete(&state.pool, id, auth.user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Collection",
            id,
        }));
    }
    tracing::info!(collection_id = %id, user_id = %auth.user_id, "Collection deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/collections/{id}/files
pub async fn list_files(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;

    let files = FileRepo::list_by_collection(&state.pool, collection_id, auth.user_id)
        .await?
        .into_iter()
        .map(|file| FileView {
            state: file.state(),
            file,
        })
        .collect::<Vec<_>>();

    Ok(Json(DataResponse { data: files }))
}

/// GET /api/v1/collections/{id}/cards
pub async fn list_cards(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;
    let cards = CardRepo::list_by_collection(&state.pool, collection_id).await?;
    Ok(Json(DataResponse { data: cards }))
}
