//! Handlers for cards written or edited by hand.
//!
//! Every route sits under a collection; the collection must belong to the
//! caller before any card in it is touched.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cuedeck_core::error::CoreError;
use cuedeck_core::types::DbId;
use cuedeck_db::models::card::{CreateCard, UpdateCard};
use cuedeck_db::repositories::CardRepo;

use super::ensure_collection_owned;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn card_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Card", id })
}

/// Trimmed side text, which must not be blank.
fn card_side(side: &str, text: &str) -> Result<String, CoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CoreError::Validation(format!("Card {side} must not be empty")));
    }
    Ok(text.to_string())
}

/// POST /api/v1/collections/{id}/cards
pub async fn create_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
    Json(input): Json<CreateCard>,
) -> AppResult<impl IntoResponse> {
    let input = CreateCard {
        front: card_side("front", &input.front)?,
        back: card_side("back", &input.back)?,
    };
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;

    let card = CardRepo::create(&state.pool, collection_id, &input).await?;
    tracing::info!(card_id = %card.id, %collection_id, "Card created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: card })))
}

/// GET /api/v1/collections/{id}/cards/{card_id}
pub async fn get_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((collection_id, card_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;
    let card = CardRepo::find_in_collection(&state.pool, card_id, collection_id)
        .await?
        .ok_or_else(|| card_not_found(card_id))?;
    Ok(Json(DataResponse { data: card }))
}

/// PUT /api/v1/collections/{id}/cards/{card_id}
pub async fn update_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((collection_id, card_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateCard>,
) -> AppResult<impl IntoResponse> {
    let input = UpdateCard {
        front: input.front.map(|t| card_side("front", &t)).transpose()?,
        back: input.back.map(|t| card_side("back", &t)).transpose()?,
    };
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;

    let card = CardRepo::update(&state.pool, card_id, collection_id, &input)
        .await?
        .ok_or_else(|| card_not_found(card_id))?;
    Ok(Json(DataResponse { data: card }))
}

/// DELETE /api/v1/collections/{id}/cards/{card_id}
pub async fn delete_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((collection_id, card_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;
    if CardRepo::delete(&state.pool, card_id, collection_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(card_not_found(card_id))
    }
}
