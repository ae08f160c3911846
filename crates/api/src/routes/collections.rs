//! Route definitions for collections, their cards and their uploads.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{cards, collections, uploads};
use crate::state::AppState;

/// Routes mounted at `/collections`.
///
/// ```text
/// GET    /                         -> list_collections
/// POST   /                         -> create_collection
/// GET    /{id}                     -> get_collection
/// DELETE /{id}                     -> delete_collection
/// GET    /{id}/files               -> list_files
/// GET    /{id}/cards               -> list_cards
/// POST   /{id}/cards               -> create_card
/// GET    /{id}/cards/{card_id}     -> get_card
/// PUT    /{id}/cards/{card_id}     -> update_card
/// DELETE /{id}/cards/{card_id}     -> delete_card
/// POST   /{id}/uploads             -> create_upload
/// POST   /{id}/uploads/verify      -> verify_upload
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/{id}",
            get(collections::get_collection).delete(collections::delete_collection),
        )
        .route("/{id}/files", get(collections::list_files))
        .route(
            "/{id}/cards",
            get(collections::list_cards).post(cards::create_card),
        )
        .route(
            "/{id}/cards/{card_id}",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/{id}/uploads", post(uploads::create_upload))
        .route("/{id}/uploads/verify", post(uploads::verify_upload))
}
