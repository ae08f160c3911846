pub mod collections;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                          WebSocket (file result hub)
///
/// /collections                                 list, create
/// /collections/{id}                            get, delete
/// /collections/{id}/files                      list files with lifecycle state
/// /collections/{id}/cards                      list, create by hand
/// /collections/{id}/cards/{card_id}            get, update, delete
/// /collections/{id}/uploads                    issue upload slot (POST)
/// /collections/{id}/uploads/verify             confirm upload, enqueue job (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/collections", collections::router())
}
