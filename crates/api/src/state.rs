use std::sync::Arc;

use cuedeck_events::NotificationHub;
use cuedeck_pipeline::storage::ObjectStore;
use cuedeck_queue::JobPublisher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cuedeck_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// File-id keyed registry of clients waiting for results. Shared with
    /// the in-process worker pool.
    pub hub: Arc<NotificationHub>,
    /// Producer side of the work queue.
    pub publisher: Arc<dyn JobPublisher>,
    /// Object storage used to presign direct uploads.
    pub storage: Arc<dyn ObjectStore>,
}
