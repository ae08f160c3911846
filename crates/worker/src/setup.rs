//! Wiring of the production pipeline from configuration.

use std::sync::Arc;

use cuedeck_db::DbPool;
use cuedeck_events::NotificationHub;
use cuedeck_pipeline::convert::LibreOfficeConverter;
use cuedeck_pipeline::generation::GeminiGenerator;
use cuedeck_pipeline::storage::ObjectStore;
use cuedeck_pipeline::store::PgJobStore;
use cuedeck_pipeline::PipelineExecutor;
use cuedeck_queue::DeliverySource;

use crate::config::WorkerConfig;
use crate::pool::{WorkerError, WorkerPool};

/// Build the executor backed by S3, LibreOffice, Gemini and PostgreSQL.
pub fn build_executor(
    config: &WorkerConfig,
    pool: DbPool,
    storage: Arc<dyn ObjectStore>,
    hub: Arc<NotificationHub>,
) -> PipelineExecutor {
    let generator = GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    );

    PipelineExecutor::new(
        storage,
        Arc::new(LibreOfficeConverter::new(&config.converter_bin)),
        Arc::new(generator),
        Arc::new(PgJobStore::new(pool)),
        hub,
        config.pipeline.clone(),
    )
}

/// Build a pool of `config.worker_count` workers.
pub fn build_pool(
    config: &WorkerConfig,
    source: Arc<dyn DeliverySource>,
    executor: PipelineExecutor,
) -> Result<WorkerPool, WorkerError> {
    Ok(
        WorkerPool::new(source, Arc::new(executor), config.worker_count)?
            .with_restart_backoff(config.restart_backoff.clone()),
    )
}
