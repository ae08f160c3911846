use std::sync::Arc;
use std::time::Duration;

use cuedeck_events::NotificationHub;
use cuedeck_pipeline::storage::S3Store;
use cuedeck_queue::AmqpBroker;
use cuedeck_worker::{setup, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headless worker: consumes jobs without serving clients. Notifications
/// find no registered connection here and are dropped at debug level.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "cuedeck_worker=debug,cuedeck_pipeline=debug,cuedeck_queue=debug,cuedeck_events=debug".into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(workers = config.worker_count, "Loaded worker configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = cuedeck_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    cuedeck_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    // --- Broker ---
    let broker = AmqpBroker::connect(&config.amqp_url)
        .await
        .expect("Failed to connect to message broker");

    // --- Pipeline ---
    let storage = Arc::new(S3Store::from_env(config.s3_bucket.clone()).await);
    let hub = Arc::new(NotificationHub::new());
    let executor = setup::build_executor(&config, pool, storage, hub);
    let workers = setup::build_pool(&config, Arc::new(broker.clone()), executor)
        .expect("Invalid worker pool configuration");

    let cancel = CancellationToken::new();
    let pool_handle = tokio::spawn(workers.run(cancel.clone()));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping workers");

    cancel.cancel();
    let drain = config.pipeline.generate_timeout + Duration::from_secs(30);
    if tokio::time::timeout(drain, pool_handle).await.is_err() {
        tracing::warn!("Workers did not stop in time");
    }

    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "Failed to close broker connection");
    }
    tracing::info!("Worker shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
