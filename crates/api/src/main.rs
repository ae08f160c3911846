use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cuedeck_api::config::ServerConfig;
use cuedeck_api::router::build_app_router;
use cuedeck_api::state::AppState;
use cuedeck_api::ws;
use cuedeck_events::NotificationHub;
use cuedeck_pipeline::storage::S3Store;
use cuedeck_queue::AmqpBroker;
use cuedeck_worker::{setup, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "cuedeck_api=debug,cuedeck_worker=debug,cuedeck_pipeline=debug,cuedeck_queue=debug,\
         cuedeck_events=debug,tower_http=debug"
            .into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        workers = worker_config.worker_count,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = cuedeck_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    cuedeck_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    cuedeck_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Broker ---
    let broker = AmqpBroker::connect(&worker_config.amqp_url)
        .await
        .expect("Failed to connect to message broker");
    tracing::info!("Message broker connected");

    // --- Object storage ---
    let storage = Arc::new(S3Store::from_env(worker_config.s3_bucket.clone()).await);

    // --- Notification hub ---
    let hub = Arc::new(NotificationHub::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&hub), config.hub.heartbeat_interval);
    let sweep_handle = ws::start_expiry_sweep(
        Arc::clone(&hub),
        config.hub.registration_ttl,
        config.hub.sweep_interval,
    );

    // --- Worker pool ---
    // Runs in this process so pipeline results reach sockets held by the hub.
    let executor = setup::build_executor(
        &worker_config,
        pool.clone(),
        storage.clone(),
        Arc::clone(&hub),
    );
    let workers = setup::build_pool(&worker_config, Arc::new(broker.clone()), executor)
        .expect("Invalid worker pool configuration");
    let cancel = CancellationToken::new();
    let pool_handle = tokio::spawn(workers.run(cancel.clone()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        hub: Arc::clone(&hub),
        publisher: Arc::new(broker.clone()),
        storage,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // In-flight jobs finish (bounded by their step deadlines) and may still
    // notify waiting sockets, so the pool stops before the hub.
    cancel.cancel();
    let drain = worker_config.pipeline.generate_timeout + Duration::from_secs(30);
    if tokio::time::timeout(drain, pool_handle).await.is_err() {
        tracing::warn!("Workers did not stop in time");
    }
    tracing::info!("Worker pool stopped");

    let waiting = hub.registration_count().await;
    tracing::info!(waiting, "Closing remaining WebSocket connections");
    hub.shutdown_all().await;

    heartbeat_handle.abort();
    sweep_handle.abort();
    tracing::info!("Hub background tasks stopped");

    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "Failed to close broker connection");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
