use std::sync::Arc;
use std::time::Duration;

use cuedeck_events::NotificationHub;

/// Spawn a background task that sends periodic Ping frames to every
/// registered connection.
///
/// Runs until aborted through the returned handle.
pub fn start_heartbeat(hub: Arc<NotificationHub>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            let count = hub.registration_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            hub.ping_all().await;
        }
    })
}

/// Spawn a background task that closes registrations older than `ttl`.
pub fn start_expiry_sweep(
    hub: Arc<NotificationHub>,
    ttl: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let removed = hub.sweep_expired(ttl).await;
            if removed > 0 {
                tracing::info!(removed, "Expired hub registrations closed");
            }
        }
    })
}
