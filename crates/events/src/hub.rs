//! File-id keyed registry of client connections awaiting a pipeline result.
//!
//! Each registration maps one file id to exactly one connection. A later
//! registration for the same id replaces the earlier one (last registered
//! wins). [`NotificationHub::notify`] removes the registration, writes one
//! message and closes the connection: a connection receives at most one
//! notification.
//!
//! The hub never touches a socket directly. A connection is represented by
//! the sending half of a channel; the transport task on the other end turns
//! [`HubFrame`]s into WebSocket frames and tears the socket down on
//! [`HubFrame::Close`].

use std::collections::HashMap;
use std::time::Duration;

use cuedeck_core::notification::{FileNotification, NotificationOutcome};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

/// Frames pushed from the hub to a connection's transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubFrame {
    /// A JSON-encoded [`FileNotification`].
    Text(String),
    /// Keep-alive ping.
    Ping,
    /// Close the connection. Always the last frame a registration receives.
    Close,
}

/// Channel sender half representing one live connection.
pub type HubSender = mpsc::UnboundedSender<HubFrame>;

/// Errors returned by [`NotificationHub::notify`].
///
/// Neither is fatal to the caller: the pipeline outcome is already durable.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("There is no such connection for file {0}")]
    NoConnection(String),

    #[error("Connection for file {0} was already closed")]
    ConnectionClosed(String),

    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

struct Registration {
    conn_id: Uuid,
    sender: HubSender,
    registered_at: Instant,
}

/// Registry of connections keyed by file id.
///
/// All reads and writes go through one mutex. Designed to be wrapped in
/// `Arc` and shared between the WebSocket handler and the worker pool.
pub struct NotificationHub {
    registrations: Mutex<HashMap<String, Registration>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
        }
    }

    /// Associate a live connection with a file id.
    ///
    /// A previous registration for the same id is replaced without being
    /// closed; its transport keeps running until the client disconnects or
    /// the registration would have expired.
    pub async fn register(&self, file_id: impl Into<String>, conn_id: Uuid, sender: HubSender) {
        let file_id = file_id.into();
        let registration = Registration {
            conn_id,
            sender,
            registered_at: Instant::now(),
        };
        let previous = self
            .registrations
            .lock()
            .await
            .insert(file_id.clone(), registration);

        if let Some(previous) = previous {
            tracing::debug!(
                file_id = %file_id,
                replaced_conn_id = %previous.conn_id,
                %conn_id,
                "Replaced existing hub registration",
            );
        }
    }

    /// Drop the registration for `file_id` if it still belongs to `conn_id`.
    ///
    /// Called by the transport when its client disconnects. Returns `true`
    /// if a registration was removed.
    pub async fn unregister(&self, file_id: &str, conn_id: Uuid) -> bool {
        let mut registrations = self.registrations.lock().await;
        match registrations.get(file_id) {
            Some(reg) if reg.conn_id == conn_id => {
                registrations.remove(file_id);
                true
            }
            _ => false,
        }
    }

    /// Push the outcome for `file_id` to its registered connection, then
    /// close it.
    ///
    /// The registration is removed before anything is written, so a second
    /// call for the same id returns [`HubError::NoConnection`].
    pub async fn notify(
        &self,
        file_id: &str,
        file_name: &str,
        outcome: NotificationOutcome,
    ) -> Result<(), HubError> {
        let registration = self
            .registrations
            .lock()
            .await
            .remove(file_id)
            .ok_or_else(|| HubError::NoConnection(file_id.to_string()))?;

        let payload = serde_json::to_string(&FileNotification::new(file_id, file_name, outcome));

        let delivered = match &payload {
            Ok(text) => registration.sender.send(HubFrame::Text(text.clone())).is_ok(),
            Err(_) => false,
        };
        // One notification per connection: close regardless of the write.
        let _ = registration.sender.send(HubFrame::Close);

        payload?;
        if !delivered {
            return Err(HubError::ConnectionClosed(file_id.to_string()));
        }

        tracing::debug!(file_id, conn_id = %registration.conn_id, ?outcome, "Notification delivered");
        Ok(())
    }

    /// Close and drop registrations older than `max_age`.
    ///
    /// Covers uploads that are never verified or whose job never completes.
    /// Returns the number of registrations removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut registrations = self.registrations.lock().await;
        let before = registrations.len();

        registrations.retain(|file_id, reg| {
            let keep = now.duration_since(reg.registered_at) < max_age;
            if !keep {
                tracing::debug!(file_id = %file_id, conn_id = %reg.conn_id, "Hub registration expired");
                let _ = reg.sender.send(HubFrame::Close);
            }
            keep
        });

        before - registrations.len()
    }

    /// Send a Ping frame to every registered connection.
    pub async fn ping_all(&self) {
        let registrations = self.registrations.lock().await;
        for reg in registrations.values() {
            let _ = reg.sender.send(HubFrame::Ping);
        }
    }

    /// Current number of registrations.
    pub async fn registration_count(&self) -> usize {
        self.registrations.lock().await.len()
    }

    /// Close every registered connection and clear the registry.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut registrations = self.registrations.lock().await;
        let count = registrations.len();
        for reg in registrations.values() {
            let _ = reg.sender.send(HubFrame::Close);
        }
        registrations.clear();
        tracing::info!(count, "Closed all hub connections");
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
