//! Payload pushed to a client when its file finishes processing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOutcome {
    Ready,
    Failed,
}

/// The single message written to a registered connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNotification {
    pub status: NotificationOutcome,
    pub file_id: String,
    pub file_name: String,
    pub message: String,
}

impl FileNotification {
    pub fn new(file_id: impl Into<String>, file_name: &str, status: NotificationOutcome) -> Self {
        let message = match status {
            NotificationOutcome::Ready => format!("Your cards from {file_name} are ready"),
            NotificationOutcome::Failed => {
                format!("We could not create cards from {file_name}")
            }
        };
        Self {
            status,
            file_id: file_id.into(),
            file_name: file_name.to_string(),
            message,
        }
    }
}
