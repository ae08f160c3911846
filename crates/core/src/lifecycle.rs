//! Upload file lifecycle.
//!
//! ```text
//! pending_upload --verify(success)--> uploaded --pipeline--> processed
//!        |
//!        +--verify(failure)--> (row deleted)
//! ```
//!
//! The state is derived from the `files` row rather than stored: a row with
//! no display name is still waiting for the client's upload confirmation.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Upload slot issued, client has not confirmed the upload yet.
    PendingUpload,
    /// Upload confirmed; a processing job has been (or will be) queued.
    Uploaded,
    /// Cards generated and persisted. Terminal.
    Processed,
}

impl FileState {
    /// Derive the state from the persisted columns.
    pub fn from_columns(file_name: Option<&str>, processed: bool) -> Self {
        match (file_name, processed) {
            (_, true) => Self::Processed,
            (Some(_), false) => Self::Uploaded,
            (None, false) => Self::PendingUpload,
        }
    }

    /// Whether a processing job may be enqueued for a file in this state.
    pub fn accepts_job(self) -> bool {
        self == Self::Uploaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_row_is_pending_upload() {
        assert_eq!(FileState::from_columns(None, false), FileState::PendingUpload);
    }

    #[test]
    fn completed_row_is_uploaded() {
        let state = FileState::from_columns(Some("notes.txt"), false);
        assert_eq!(state, FileState::Uploaded);
        assert!(state.accepts_job());
    }

    #[test]
    fn processed_wins() {
        let state = FileState::from_columns(Some("notes.txt"), true);
        assert_eq!(state, FileState::Processed);
        assert!(!state.accepts_job());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FileState::PendingUpload).unwrap(),
            "\"pending_upload\""
        );
    }
}
