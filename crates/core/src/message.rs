//! Queue message contract for file-processing jobs.
//!
//! The payload is a flat JSON object with no version field. Field names are
//! fixed on the wire; consumers assume the current shape.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Content type stamped on every published job.
pub const CONTENT_TYPE: &str = "application/json";

/// One unit of pipeline work: a single uploaded file awaiting flashcard
/// generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileJobMessage {
    /// Owner of the upload.
    #[serde(rename = "userID")]
    pub user_id: DbId,
    /// Collection the generated cards are added to.
    #[serde(rename = "collectionID")]
    pub collection_id: DbId,
    /// Display name shown to the user (e.g. `notes.txt`).
    #[serde(rename = "filename")]
    pub file_name: String,
    /// Object storage key. Equal to the file row id.
    pub file_key: String,
    /// Source format tag, already normalized (e.g. `pdf`, `txt`).
    pub format: String,
}

impl FileJobMessage {
    /// Serialize to the JSON wire payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a wire payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// The file row id, parsed from the object key.
    pub fn file_id(&self) -> Result<DbId, CoreError> {
        self.file_key.parse().map_err(|_| {
            CoreError::Validation(format!(
                "file_key '{}' is not a valid file id",
                self.file_key
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileJobMessage {
        FileJobMessage {
            user_id: uuid::Uuid::now_v7(),
            collection_id: uuid::Uuid::now_v7(),
            file_name: "notes.txt".into(),
            file_key: uuid::Uuid::now_v7().to_string(),
            format: "txt".into(),
        }
    }

    #[test]
    fn wire_field_names_are_fixed() {
        let msg = sample();
        let value: serde_json::Value = serde_json::from_slice(&msg.to_payload().unwrap()).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["collectionID", "file_key", "filename", "format", "userID"]
        );
    }

    #[test]
    fn decodes_payload_from_other_producers() {
        let raw = br#"{
            "userID": "0190a0d2-6f5c-7c3e-9f1a-2b3c4d5e6f70",
            "collectionID": "0190a0d2-6f5c-7c3e-9f1a-2b3c4d5e6f71",
            "filename": "slides.pptx",
            "file_key": "0190a0d2-6f5c-7c3e-9f1a-2b3c4d5e6f72",
            "format": "pptx"
        }"#;
        let msg = FileJobMessage::from_payload(raw).unwrap();
        assert_eq!(msg.file_name, "slides.pptx");
        assert_eq!(
            msg.file_id().unwrap().to_string(),
            "0190a0d2-6f5c-7c3e-9f1a-2b3c4d5e6f72"
        );
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert!(FileJobMessage::from_payload(b"not json").is_err());
        assert!(FileJobMessage::from_payload(br#"{"filename":"x"}"#).is_err());
    }

    #[test]
    fn non_uuid_file_key_is_a_validation_error() {
        let mut msg = sample();
        msg.file_key = "f1".into();
        assert!(matches!(msg.file_id(), Err(CoreError::Validation(_))));
    }
}
