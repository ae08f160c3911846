/// All database primary keys are UUIDs (v7 for rows created by the service).
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
