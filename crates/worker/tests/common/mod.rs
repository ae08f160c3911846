//! Pipeline stand-ins that always succeed, for exercising the pool.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cuedeck_core::cards::GeneratedCard;
use cuedeck_core::message::FileJobMessage;
use cuedeck_core::types::DbId;
use cuedeck_db::models::card::PersistOutcome;
use cuedeck_events::NotificationHub;
use cuedeck_pipeline::backoff::BackoffConfig;
use cuedeck_pipeline::convert::{ConvertError, DocumentConverter};
use cuedeck_pipeline::generation::{CardGenerator, GenerationError};
use cuedeck_pipeline::storage::{ObjectStore, StorageError};
use cuedeck_pipeline::store::{JobStore, StoreError};
use cuedeck_pipeline::{PipelineConfig, PipelineExecutor};
use uuid::Uuid;

pub struct AnyObject;

#[async_trait]
impl ObjectStore for AnyObject {
    async fn get_object(&self, _: &str) -> Result<Vec<u8>, StorageError> {
        Ok(b"%PDF".to_vec())
    }

    async fn put_object(&self, _: &str, _: Vec<u8>, _: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn presign_put(&self, key: &str, _: Duration) -> Result<String, StorageError> {
        Ok(format!("https://storage.test/{key}"))
    }
}

pub struct NoConversion;

#[async_trait]
impl DocumentConverter for NoConversion {
    async fn convert(&self, input: &Path, _: &Path) -> Result<PathBuf, ConvertError> {
        Err(ConvertError::MissingOutput(input.to_path_buf()))
    }
}

/// Generates one card after `delay`.
pub struct SlowGenerator {
    pub delay: Duration,
}

#[async_trait]
impl CardGenerator for SlowGenerator {
    async fn generate(&self, _: Vec<u8>) -> Result<Vec<GeneratedCard>, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![GeneratedCard {
            front: "Q".into(),
            back: "A".into(),
        }])
    }
}

/// Every file exists and starts unprocessed.
#[derive(Default)]
pub struct OpenStore {
    pub processed: Mutex<HashSet<DbId>>,
}

#[async_trait]
impl JobStore for OpenStore {
    async fn processed(&self, file_id: DbId) -> Result<Option<bool>, StoreError> {
        Ok(Some(self.processed.lock().unwrap().contains(&file_id)))
    }

    async fn persist_generated(
        &self,
        file_id: DbId,
        _: DbId,
        cards: &[GeneratedCard],
    ) -> Result<PersistOutcome, StoreError> {
        self.processed.lock().unwrap().insert(file_id);
        Ok(PersistOutcome::Committed(cards.len() as u64))
    }
}

pub fn executor(generate_delay: Duration) -> Arc<PipelineExecutor> {
    Arc::new(PipelineExecutor::new(
        Arc::new(AnyObject),
        Arc::new(NoConversion),
        Arc::new(SlowGenerator {
            delay: generate_delay,
        }),
        Arc::new(OpenStore::default()),
        Arc::new(NotificationHub::new()),
        PipelineConfig::default(),
    ))
}

pub fn fast_restarts() -> BackoffConfig {
    BackoffConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

pub fn pdf_job() -> Vec<u8> {
    FileJobMessage {
        user_id: Uuid::new_v4(),
        collection_id: Uuid::new_v4(),
        file_name: "notes.pdf".into(),
        file_key: Uuid::new_v4().to_string(),
        format: "pdf".into(),
    }
    .to_payload()
    .unwrap()
}

/// Poll `check` every 10ms for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
