//! In-memory stand-ins for the pipeline's external systems.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cuedeck_core::cards::GeneratedCard;
use cuedeck_core::message::FileJobMessage;
use cuedeck_core::types::DbId;
use cuedeck_db::models::card::PersistOutcome;
use cuedeck_events::{HubFrame, NotificationHub};
use cuedeck_pipeline::backoff::BackoffConfig;
use cuedeck_pipeline::convert::{pdf_path_for, ConvertError, DocumentConverter};
use cuedeck_pipeline::generation::{CardGenerator, GenerationError};
use cuedeck_pipeline::storage::{ObjectStore, StorageError};
use cuedeck_pipeline::store::{JobStore, StoreError};
use cuedeck_pipeline::{PipelineConfig, PipelineExecutor};
use cuedeck_queue::{DeliverySource, JobDelivery, MemoryQueue};
use futures::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    transient_failures: AtomicU32,
    pub get_calls: AtomicU32,
}

impl FakeStorage {
    pub fn with_object(key: &str, body: &[u8]) -> Self {
        let storage = Self::default();
        storage
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_vec());
        storage
    }

    /// Fail the next `n` reads with a retryable error.
    pub fn fail_next(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for FakeStorage {
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Request("connection reset".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put_object(&self, key: &str, body: Vec<u8>, _: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn presign_put(&self, key: &str, _: Duration) -> Result<String, StorageError> {
        Ok(format!("https://storage.test/{key}"))
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

pub const CONVERTED_PDF: &[u8] = b"%PDF-converted";

#[derive(Default)]
pub struct FakeConverter {
    pub calls: AtomicU32,
    pub fail: bool,
    pub inputs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.to_path_buf());
        if self.fail {
            return Err(ConvertError::Failed {
                code: Some(1),
                stderr: "source file could not be loaded".into(),
            });
        }
        let output = pdf_path_for(input, out_dir);
        tokio::fs::write(&output, CONVERTED_PDF).await?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct FakeGenerator {
    cards: Option<Vec<GeneratedCard>>,
    delay: Option<Duration>,
    pub calls: AtomicU32,
    pub received: Mutex<Vec<Vec<u8>>>,
}

impl FakeGenerator {
    pub fn returning(cards: Vec<GeneratedCard>) -> Self {
        Self {
            cards: Some(cards),
            delay: None,
            calls: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            cards: None,
            ..Self::returning(Vec::new())
        }
    }

    pub fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(sample_cards())
        }
    }
}

#[async_trait]
impl CardGenerator for FakeGenerator {
    async fn generate(&self, pdf: Vec<u8>) -> Result<Vec<GeneratedCard>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(pdf);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.cards.clone().ok_or(GenerationError::EmptyResponse)
    }
}

pub fn sample_cards() -> Vec<GeneratedCard> {
    vec![
        GeneratedCard {
            front: "What is TCP?".into(),
            back: "A reliable transport protocol.".into(),
        },
        GeneratedCard {
            front: "Define polymorphism".into(),
            back: "One interface, many implementations.".into(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Job store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    pub files: Mutex<HashMap<DbId, bool>>,
    pub cards: Mutex<Vec<(DbId, GeneratedCard)>>,
    pub fail_persist: bool,
    /// Report files as unprocessed on lookup, as if another worker
    /// commits between lookup and persist.
    pub stale_lookup: bool,
}

impl FakeStore {
    pub fn with_file(file_id: DbId, processed: bool) -> Self {
        let store = Self::default();
        store.files.lock().unwrap().insert(file_id, processed);
        store
    }

    pub fn is_processed(&self, file_id: DbId) -> Option<bool> {
        self.files.lock().unwrap().get(&file_id).copied()
    }

    pub fn card_count(&self) -> usize {
        self.cards.lock().unwrap().len()
    }
}

#[async_trait]
impl JobStore for FakeStore {
    async fn processed(&self, file_id: DbId) -> Result<Option<bool>, StoreError> {
        if self.stale_lookup {
            return Ok(self.is_processed(file_id).map(|_| false));
        }
        Ok(self.is_processed(file_id))
    }

    async fn persist_generated(
        &self,
        file_id: DbId,
        collection_id: DbId,
        cards: &[GeneratedCard],
    ) -> Result<PersistOutcome, StoreError> {
        if self.fail_persist {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut files = self.files.lock().unwrap();
        let processed = files
            .get_mut(&file_id)
            .ok_or(StoreError::FileMissing(file_id))?;
        if *processed {
            return Ok(PersistOutcome::AlreadyProcessed);
        }
        *processed = true;
        self.cards
            .lock()
            .unwrap()
            .extend(cards.iter().map(|c| (collection_id, c.clone())));
        Ok(PersistOutcome::Committed(cards.len() as u64))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub storage: Arc<FakeStorage>,
    pub converter: Arc<FakeConverter>,
    pub generator: Arc<FakeGenerator>,
    pub store: Arc<FakeStore>,
    pub hub: Arc<NotificationHub>,
    pub scratch: tempfile::TempDir,
}

impl Harness {
    pub fn new(storage: FakeStorage, generator: FakeGenerator, store: FakeStore) -> Self {
        Self {
            storage: Arc::new(storage),
            converter: Arc::new(FakeConverter::default()),
            generator: Arc::new(generator),
            store: Arc::new(store),
            hub: Arc::new(NotificationHub::new()),
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            fetch_backoff: BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                multiplier: 2.0,
            },
            scratch_dir: self.scratch.path().join("scratch"),
            ..PipelineConfig::default()
        }
    }

    pub fn executor(&self, config: PipelineConfig) -> PipelineExecutor {
        PipelineExecutor::new(
            self.storage.clone(),
            self.converter.clone(),
            self.generator.clone(),
            self.store.clone(),
            self.hub.clone(),
            config,
        )
    }

    /// Register a client waiting on `file_id`.
    pub async fn watch(&self, file_id: &str) -> mpsc::UnboundedReceiver<HubFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.hub.register(file_id, Uuid::new_v4(), tx).await;
        rx
    }
}

pub fn job(file_id: DbId, format: &str) -> FileJobMessage {
    FileJobMessage {
        user_id: Uuid::new_v4(),
        collection_id: Uuid::new_v4(),
        file_name: format!("notes.{format}"),
        file_key: file_id.to_string(),
        format: format.to_string(),
    }
}

/// Enqueue `payload` and pull it back as a delivery.
pub async fn deliver(queue: &MemoryQueue, payload: Vec<u8>) -> JobDelivery {
    queue.push_raw(payload).unwrap();
    let mut stream = queue.open(1).await.unwrap();
    stream.next().await.unwrap().unwrap()
}
