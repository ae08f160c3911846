//! Runs one delivery through the pipeline and settles it.
//!
//! Settlement rules:
//!
//! - Undecodable payload: reject. Nobody can be notified.
//! - Already processed: ack, notify ready. No side effects are repeated.
//! - Every step succeeded: cards and the `processed` flag are committed
//!   together, then ack, then notify ready.
//! - Any step failed: reject without requeue, then notify failed.
//!
//! Notification is best-effort and never changes the settlement.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cuedeck_core::formats::{needs_conversion, normalize_format};
use cuedeck_core::message::FileJobMessage;
use cuedeck_core::notification::NotificationOutcome;
use cuedeck_db::models::card::PersistOutcome;
use cuedeck_events::NotificationHub;
use cuedeck_queue::{JobDelivery, QueueError};

use crate::backoff::{next_delay, BackoffConfig};
use crate::convert::{ConvertError, DocumentConverter};
use crate::error::{PipelineError, PipelineStep};
use crate::generation::CardGenerator;
use crate::storage::ObjectStore;
use crate::store::JobStore;

/// Deadlines and retry limits for the pipeline steps.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch_timeout: Duration,
    pub convert_timeout: Duration,
    pub generate_timeout: Duration,
    pub persist_timeout: Duration,
    /// Total fetch attempts, including the first.
    pub fetch_attempts: u32,
    pub fetch_backoff: BackoffConfig,
    /// Parent directory for per-job conversion scratch space.
    pub scratch_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(60),
            convert_timeout: Duration::from_secs(120),
            generate_timeout: Duration::from_secs(300),
            persist_timeout: Duration::from_secs(30),
            fetch_attempts: 3,
            fetch_backoff: BackoffConfig {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(5),
                multiplier: 2.0,
            },
            scratch_dir: std::env::temp_dir().join("cuedeck"),
        }
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Cards were generated and committed; the delivery was acked.
    Processed { cards: u64 },
    /// The file was already processed; the delivery was acked.
    Skipped,
    /// The delivery was rejected.
    Rejected,
}

enum Completed {
    Persisted(u64),
    AlreadyProcessed,
}

/// Shared by every worker; holds no per-job state.
pub struct PipelineExecutor {
    storage: Arc<dyn ObjectStore>,
    converter: Arc<dyn DocumentConverter>,
    generator: Arc<dyn CardGenerator>,
    store: Arc<dyn JobStore>,
    hub: Arc<NotificationHub>,
    config: PipelineConfig,
}

impl PipelineExecutor {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        converter: Arc<dyn DocumentConverter>,
        generator: Arc<dyn CardGenerator>,
        store: Arc<dyn JobStore>,
        hub: Arc<NotificationHub>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            storage,
            converter,
            generator,
            store,
            hub,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process and settle one delivery.
    ///
    /// Errors are returned only when settling with the broker fails, which
    /// means the worker's channel is unusable.
    pub async fn handle(
        &self,
        worker_id: usize,
        delivery: JobDelivery,
    ) -> Result<JobOutcome, QueueError> {
        let started = Instant::now();

        let job = match FileJobMessage::from_payload(&delivery.payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "Discarding undecodable job");
                delivery.reject().await?;
                return Ok(JobOutcome::Rejected);
            }
        };

        tracing::info!(
            worker_id,
            file_key = %job.file_key,
            format = %job.format,
            redelivered = delivery.redelivered,
            "Job received",
        );

        match self.run(&job).await {
            Ok(completed) => {
                delivery.ack().await?;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let outcome = match completed {
                    Completed::Persisted(cards) => {
                        tracing::info!(worker_id, file_key = %job.file_key, cards, elapsed_ms, "Job processed");
                        JobOutcome::Processed { cards }
                    }
                    Completed::AlreadyProcessed => {
                        tracing::info!(worker_id, file_key = %job.file_key, elapsed_ms, "File already processed, skipping");
                        JobOutcome::Skipped
                    }
                };
                self.notify(&job, NotificationOutcome::Ready).await;
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    worker_id,
                    file_key = %job.file_key,
                    step = e.step().map(PipelineStep::as_str),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job failed",
                );
                delivery.reject().await?;
                self.notify(&job, NotificationOutcome::Failed).await;
                Ok(JobOutcome::Rejected)
            }
        }
    }

    async fn run(&self, job: &FileJobMessage) -> Result<Completed, PipelineError> {
        let file_id = job.file_id()?;
        // Keys are stored and watched in canonical form.
        let file_key = file_id.to_string();
        let format = normalize_format(&job.format)?;

        let processed = self
            .with_deadline(
                PipelineStep::Lookup,
                self.config.persist_timeout,
                self.store.processed(file_id),
            )
            .await??;
        match processed {
            None => return Err(PipelineError::UnknownFile(file_id)),
            Some(true) => return Ok(Completed::AlreadyProcessed),
            Some(false) => {}
        }

        let document = self.fetch(&file_key).await?;

        let pdf = if needs_conversion(&format) {
            self.convert(&file_key, &format, document).await?
        } else {
            document
        };

        let cards = self
            .with_deadline(
                PipelineStep::Generate,
                self.config.generate_timeout,
                self.generator.generate(pdf),
            )
            .await??;

        let persisted = self
            .with_deadline(
                PipelineStep::Persist,
                self.config.persist_timeout,
                self.store
                    .persist_generated(file_id, job.collection_id, &cards),
            )
            .await??;

        Ok(match persisted {
            PersistOutcome::Committed(inserted) => Completed::Persisted(inserted),
            // A duplicate delivery finished first.
            PersistOutcome::AlreadyProcessed => Completed::AlreadyProcessed,
        })
    }

    /// Fetch with a per-attempt deadline, retrying transient failures.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, PipelineError> {
        let mut delay = self.config.fetch_backoff.initial_delay;
        let mut attempt = 1;

        loop {
            let err = match self
                .with_deadline(
                    PipelineStep::Fetch,
                    self.config.fetch_timeout,
                    self.storage.get_object(key),
                )
                .await
            {
                Ok(Ok(bytes)) => return Ok(bytes),
                Ok(Err(e)) if !e.is_retryable() => return Err(e.into()),
                Ok(Err(e)) => PipelineError::Fetch(e),
                Err(timeout) => timeout,
            };

            if attempt >= self.config.fetch_attempts {
                return Err(err);
            }

            tracing::warn!(file_key = key, attempt, error = %err, "Fetch failed, retrying");
            tokio::time::sleep(delay).await;
            delay = next_delay(delay, &self.config.fetch_backoff);
            attempt += 1;
        }
    }

    /// Convert in a private scratch directory that is removed on return.
    async fn convert(
        &self,
        file_key: &str,
        format: &str,
        document: Vec<u8>,
    ) -> Result<Vec<u8>, PipelineError> {
        tokio::fs::create_dir_all(&self.config.scratch_dir)
            .await
            .map_err(ConvertError::Io)?;
        let workdir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.config.scratch_dir)
            .map_err(ConvertError::Io)?;

        let input = workdir
            .path()
            .join(format!("{file_key}.{format}"));
        tokio::fs::write(&input, &document)
            .await
            .map_err(ConvertError::Io)?;

        let started = Instant::now();
        let output = self
            .with_deadline(
                PipelineStep::Convert,
                self.config.convert_timeout,
                self.converter.convert(&input, workdir.path()),
            )
            .await??;

        let pdf = tokio::fs::read(&output).await.map_err(ConvertError::Io)?;
        tracing::info!(
            file_key,
            format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document converted",
        );
        Ok(pdf)
    }

    async fn with_deadline<F: std::future::Future>(
        &self,
        step: PipelineStep,
        after: Duration,
        future: F,
    ) -> Result<F::Output, PipelineError> {
        tokio::time::timeout(after, future)
            .await
            .map_err(|_| PipelineError::Timeout { step, after })
    }

    async fn notify(&self, job: &FileJobMessage, outcome: NotificationOutcome) {
        let file_key = match job.file_id() {
            Ok(id) => id.to_string(),
            Err(_) => job.file_key.clone(),
        };
        if let Err(e) = self.hub.notify(&file_key, &job.file_name, outcome).await {
            tracing::debug!(file_key = %file_key, error = %e, "Notification not delivered");
        }
    }
}
