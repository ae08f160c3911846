//! Fixed-size worker pool with supervised restarts.
//!
//! Each worker owns one consumer channel (prefetch 1) and processes one
//! delivery at a time. When a worker stops for any reason other than
//! shutdown (channel error, stream end, panic) the supervisor starts a
//! replacement with the same id after a backoff delay. The delay doubles on
//! consecutive failures and resets once the worker has handled a delivery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cuedeck_pipeline::backoff::{next_delay, BackoffConfig};
use cuedeck_pipeline::PipelineExecutor;
use cuedeck_queue::{DeliverySource, QueueError};
use futures::StreamExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Delivery stream ended")]
    StreamEnded,
}

/// How a worker task ended.
struct WorkerExit {
    handled: u64,
    result: Result<(), WorkerError>,
}

pub struct WorkerPool {
    source: Arc<dyn DeliverySource>,
    executor: Arc<PipelineExecutor>,
    size: usize,
    restart_backoff: BackoffConfig,
}

impl WorkerPool {
    pub fn new(
        source: Arc<dyn DeliverySource>,
        executor: Arc<PipelineExecutor>,
        size: usize,
    ) -> Result<Self, WorkerError> {
        if size == 0 {
            return Err(WorkerError::NoWorkers);
        }
        Ok(Self {
            source,
            executor,
            size,
            restart_backoff: BackoffConfig::default(),
        })
    }

    pub fn with_restart_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.restart_backoff = backoff;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Start workers `1..=size` and supervise them until `cancel` fires.
    ///
    /// Returns once every worker has finished its in-flight delivery.
    pub async fn run(self, cancel: CancellationToken) {
        let mut workers = JoinSet::new();
        let mut task_ids = HashMap::new();
        let mut delays: HashMap<usize, Duration> = HashMap::new();

        for worker_id in 1..=self.size {
            let handle = workers.spawn(run_worker(
                worker_id,
                Arc::clone(&self.source),
                Arc::clone(&self.executor),
                cancel.clone(),
                Duration::ZERO,
            ));
            task_ids.insert(handle.id(), worker_id);
        }
        tracing::info!(workers = self.size, "Worker pool started");

        loop {
            let joined = tokio::select! {
                _ = cancel.cancelled() => break,
                joined = workers.join_next_with_id() => joined,
            };
            let Some(joined) = joined else { break };

            let (task_id, exit) = match joined {
                Ok((id, exit)) => (id, Some(exit)),
                Err(e) => (e.id(), None),
            };
            let Some(worker_id) = task_ids.remove(&task_id) else {
                continue;
            };

            let handled = match exit {
                Some(WorkerExit {
                    result: Ok(()), ..
                }) => continue,
                Some(WorkerExit {
                    result: Err(e),
                    handled,
                }) => {
                    tracing::warn!(worker_id, handled, error = %e, "Worker stopped");
                    handled
                }
                None => {
                    tracing::error!(worker_id, "Worker panicked");
                    0
                }
            };

            if cancel.is_cancelled() {
                break;
            }

            let delay = if handled > 0 {
                self.restart_backoff.initial_delay
            } else {
                delays
                    .get(&worker_id)
                    .map(|d| next_delay(*d, &self.restart_backoff))
                    .unwrap_or(self.restart_backoff.initial_delay)
            };
            delays.insert(worker_id, delay);

            tracing::info!(
                worker_id,
                delay_ms = delay.as_millis() as u64,
                "Restarting worker",
            );
            let handle = workers.spawn(run_worker(
                worker_id,
                Arc::clone(&self.source),
                Arc::clone(&self.executor),
                cancel.clone(),
                delay,
            ));
            task_ids.insert(handle.id(), worker_id);
        }

        tracing::info!("Worker pool stopping, waiting for in-flight jobs");
        while workers.join_next().await.is_some() {}
        tracing::info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    source: Arc<dyn DeliverySource>,
    executor: Arc<PipelineExecutor>,
    cancel: CancellationToken,
    start_delay: Duration,
) -> WorkerExit {
    let mut handled = 0;

    if !start_delay.is_zero() {
        tokio::select! {
            _ = cancel.cancelled() => {
                return WorkerExit { handled, result: Ok(()) };
            }
            _ = tokio::time::sleep(start_delay) => {}
        }
    }

    let result = consume(worker_id, source.as_ref(), &executor, &cancel, &mut handled).await;
    WorkerExit { handled, result }
}

/// Pull deliveries one at a time until cancelled or the channel fails.
///
/// Cancellation is only observed between deliveries, so a job in progress
/// runs to completion.
async fn consume(
    worker_id: usize,
    source: &dyn DeliverySource,
    executor: &PipelineExecutor,
    cancel: &CancellationToken,
    handled: &mut u64,
) -> Result<(), WorkerError> {
    let mut deliveries = source.open(worker_id).await?;
    tracing::info!(worker_id, "Worker consuming");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = deliveries.next() => next,
        };

        let delivery = match next {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(WorkerError::StreamEnded),
        };

        executor.handle(worker_id, delivery).await?;
        *handled += 1;
    }
}
