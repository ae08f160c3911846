//! Broker-neutral seams between the queue and the pipeline.

use std::pin::Pin;

use async_trait::async_trait;
use cuedeck_core::message::FileJobMessage;
use futures::Stream;

use crate::error::QueueError;

/// Publishes jobs onto the work queue.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Publish one job. Returns once the broker has accepted the message.
    async fn publish(&self, job: &FileJobMessage) -> Result<(), QueueError>;
}

/// Settles a single delivery with the broker.
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    async fn ack(&self) -> Result<(), QueueError>;

    /// Negative acknowledgement without requeue.
    async fn reject(&self) -> Result<(), QueueError>;
}

/// One message handed to a worker, with the means to settle it.
pub struct JobDelivery {
    pub payload: Vec<u8>,
    pub redelivered: bool,
    acker: Box<dyn DeliveryAcker>,
}

impl JobDelivery {
    pub fn new(payload: Vec<u8>, redelivered: bool, acker: Box<dyn DeliveryAcker>) -> Self {
        Self {
            payload,
            redelivered,
            acker,
        }
    }

    pub async fn ack(&self) -> Result<(), QueueError> {
        self.acker.ack().await
    }

    pub async fn reject(&self) -> Result<(), QueueError> {
        self.acker.reject().await
    }
}

impl std::fmt::Debug for JobDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDelivery")
            .field("payload_len", &self.payload.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// Stream of deliveries for one worker. An `Err` item or the end of the
/// stream means the underlying channel is gone.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<JobDelivery, QueueError>> + Send>>;

/// Opens a dedicated consumer for a worker.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Open a fresh channel for `worker_id` with prefetch 1 and start
    /// consuming from the work queue.
    async fn open(&self, worker_id: usize) -> Result<DeliveryStream, QueueError>;
}
