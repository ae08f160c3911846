//! In-process queue with the same delivery contract as the broker.
//!
//! All workers share one receiver, so each job goes to exactly one
//! consumer. Every ack and reject is recorded for inspection.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cuedeck_core::message::FileJobMessage;
use tokio::sync::{mpsc, Notify};

use crate::delivery::{DeliveryAcker, DeliverySource, DeliveryStream, JobDelivery, JobPublisher};
use crate::error::QueueError;

/// How a delivery was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Acked(Vec<u8>),
    Rejected(Vec<u8>),
}

impl Settlement {
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Acked(_))
    }
}

enum Item {
    Payload(Vec<u8>),
    ChannelError(String),
}

struct Inner {
    sender: Mutex<Option<mpsc::UnboundedSender<Item>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Item>>,
    settlements: Mutex<Vec<Settlement>>,
    opened: Mutex<Vec<usize>>,
    settled: Notify,
}

#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(tx)),
                receiver: tokio::sync::Mutex::new(rx),
                settlements: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
                settled: Notify::new(),
            }),
        }
    }

    /// Enqueue a raw payload, bypassing JSON encoding.
    pub fn push_raw(&self, payload: impl Into<Vec<u8>>) -> Result<(), QueueError> {
        self.send(Item::Payload(payload.into()))
    }

    /// Make the next consumer to pull see its channel fail.
    pub fn inject_channel_error(&self, reason: impl Into<String>) -> Result<(), QueueError> {
        self.send(Item::ChannelError(reason.into()))
    }

    /// Stop accepting jobs. Open streams end once the backlog is drained.
    pub fn close(&self) {
        lock(&self.inner.sender).take();
    }

    /// Settlements recorded so far, in order.
    pub fn settlements(&self) -> Vec<Settlement> {
        lock(&self.inner.settlements).clone()
    }

    /// Worker ids that opened a consumer, in order. A restarted worker
    /// appears once per open.
    pub fn opened_by(&self) -> Vec<usize> {
        lock(&self.inner.opened).clone()
    }

    /// Wait until at least `count` deliveries have been settled.
    pub async fn wait_for_settlements(&self, count: usize) -> Vec<Settlement> {
        loop {
            let notified = self.inner.settled.notified();
            let settlements = self.settlements();
            if settlements.len() >= count {
                return settlements;
            }
            notified.await;
        }
    }

    fn send(&self, item: Item) -> Result<(), QueueError> {
        lock(&self.inner.sender)
            .as_ref()
            .and_then(|tx| tx.send(item).ok())
            .ok_or_else(|| QueueError::ChannelClosed("memory queue is closed".into()))
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl JobPublisher for MemoryQueue {
    async fn publish(&self, job: &FileJobMessage) -> Result<(), QueueError> {
        self.push_raw(job.to_payload()?)
    }
}

#[async_trait]
impl DeliverySource for MemoryQueue {
    async fn open(&self, worker_id: usize) -> Result<DeliveryStream, QueueError> {
        lock(&self.inner.opened).push(worker_id);

        let stream = futures::stream::unfold(Arc::clone(&self.inner), |inner| async move {
            let item = inner.receiver.lock().await.recv().await?;
            let next = match item {
                Item::Payload(payload) => {
                    let acker = MemoryAcker {
                        inner: Arc::clone(&inner),
                        payload: payload.clone(),
                    };
                    Ok(JobDelivery::new(payload, false, Box::new(acker)))
                }
                Item::ChannelError(reason) => Err(QueueError::ChannelClosed(reason)),
            };
            Some((next, inner))
        });

        Ok(Box::pin(stream))
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    payload: Vec<u8>,
}

impl MemoryAcker {
    fn record(&self, settlement: Settlement) {
        lock(&self.inner.settlements).push(settlement);
        self.inner.settled.notify_waiters();
    }
}

#[async_trait]
impl DeliveryAcker for MemoryAcker {
    async fn ack(&self) -> Result<(), QueueError> {
        self.record(Settlement::Acked(self.payload.clone()));
        Ok(())
    }

    async fn reject(&self) -> Result<(), QueueError> {
        self.record(Settlement::Rejected(self.payload.clone()));
        Ok(())
    }
}
