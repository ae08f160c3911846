//! RabbitMQ-backed publisher and consumer.

use std::sync::Arc;

use async_trait::async_trait;
use cuedeck_core::message::{FileJobMessage, CONTENT_TYPE};
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    ConfirmSelectOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};

use crate::delivery::{DeliveryAcker, DeliverySource, DeliveryStream, JobDelivery, JobPublisher};
use crate::error::QueueError;
use crate::topology;

/// A single broker connection shared by the publisher and every worker.
///
/// Each publish and each worker gets its own channel; only the TCP
/// connection is shared.
#[derive(Clone)]
pub struct AmqpBroker {
    connection: Arc<Connection>,
}

impl AmqpBroker {
    /// Connect and declare the topology once so jobs published before any
    /// worker starts are not dropped by the exchange.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;

        let channel = connection.create_channel().await?;
        topology::declare(&channel).await?;
        channel.close(200, "topology declared").await?;

        tracing::info!(
            exchange = topology::EXCHANGE_NAME,
            queue = topology::QUEUE_NAME,
            "Connected to message broker",
        );

        Ok(Self {
            connection: Arc::new(connection),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    pub async fn close(&self) -> Result<(), QueueError> {
        self.connection.close(200, "shutting down").await?;
        Ok(())
    }
}

#[async_trait]
impl JobPublisher for AmqpBroker {
    async fn publish(&self, job: &FileJobMessage) -> Result<(), QueueError> {
        let payload = job.to_payload()?;

        let channel = self.connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        let confirmation = channel
            .basic_publish(
                topology::EXCHANGE_NAME,
                topology::ROUTING_KEY,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type(CONTENT_TYPE.into())
                    .with_delivery_mode(topology::PERSISTENT),
            )
            .await?
            .await?;

        if let Err(e) = channel.close(200, "published").await {
            tracing::debug!(error = %e, "Failed to close publish channel");
        }

        if confirmation.is_nack() {
            return Err(QueueError::Nacked);
        }

        tracing::debug!(file_key = %job.file_key, "Job published");
        Ok(())
    }
}

#[async_trait]
impl DeliverySource for AmqpBroker {
    async fn open(&self, worker_id: usize) -> Result<DeliveryStream, QueueError> {
        let channel = self.connection.create_channel().await?;
        topology::declare(&channel).await?;
        topology::limit_prefetch(&channel).await?;

        let consumer = channel
            .basic_consume(
                topology::QUEUE_NAME,
                &format!("worker-{worker_id}"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::debug!(worker_id, "Consumer channel opened");

        // The closure owns the channel so it lives as long as the stream.
        let stream = consumer.map(move |item| {
            let _channel = &channel;
            item.map(|delivery| {
                JobDelivery::new(
                    delivery.data,
                    delivery.redelivered,
                    Box::new(AmqpAcker(delivery.acker)),
                )
            })
            .map_err(QueueError::from)
        });

        Ok(Box::pin(stream))
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl DeliveryAcker for AmqpAcker {
    async fn ack(&self) -> Result<(), QueueError> {
        self.0.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn reject(&self) -> Result<(), QueueError> {
        self.0
            .nack(BasicNackOptions {
                requeue: false,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}
