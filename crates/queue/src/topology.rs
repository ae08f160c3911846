//! Broker topology: one durable fan-out exchange feeding one durable queue.

use lapin::options::{
    BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};

/// Exchange every job is published to.
pub const EXCHANGE_NAME: &str = "main";

/// Queue the workers consume from.
pub const QUEUE_NAME: &str = "file-processing";

/// Fan-out exchanges ignore the routing key.
pub const ROUTING_KEY: &str = "";

/// Unacknowledged deliveries allowed per consumer channel.
pub const PREFETCH_COUNT: u16 = 1;

/// AMQP persistent delivery mode.
pub const PERSISTENT: u8 = 2;

/// Declare the exchange, the queue and the binding between them.
///
/// Declarations are idempotent, so publishers and every consumer channel
/// call this on open.
pub async fn declare(channel: &Channel) -> Result<(), lapin::Error> {
    channel
        .exchange_declare(
            EXCHANGE_NAME,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_declare(
            QUEUE_NAME,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            QUEUE_NAME,
            EXCHANGE_NAME,
            ROUTING_KEY,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
}

/// Limit the channel to one in-flight delivery.
pub async fn limit_prefetch(channel: &Channel) -> Result<(), lapin::Error> {
    channel
        .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
        .await
}
