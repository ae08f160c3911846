/// Errors raised by queue publishers and consumers.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("Failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Broker refused the published job")]
    Nacked,

    /// The consumer stream ended or reported a fault. The worker owning it
    /// must reopen its channel.
    #[error("Delivery channel closed: {0}")]
    ChannelClosed(String),
}
