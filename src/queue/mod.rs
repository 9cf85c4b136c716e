//! Queue transport between the chat server and the quote bots.
//!
//! Two named queues decouple the processes: quote requests flow from the
//! chat server to the bots, results flow back. Delivery is at-most-once:
//! consumers acknowledge a message as soon as they receive it.

mod memory;
mod nats;
mod payload;

pub use memory::MemoryQueue;
pub use nats::NatsQueue;
pub use payload::{CommandRequest, CommandResult, PayloadError};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::{QueueBackend, QueueConfig};

/// Stream of message payloads received from a queue.
pub type Deliveries = BoxStream<'static, Bytes>;

/// Shared handle to a queue transport.
pub type SharedTransport = Arc<dyn QueueTransport>;

/// Queue transport errors.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Could not reach or set up the broker.
    #[error("failed to connect to queue broker: {0}")]
    Connect(String),

    /// Publishing a message failed.
    #[error("failed to publish to {queue}: {reason}")]
    Publish {
        /// Target queue.
        queue: String,
        /// Failure reason.
        reason: String,
    },

    /// Subscribing to a queue failed.
    #[error("failed to consume from {queue}: {reason}")]
    Subscribe {
        /// Source queue.
        queue: String,
        /// Failure reason.
        reason: String,
    },

    /// The broker did not acknowledge in time.
    #[error("timed out publishing to {0}")]
    Timeout(String),
}

/// A durable, named-queue publish/consume transport.
///
/// Each message published to a queue is delivered to exactly one of the
/// consumers of that queue.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Publish a payload to a named queue.
    async fn publish(&self, queue: &str, payload: Bytes) -> Result<(), QueueError>;

    /// Start consuming a named queue.
    async fn consume(&self, queue: &str) -> Result<Deliveries, QueueError>;
}

/// Connect the transport selected by the configuration.
pub async fn connect(config: &QueueConfig) -> Result<SharedTransport, QueueError> {
    match config.backend {
        QueueBackend::Nats => {
            let queue = NatsQueue::connect(config).await?;
            queue
                .declare(&[config.request_queue.as_str(), config.result_queue.as_str()])
                .await?;
            Ok(Arc::new(queue))
        }
        QueueBackend::Memory => Ok(Arc::new(MemoryQueue::new())),
    }
}
