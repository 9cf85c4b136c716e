//! NATS JetStream queue transport.
//!
//! Every named queue is a file-backed stream with work-queue retention and
//! a single shared durable pull consumer. Any number of processes bound to
//! that consumer partition the messages between them. Messages are
//! acknowledged as soon as they are received.
//!
//! The consumer allows a single unacknowledged message. A client therefore
//! never holds a prefetched backlog whose ack deadline can pass while it is
//! busy with an earlier request, which would have the broker redeliver those
//! requests to another consumer.

use std::future::IntoFuture;
use std::time::Duration;

use async_nats::jetstream::{
    self,
    consumer::pull,
    stream::{Config as StreamConfig, RetentionPolicy, StorageType},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::{Deliveries, QueueError, QueueTransport};
use crate::config::QueueConfig;

/// Queue transport backed by NATS JetStream.
pub struct NatsQueue {
    context: jetstream::Context,
    consumer_name: String,
    publish_timeout: Duration,
}

impl NatsQueue {
    /// Connect to the broker described by the configuration.
    pub async fn connect(config: &QueueConfig) -> Result<Self, QueueError> {
        let options = if config.user.is_empty() {
            async_nats::ConnectOptions::new()
        } else {
            async_nats::ConnectOptions::with_user_and_password(
                config.user.clone(),
                config.password.clone(),
            )
        };

        info!(url = %config.url, user = %config.user, "Connecting to queue broker");

        let client = options
            .connect(config.url.as_str())
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        Ok(Self {
            context: jetstream::new(client),
            consumer_name: config.consumer_group.clone(),
            publish_timeout: Duration::from_secs(config.publish_timeout_secs),
        })
    }

    /// Create the streams backing the given queues if they do not exist.
    pub async fn declare(&self, queues: &[&str]) -> Result<(), QueueError> {
        for queue in queues {
            self.context
                .get_or_create_stream(stream_config(queue))
                .await
                .map_err(|e| QueueError::Connect(format!("declare {queue}: {e}")))?;
            debug!(queue = %queue, "Queue declared");
        }
        Ok(())
    }
}

/// Stream name for a queue. Stream names may not contain dots.
fn stream_name(queue: &str) -> String {
    queue.replace('.', "_").to_uppercase()
}

fn stream_config(queue: &str) -> StreamConfig {
    StreamConfig {
        name: stream_name(queue),
        subjects: vec![queue.to_string()],
        retention: RetentionPolicy::WorkQueue,
        storage: StorageType::File,
        ..Default::default()
    }
}

/// Pending acknowledgements allowed across all bound clients.
const MAX_ACK_PENDING: i64 = 1;

/// Time the broker waits for an acknowledgement before redelivering.
const ACK_WAIT: Duration = Duration::from_secs(60);

fn consumer_config(name: &str) -> pull::Config {
    pull::Config {
        durable_name: Some(name.to_string()),
        max_ack_pending: MAX_ACK_PENDING,
        ack_wait: ACK_WAIT,
        ..Default::default()
    }
}

#[async_trait]
impl QueueTransport for NatsQueue {
    async fn publish(&self, queue: &str, payload: Bytes) -> Result<(), QueueError> {
        let publish_error = |reason: String| QueueError::Publish {
            queue: queue.to_string(),
            reason,
        };

        let ack = self
            .context
            .publish(queue.to_string(), payload)
            .await
            .map_err(|e| publish_error(e.to_string()))?;

        tokio::time::timeout(self.publish_timeout, ack.into_future())
            .await
            .map_err(|_| QueueError::Timeout(queue.to_string()))?
            .map_err(|e| publish_error(e.to_string()))?;

        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries, QueueError> {
        let subscribe_error = |reason: String| QueueError::Subscribe {
            queue: queue.to_string(),
            reason,
        };

        let stream = self
            .context
            .get_or_create_stream(stream_config(queue))
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        let consumer: jetstream::consumer::PullConsumer = stream
            .get_or_create_consumer(
                &self.consumer_name,
                consumer_config(&self.consumer_name),
            )
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        info!(queue = %queue, consumer = %self.consumer_name, "Consuming queue");

        let queue = queue.to_string();
        let deliveries = messages.filter_map(move |item| {
            let queue = queue.clone();
            async move {
                match item {
                    Ok(message) => {
                        if let Err(e) = message.ack().await {
                            warn!(queue = %queue, error = %e, "Failed to acknowledge message");
                        }
                        Some(message.message.payload.clone())
                    }
                    Err(e) => {
                        warn!(queue = %queue, error = %e, "Failed to receive message");
                        None
                    }
                }
            }
        });

        Ok(deliveries.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name() {
        assert_eq!(stream_name("stock_requests"), "STOCK_REQUESTS");
        assert_eq!(stream_name("chat.results"), "CHAT_RESULTS");
    }

    #[test]
    fn test_stream_config_is_work_queue() {
        let config = stream_config("stock_results");
        assert_eq!(config.name, "STOCK_RESULTS");
        assert_eq!(config.subjects, vec!["stock_results".to_string()]);
        assert_eq!(config.retention, RetentionPolicy::WorkQueue);
        assert_eq!(config.storage, StorageType::File);
    }

    #[test]
    fn test_consumer_config_holds_one_message_at_a_time() {
        let config = consumer_config("stock_bots");
        assert_eq!(config.durable_name.as_deref(), Some("stock_bots"));
        assert_eq!(config.max_ack_pending, 1);
        assert_eq!(config.ack_wait, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_connect_unreachable_broker_fails() {
        let config = QueueConfig {
            url: "nats://127.0.0.1:1".to_string(),
            ..QueueConfig::default()
        };
        let result = NatsQueue::connect(&config).await;
        assert!(matches!(result, Err(QueueError::Connect(_))));
    }
}
