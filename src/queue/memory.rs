//! In-process queue transport.
//!
//! Each named queue is an unbounded FIFO shared by every consumer of that
//! name, so consumers compete for messages the same way broker consumers
//! sharing a durable subscription do. Messages published before anyone
//! consumes are retained.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use super::{Deliveries, QueueError, QueueTransport};

struct NamedQueue {
    sender: mpsc::UnboundedSender<Bytes>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<Bytes>>>,
}

impl NamedQueue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
        }
    }
}

/// Queue transport backed by in-memory channels.
#[derive(Default)]
pub struct MemoryQueue {
    queues: Mutex<HashMap<String, NamedQueue>>,
}

impl MemoryQueue {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<T>(&self, name: &str, f: impl FnOnce(&NamedQueue) -> T) -> T {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let queue = queues
            .entry(name.to_string())
            .or_insert_with(NamedQueue::new);
        f(queue)
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn publish(&self, queue: &str, payload: Bytes) -> Result<(), QueueError> {
        self.with_queue(queue, |q| q.sender.send(payload))
            .map_err(|_| QueueError::Publish {
                queue: queue.to_string(),
                reason: "queue closed".to_string(),
            })
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries, QueueError> {
        let receiver = self.with_queue(queue, |q| Arc::clone(&q.receiver));

        let deliveries = futures::stream::unfold(receiver, |receiver| async move {
            let next = receiver.lock().await.recv().await;
            next.map(|payload| (payload, receiver))
        });

        Ok(deliveries.boxed())
    }
}
