//! Quote worker: answers quote requests from the request queue.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::quote::{LookupError, QuoteLookup};
use crate::queue::{CommandRequest, CommandResult, Deliveries, QueueError, SharedTransport};

/// Stateless consumer of quote requests.
pub struct QuoteWorker {
    transport: SharedTransport,
    lookup: Arc<dyn QuoteLookup>,
    result_queue: String,
}

impl QuoteWorker {
    /// Create a new worker publishing to `result_queue`.
    pub fn new(
        transport: SharedTransport,
        lookup: Arc<dyn QuoteLookup>,
        result_queue: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            lookup,
            result_queue: result_queue.into(),
        }
    }

    /// Answer one request payload.
    ///
    /// Returns None when the payload is not a valid request. Every lookup
    /// failure becomes a failed result.
    pub async fn handle(&self, payload: &[u8]) -> Option<CommandResult> {
        let request = match CommandRequest::from_bytes(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Dropping invalid quote request");
                return None;
            }
        };

        info!(room_id = %request.room_id, symbol = %request.stock_code, "Processing quote request");

        let outcome = match self.lookup.lookup(&request.stock_code).await {
            Ok(price) if price.is_finite() && price > 0.0 => Ok(price),
            Ok(_) => Err(LookupError::NotFound),
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(price) => {
                debug!(symbol = %request.stock_code, price, "Quote retrieved");
                CommandResult::quote(request.room_id, request.stock_code, price)
            }
            Err(e) => {
                warn!(symbol = %request.stock_code, error = %e, "Quote lookup failed");
                CommandResult::failure(request.room_id, request.stock_code, e.to_string())
            }
        };
        Some(result)
    }

    /// Answer one request and publish the result.
    pub async fn process(&self, payload: &[u8]) {
        let Some(result) = self.handle(payload).await else {
            return;
        };

        let bytes = match result.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(room_id = %result.room_id, error = %e, "Failed to encode quote result");
                return;
            }
        };

        match self.transport.publish(&self.result_queue, bytes).await {
            Ok(()) => debug!(room_id = %result.room_id, symbol = %result.symbol, "Quote result published"),
            Err(e) => {
                warn!(room_id = %result.room_id, queue = %self.result_queue, error = %e, "Dropping quote result")
            }
        }
    }

    /// Process requests until the stream ends.
    pub async fn run(&self, mut deliveries: Deliveries) {
        while let Some(payload) = deliveries.next().await {
            self.process(&payload).await;
        }
    }

    /// Start `consumers` concurrent consumers of `request_queue`.
    pub async fn spawn(
        self: Arc<Self>,
        request_queue: &str,
        consumers: usize,
    ) -> Result<JoinSet<()>, QueueError> {
        let mut tasks = JoinSet::new();
        for index in 0..consumers.max(1) {
            let deliveries = self.transport.consume(request_queue).await?;
            let worker = Arc::clone(&self);
            tasks.spawn(async move {
                info!(consumer = index, "Quote consumer started");
                worker.run(deliveries).await;
                info!(consumer = index, "Quote consumer stopped");
            });
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::queue::{MemoryQueue, QueueTransport};

    const REQUESTS: &str = "stock_requests";
    const RESULTS: &str = "stock_results";

    struct FixedLookup(HashMap<String, std::result::Result<f64, LookupError>>);

    #[async_trait]
    impl QuoteLookup for FixedLookup {
        async fn lookup(&self, symbol: &str) -> std::result::Result<f64, LookupError> {
            self.0
                .get(symbol)
                .cloned()
                .unwrap_or(Err(LookupError::NotFound))
        }
    }

    fn worker() -> (Arc<QuoteWorker>, Arc<MemoryQueue>) {
        let quotes = HashMap::from([
            ("aapl.us".to_string(), Ok(152.5)),
            ("zero".to_string(), Ok(0.0)),
            ("down".to_string(), Err(LookupError::Status(503))),
        ]);
        let queue = Arc::new(MemoryQueue::new());
        let worker = QuoteWorker::new(queue.clone(), Arc::new(FixedLookup(quotes)), RESULTS);
        (Arc::new(worker), queue)
    }

    fn request(room_id: &str, symbol: &str) -> Bytes {
        CommandRequest::new(room_id, symbol).to_bytes().unwrap()
    }

    #[tokio::test]
    async fn test_handle_success() {
        let (worker, _queue) = worker();
        let result = worker.handle(&request("room-1", "aapl.us")).await.unwrap();
        assert_eq!(result, CommandResult::quote("room-1", "aapl.us", 152.5));
    }

    #[tokio::test]
    async fn test_handle_lookup_error() {
        let (worker, _queue) = worker();
        let result = worker.handle(&request("room-1", "down")).await.unwrap();
        assert_eq!(result.outcome(), Err("API returned status code 503"));
        assert_eq!(result.price, 0.0);
    }

    #[tokio::test]
    async fn test_handle_zero_price_is_not_found() {
        let (worker, _queue) = worker();
        let result = worker.handle(&request("room-1", "zero")).await.unwrap();
        assert_eq!(result.outcome(), Err("stock not found or invalid code"));
    }

    #[tokio::test]
    async fn test_handle_invalid_payload() {
        let (worker, _queue) = worker();
        assert!(worker.handle(b"{\"stock_code\":\"aapl.us\"}").await.is_none());
        assert!(worker.handle(b"garbage").await.is_none());
    }

    #[tokio::test]
    async fn test_spawned_consumers_publish_results() {
        let (worker, queue) = worker();
        let mut results = queue.consume(RESULTS).await.unwrap();
        let _tasks = worker.spawn(REQUESTS, 2).await.unwrap();

        queue.publish(REQUESTS, request("room-1", "aapl.us")).await.unwrap();
        queue.publish(REQUESTS, Bytes::from_static(b"not json")).await.unwrap();
        queue.publish(REQUESTS, request("room-2", "down")).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..2 {
            let payload = results.next().await.unwrap();
            received.push(CommandResult::from_bytes(&payload).unwrap());
        }
        received.sort_by(|a, b| a.room_id.cmp(&b.room_id));

        assert_eq!(received[0], CommandResult::quote("room-1", "aapl.us", 152.5));
        assert_eq!(
            received[1],
            CommandResult::failure("room-2", "down", "API returned status code 503")
        );
    }
}
