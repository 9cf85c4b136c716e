//! Result router: turns quote results into bot messages in their room.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::event::ChatEvent;
use super::history::MessageStore;
use super::hub::RoomHub;
use crate::queue::{CommandResult, Deliveries};

/// Render a quote result as the text users see.
///
/// The symbol is uppercased for quotes and kept as requested for errors.
pub fn render(result: &CommandResult) -> String {
    match result.outcome() {
        Ok(price) => format!(
            "{} quote is ${:.2} per share",
            result.symbol.to_uppercase(),
            price
        ),
        Err(error) => format!("Error getting quote for {}: {}", result.symbol, error),
    }
}

/// Delivers quote results to the rooms they are addressed to.
pub struct ResultRouter {
    hub: Arc<RoomHub>,
    store: Arc<dyn MessageStore>,
}

impl ResultRouter {
    /// Create a new router.
    pub fn new(hub: Arc<RoomHub>, store: Arc<dyn MessageStore>) -> Self {
        Self { hub, store }
    }

    /// Persist and broadcast one result.
    ///
    /// A result whose room has no connections is still saved and the
    /// broadcast is a no-op.
    pub async fn route(&self, result: &CommandResult) {
        let mut event = ChatEvent::bot(&result.room_id, render(result));

        match self.store.save_message(&event).await {
            Ok(id) => event.id = Some(id),
            Err(e) => {
                warn!(room_id = %result.room_id, symbol = %result.symbol, error = %e, "Failed to save bot message, dropping");
                return;
            }
        }

        let delivered = self.hub.broadcast(&result.room_id, &event).await;
        debug!(room_id = %result.room_id, symbol = %result.symbol, delivered, "Routed quote result");
    }

    /// Route results from a queue until the stream ends.
    ///
    /// Results are handled one at a time in delivery order. Payloads that
    /// fail validation are logged and dropped.
    pub async fn run(&self, mut deliveries: Deliveries) {
        info!("Result router started");
        while let Some(payload) = deliveries.next().await {
            match CommandResult::from_bytes(&payload) {
                Ok(result) => self.route(&result).await,
                Err(e) => warn!(error = %e, "Dropping invalid result payload"),
            }
        }
        info!("Result router stopped");
    }
}
