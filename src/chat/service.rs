//! Chat service: the entry point the transport layer drives.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::command::{classify, ChatInput};
use super::event::{ChatEvent, Identity};
use super::history::MessageStore;
use super::hub::{Connection, ConnectionId, RoomHub};
use crate::config::HubConfig;
use crate::queue::{CommandRequest, SharedTransport};
use crate::Result;

/// A connection that has joined a room.
pub struct Session {
    /// Connection ID used to leave.
    pub id: ConnectionId,
    /// Outbound events for the client: history replay, then live events.
    pub events: mpsc::Receiver<ChatEvent>,
}

/// Ties the classifier, hub, message store and request queue together.
pub struct ChatService {
    hub: Arc<RoomHub>,
    store: Arc<dyn MessageStore>,
    transport: SharedTransport,
    request_queue: String,
    outbound_buffer: usize,
    history_limit: usize,
}

impl ChatService {
    /// Create a new chat service.
    pub fn new(
        hub: Arc<RoomHub>,
        store: Arc<dyn MessageStore>,
        transport: SharedTransport,
        request_queue: impl Into<String>,
        config: &HubConfig,
    ) -> Self {
        Self {
            hub,
            store,
            transport,
            request_queue: request_queue.into(),
            outbound_buffer: config.outbound_buffer,
            history_limit: config.history_limit,
        }
    }

    /// Get the room hub.
    pub fn hub(&self) -> &Arc<RoomHub> {
        &self.hub
    }

    /// Get the message store.
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Recent messages of a room, oldest first.
    pub async fn recent(&self, room_id: &str) -> Result<Vec<ChatEvent>> {
        self.store.load_recent(room_id, self.history_limit).await
    }

    /// Join a room.
    ///
    /// The recent history is queued on the new connection before it is
    /// registered, so replay always precedes live delivery.
    pub async fn connect(&self, room_id: &str, identity: Identity) -> Result<Session> {
        let history = self.recent(room_id).await?;
        let capacity = history.len() + self.outbound_buffer;
        let (connection, events) = Connection::new(identity, capacity);

        for event in history {
            connection.try_deliver(event);
        }

        let id = connection.id();
        self.hub.join(room_id, connection).await;
        Ok(Session { id, events })
    }

    /// Leave a room.
    pub async fn disconnect(&self, room_id: &str, id: ConnectionId) {
        self.hub.leave(room_id, id).await;
    }

    /// Handle one line of text typed by a client.
    ///
    /// Quote commands are published to the request queue and never shown
    /// as chat. Other text is saved, then broadcast. Failures are logged.
    pub async fn submit_client_text(&self, room_id: &str, identity: &Identity, text: &str) {
        match classify(text) {
            ChatInput::Command(symbol) => self.request_quote(room_id, &symbol).await,
            ChatInput::Message(content) => {
                if content.trim().is_empty() {
                    return;
                }
                self.post_message(room_id, identity, content).await;
            }
        }
    }

    async fn request_quote(&self, room_id: &str, symbol: &str) {
        let payload = match CommandRequest::new(room_id, symbol).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(room_id = %room_id, symbol = %symbol, error = %e, "Failed to encode quote request");
                return;
            }
        };

        match self.transport.publish(&self.request_queue, payload).await {
            Ok(()) => debug!(room_id = %room_id, symbol = %symbol, "Quote requested"),
            Err(e) => {
                warn!(room_id = %room_id, symbol = %symbol, queue = %self.request_queue, error = %e, "Dropping quote request")
            }
        }
    }

    async fn post_message(&self, room_id: &str, identity: &Identity, content: String) {
        let mut event = ChatEvent::user_message(identity, room_id, content);
        match self.store.save_message(&event).await {
            Ok(id) => event.id = Some(id),
            Err(e) => {
                warn!(room_id = %room_id, username = %identity.username, error = %e, "Failed to save message, dropping");
                return;
            }
        }
        self.hub.broadcast(room_id, &event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;

    use crate::chat::event::EventKind;
    use crate::chat::history::MemoryMessageStore;
    use crate::queue::{MemoryQueue, QueueTransport};

    const REQUESTS: &str = "stock_requests";

    fn drain(receiver: &mut mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn service() -> (ChatService, Arc<MemoryQueue>) {
        let queue = Arc::new(MemoryQueue::new());
        let service = ChatService::new(
            Arc::new(RoomHub::new(Duration::from_millis(50))),
            Arc::new(MemoryMessageStore::new()),
            queue.clone(),
            REQUESTS,
            &HubConfig::default(),
        );
        (service, queue)
    }

    #[tokio::test]
    async fn test_message_saved_and_broadcast() {
        let (service, _queue) = service();
        let alice = Identity::new(1, "alice");
        let mut session = service.connect("room-1", alice.clone()).await.unwrap();
        drain(&mut session.events);

        service
            .submit_client_text("room-1", &alice, "Hello, world!")
            .await;

        let events = drain(&mut session.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::UserMessage);
        assert_eq!(events[0].content, "Hello, world!");
        assert!(events[0].id.is_some());
        assert_eq!(service.recent("room-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_command_published_not_broadcast() {
        let (service, queue) = service();
        let alice = Identity::new(1, "alice");
        let mut session = service.connect("room-1", alice.clone()).await.unwrap();
        drain(&mut session.events);

        service
            .submit_client_text("room-1", &alice, "/stock=aapl.us")
            .await;

        assert!(drain(&mut session.events).is_empty());
        assert!(service.recent("room-1").await.unwrap().is_empty());

        let mut requests = queue.consume(REQUESTS).await.unwrap();
        let payload = requests.next().await.unwrap();
        let request = CommandRequest::from_bytes(&payload).unwrap();
        assert_eq!(request, CommandRequest::new("room-1", "aapl.us"));
    }

    #[tokio::test]
    async fn test_near_miss_command_is_chat() {
        let (service, _queue) = service();
        let alice = Identity::new(1, "alice");
        let mut session = service.connect("room-1", alice.clone()).await.unwrap();
        drain(&mut session.events);

        service
            .submit_client_text("room-1", &alice, "/stock= aapl")
            .await;

        let events = drain(&mut session.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content, "/stock= aapl");
    }

    #[tokio::test]
    async fn test_blank_message_ignored() {
        let (service, _queue) = service();
        let alice = Identity::new(1, "alice");
        let mut session = service.connect("room-1", alice.clone()).await.unwrap();
        drain(&mut session.events);

        service.submit_client_text("room-1", &alice, "   ").await;
        assert!(drain(&mut session.events).is_empty());
    }

    #[tokio::test]
    async fn test_history_replayed_before_live_events() {
        let (service, _queue) = service();
        let alice = Identity::new(1, "alice");
        let bob = Identity::new(2, "bob");

        let _alice_session = service.connect("room-1", alice.clone()).await.unwrap();
        service.submit_client_text("room-1", &alice, "first").await;
        service.submit_client_text("room-1", &alice, "second").await;

        let mut bob_session = service.connect("room-1", bob).await.unwrap();
        let contents: Vec<String> = drain(&mut bob_session.events)
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "bob joined the chat"]);
    }

    #[tokio::test]
    async fn test_disconnect_announces_leave() {
        let (service, _queue) = service();
        let alice = Identity::new(1, "alice");
        let bob = Identity::new(2, "bob");
        let mut alice_session = service.connect("room-1", alice).await.unwrap();
        let bob_session = service.connect("room-1", bob).await.unwrap();
        drain(&mut alice_session.events);

        service.disconnect("room-1", bob_session.id).await;
        service.disconnect("room-1", bob_session.id).await;

        let events = drain(&mut alice_session.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content, "bob left the chat");
    }
}
