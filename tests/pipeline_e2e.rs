//! Command pipeline end-to-end tests.
//!
//! Chat service, quote workers and result router wired over the in-memory
//! queue, with a stub lookup in place of the quote API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stockchat::bot::{LookupError, QuoteLookup, QuoteWorker};
use stockchat::chat::{
    ChatEvent, ChatService, EventKind, Identity, MemoryMessageStore, MessageStore, ResultRouter,
    RoomHub, Session, BOT_NAME,
};
use stockchat::config::HubConfig;
use stockchat::queue::{MemoryQueue, QueueTransport, SharedTransport};
use tokio::task::JoinSet;
use tokio::time::timeout;

const REQUESTS: &str = "stock_requests";
const RESULTS: &str = "stock_results";
const ROOM: &str = "room-1";

/// Quote lookup answering from a fixed table.
struct StubLookup(HashMap<&'static str, f64>);

#[async_trait]
impl QuoteLookup for StubLookup {
    async fn lookup(&self, symbol: &str) -> Result<f64, LookupError> {
        self.0.get(symbol).copied().ok_or(LookupError::NotFound)
    }
}

struct Pipeline {
    chat: ChatService,
    store: Arc<dyn MessageStore>,
    _consumers: JoinSet<()>,
}

async fn start_pipeline() -> Pipeline {
    let transport: SharedTransport = Arc::new(MemoryQueue::new());
    let hub_config = HubConfig::default();
    let hub = Arc::new(RoomHub::from_config(&hub_config));
    let store: Arc<dyn MessageStore> = Arc::new(MemoryMessageStore::new());

    let lookup = Arc::new(StubLookup(HashMap::from([("AAPL.US", 93.42), ("msft.us", 310.0)])));
    let worker = Arc::new(QuoteWorker::new(transport.clone(), lookup, RESULTS));
    let consumers = worker.spawn(REQUESTS, 2).await.unwrap();

    let results = transport.consume(RESULTS).await.unwrap();
    let router = ResultRouter::new(hub.clone(), store.clone());
    tokio::spawn(async move { router.run(results).await });

    let chat = ChatService::new(hub, store.clone(), transport, REQUESTS, &hub_config);
    Pipeline {
        chat,
        store,
        _consumers: consumers,
    }
}

async fn next_event(session: &mut Session) -> ChatEvent {
    timeout(Duration::from_secs(2), session.events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("connection closed")
}

/// Next event that is not a join/leave notice.
async fn next_non_system(session: &mut Session) -> ChatEvent {
    loop {
        let event = next_event(session).await;
        if event.kind != EventKind::SystemNotice {
            return event;
        }
    }
}

async fn assert_quiet(session: &mut Session) {
    let result = timeout(Duration::from_millis(200), async {
        loop {
            match session.events.recv().await {
                Some(event) if event.kind == EventKind::SystemNotice => continue,
                other => return other,
            }
        }
    })
    .await;
    assert!(result.is_err(), "unexpected event: {:?}", result);
}

#[tokio::test]
async fn test_stock_command_answered_once_to_every_member() {
    let pipeline = start_pipeline().await;
    let alice = Identity::new(1, "alice");
    let bob = Identity::new(2, "bob");

    let mut a = pipeline.chat.connect(ROOM, alice.clone()).await.unwrap();
    let mut b = pipeline.chat.connect(ROOM, bob.clone()).await.unwrap();

    pipeline
        .chat
        .submit_client_text(ROOM, &alice, "/stock=AAPL.US")
        .await;

    for session in [&mut a, &mut b] {
        let event = next_non_system(session).await;
        assert_eq!(event.kind, EventKind::BotResult);
        assert_eq!(event.username, BOT_NAME);
        assert_eq!(event.content, "AAPL.US quote is $93.42 per share");
        assert!(event.id.is_some());
        assert_quiet(session).await;
    }

    // The command text itself is never stored or shown.
    let stored = pipeline.store.load_recent(ROOM, 50).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, EventKind::BotResult);
}

#[tokio::test]
async fn test_symbol_uppercased_in_quote() {
    let pipeline = start_pipeline().await;
    let alice = Identity::new(1, "alice");
    let mut a = pipeline.chat.connect(ROOM, alice.clone()).await.unwrap();

    pipeline
        .chat
        .submit_client_text(ROOM, &alice, "/stock=msft.us")
        .await;

    let event = next_non_system(&mut a).await;
    assert_eq!(event.content, "MSFT.US quote is $310.00 per share");
}

#[tokio::test]
async fn test_failed_lookup_reported_in_room() {
    let pipeline = start_pipeline().await;
    let alice = Identity::new(1, "alice");
    let mut a = pipeline.chat.connect(ROOM, alice.clone()).await.unwrap();

    pipeline
        .chat
        .submit_client_text(ROOM, &alice, "/stock=nope")
        .await;

    let event = next_non_system(&mut a).await;
    assert_eq!(event.kind, EventKind::BotResult);
    assert_eq!(
        event.content,
        "Error getting quote for nope: stock not found or invalid code"
    );
}

#[tokio::test]
async fn test_near_miss_commands_are_chat() {
    let pipeline = start_pipeline().await;
    let alice = Identity::new(1, "alice");
    let bob = Identity::new(2, "bob");
    let mut a = pipeline.chat.connect(ROOM, alice.clone()).await.unwrap();
    let mut b = pipeline.chat.connect(ROOM, bob).await.unwrap();

    for text in ["/stock=", "/stock AAPL", " /stock=AAPL", "/stock=AAPL now"] {
        pipeline.chat.submit_client_text(ROOM, &alice, text).await;
        for session in [&mut a, &mut b] {
            let event = next_non_system(session).await;
            assert_eq!(event.kind, EventKind::UserMessage);
            assert_eq!(event.content, text);
            assert_eq!(event.username, "alice");
        }
    }
    assert_quiet(&mut a).await;
}

#[tokio::test]
async fn test_results_stay_in_their_room() {
    let pipeline = start_pipeline().await;
    let alice = Identity::new(1, "alice");
    let bob = Identity::new(2, "bob");
    let mut a = pipeline.chat.connect(ROOM, alice.clone()).await.unwrap();
    let mut b = pipeline.chat.connect("room-2", bob).await.unwrap();

    pipeline
        .chat
        .submit_client_text(ROOM, &alice, "/stock=AAPL.US")
        .await;

    let event = next_non_system(&mut a).await;
    assert_eq!(event.room_id, ROOM);
    assert_quiet(&mut b).await;
}

#[tokio::test]
async fn test_late_joiner_replays_history_before_live_events() {
    let pipeline = start_pipeline().await;
    let alice = Identity::new(1, "alice");
    let bob = Identity::new(2, "bob");
    let mut a = pipeline.chat.connect(ROOM, alice.clone()).await.unwrap();

    pipeline.chat.submit_client_text(ROOM, &alice, "hi").await;
    pipeline
        .chat
        .submit_client_text(ROOM, &alice, "/stock=AAPL.US")
        .await;
    assert_eq!(next_non_system(&mut a).await.content, "hi");
    assert_eq!(next_non_system(&mut a).await.kind, EventKind::BotResult);

    let mut b = pipeline.chat.connect(ROOM, bob).await.unwrap();
    let first = next_event(&mut b).await;
    let second = next_event(&mut b).await;
    let third = next_event(&mut b).await;

    assert_eq!(first.content, "hi");
    assert_eq!(second.kind, EventKind::BotResult);
    assert_eq!(third.kind, EventKind::SystemNotice);
    assert_eq!(third.content, "bob joined the chat");
}
