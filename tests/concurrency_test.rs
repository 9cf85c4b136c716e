//! Concurrency tests for the room hub.
//!
//! Joins, leaves and broadcasts run on separate tasks of a multi-threaded
//! runtime. Each member checks that it only saw broadcasts that overlapped
//! its membership, and that it saw all of them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stockchat::chat::{ChatEvent, Connection, EventKind, Identity, RoomHub};

const ROOM: &str = "room-1";
const BROADCASTS: usize = 300;
const MEMBERS: usize = 8;
const CYCLES: usize = 5;

/// Broadcast progress shared with the members.
#[derive(Default)]
struct Progress {
    /// Broadcasts that have been started.
    started: AtomicUsize,
    /// Broadcasts that have returned.
    completed: AtomicUsize,
}

/// Join, stay briefly, leave; return the sequence numbers received and
/// the window of broadcasts that may have been seen.
async fn membership(
    hub: &RoomHub,
    progress: &Progress,
    member: usize,
    cycle: usize,
) -> (Vec<usize>, usize, usize) {
    let (connection, mut events) = Connection::new(
        Identity::new(member as i64, format!("user{member}")),
        BROADCASTS * 2,
    );
    let id = connection.id();

    let earliest = progress.completed.load(Ordering::SeqCst);
    hub.join(ROOM, connection).await;

    tokio::time::sleep(Duration::from_micros(((member * 7 + cycle * 13) % 20) as u64 * 50)).await;

    hub.leave(ROOM, id).await;
    let latest = progress.started.load(Ordering::SeqCst);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        if event.kind == EventKind::BotResult {
            let seq = event.content.parse().expect("sequence number");
            seen.push(seq);
        }
    }
    (seen, earliest, latest)
}

/// Test broadcast membership under concurrent joins and leaves.
///
/// A member must never receive a broadcast that completed before it
/// joined, nor one that started after it left, and must receive every
/// broadcast in between without gaps.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_join_leave_broadcast() {
    let hub = Arc::new(RoomHub::new(Duration::from_secs(5)));
    let progress = Arc::new(Progress::default());

    let broadcaster = {
        let hub = Arc::clone(&hub);
        let progress = Arc::clone(&progress);
        tokio::spawn(async move {
            for seq in 0..BROADCASTS {
                progress.started.store(seq + 1, Ordering::SeqCst);
                hub.broadcast(ROOM, &ChatEvent::bot(ROOM, seq.to_string()))
                    .await;
                progress.completed.store(seq + 1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        })
    };

    let mut handles = Vec::new();
    for member in 0..MEMBERS {
        let hub = Arc::clone(&hub);
        let progress = Arc::clone(&progress);
        handles.push(tokio::spawn(async move {
            let mut results = Vec::new();
            for cycle in 0..CYCLES {
                results.push(membership(&hub, &progress, member, cycle).await);
            }
            results
        }));
    }

    for handle in handles {
        for (seen, earliest, latest) in handle.await.unwrap() {
            for seq in &seen {
                assert!(
                    *seq >= earliest,
                    "received broadcast {seq} that completed before joining at {earliest}"
                );
                assert!(
                    *seq < latest,
                    "received broadcast {seq} that started after leaving at {latest}"
                );
            }
            assert!(
                seen.windows(2).all(|w| w[1] == w[0] + 1),
                "gap or reordering in {seen:?}"
            );
        }
    }

    broadcaster.await.unwrap();

    // Every member left, so the room is empty again.
    assert_eq!(hub.member_count(ROOM).await, 0);
}

/// Test that concurrent leaves of the same connection announce it once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_leave_announces_once() {
    let hub = Arc::new(RoomHub::new(Duration::from_secs(1)));

    let (watcher, mut watcher_events) = Connection::new(Identity::new(1, "alice"), 64);
    hub.join(ROOM, watcher).await;
    let (connection, _events) = Connection::new(Identity::new(2, "bob"), 64);
    let bob_id = connection.id();
    hub.join(ROOM, connection).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let hub = Arc::clone(&hub);
        handles.push(tokio::spawn(async move { hub.leave(ROOM, bob_id).await }));
    }

    let mut announced = 0;
    for handle in handles {
        if handle.await.unwrap() {
            announced += 1;
        }
    }
    assert_eq!(announced, 1);

    let mut left_notices = 0;
    while let Ok(event) = watcher_events.try_recv() {
        if event.content == "bob left the chat" {
            left_notices += 1;
        }
    }
    assert_eq!(left_notices, 1);
}
