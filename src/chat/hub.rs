//! Room hub: the live registry of connections per room.
//!
//! Joins and leaves take the registry write lock. Broadcast holds the read
//! lock while it delivers to every member of the room and only takes the
//! write lock afterwards to evict members whose delivery failed.
//!
//! An evicted connection is remembered until its transport calls `leave`,
//! so the room still hears about the departure exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use super::event::{ChatEvent, Identity};
use crate::config::HubConfig;

/// Identifier of a live connection, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A live connection registered with the hub.
///
/// The hub holds the only sender for the connection's outbound buffer.
/// Removing the connection from the registry drops the sender, which the
/// transport observes as the end of its outbound stream.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    identity: Identity,
    outbound: mpsc::Sender<ChatEvent>,
}

impl Connection {
    /// Create a connection with a bounded outbound buffer.
    ///
    /// Returns the connection and the receiving end the transport drains.
    pub fn new(identity: Identity, buffer: usize) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (outbound, receiver) = mpsc::channel(buffer.max(1));
        let connection = Self {
            id: ConnectionId::next(),
            identity,
            outbound,
        };
        (connection, receiver)
    }

    /// Get the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the identity driving this connection.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queue an event without waiting. Used before the connection is registered.
    pub fn try_deliver(&self, event: ChatEvent) -> bool {
        self.outbound.try_send(event).is_ok()
    }
}

/// Registry of live connections grouped by room.
pub struct RoomHub {
    rooms: RwLock<HashMap<String, HashMap<ConnectionId, Connection>>>,
    /// Evicted connections not yet left, with their room and username.
    evicted: Mutex<HashMap<ConnectionId, (String, String)>>,
    send_timeout: Duration,
}

impl RoomHub {
    /// Create a hub that gives each delivery at most `send_timeout`.
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            evicted: Mutex::new(HashMap::new()),
            send_timeout,
        }
    }

    /// Create a hub from configuration.
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(Duration::from_millis(config.send_timeout_ms))
    }

    /// Register a connection in a room and announce it.
    pub async fn join(&self, room_id: &str, connection: Connection) {
        let id = connection.id;
        let username = connection.identity.username.clone();

        {
            let mut rooms = self.rooms.write().await;
            rooms
                .entry(room_id.to_string())
                .or_default()
                .insert(id, connection);
        }

        info!(room_id = %room_id, connection_id = %id, username = %username, "Joined room");
        self.broadcast(room_id, &ChatEvent::joined(room_id, &username))
            .await;
    }

    /// Remove a connection from a room.
    ///
    /// The leave notice is broadcast the first time a connection leaves,
    /// including a connection that was already evicted by a failed
    /// delivery. Repeated calls are no-ops. Returns whether a notice was
    /// sent.
    pub async fn leave(&self, room_id: &str, id: ConnectionId) -> bool {
        let removed = {
            let mut rooms = self.rooms.write().await;
            remove_member(&mut rooms, room_id, id).map(|c| c.identity.username)
        };

        let username = match removed {
            Some(username) => Some(username),
            None => self.take_evicted(room_id, id).await,
        };

        match username {
            Some(username) => {
                info!(room_id = %room_id, connection_id = %id, username = %username, "Left room");
                self.broadcast(room_id, &ChatEvent::left(room_id, &username))
                    .await;
                true
            }
            None => {
                debug!(room_id = %room_id, connection_id = %id, "Leave for unregistered connection");
                false
            }
        }
    }

    async fn take_evicted(&self, room_id: &str, id: ConnectionId) -> Option<String> {
        let mut evicted = self.evicted.lock().await;
        if !evicted.get(&id).is_some_and(|(room, _)| room == room_id) {
            return None;
        }
        evicted.remove(&id).map(|(_, username)| username)
    }

    /// Deliver an event to every connection currently in the room.
    ///
    /// Connections whose delivery fails or does not complete within the
    /// send timeout are evicted. Their leave notice is sent when the
    /// transport calls `leave`. Returns the number of connections the event
    /// was delivered to.
    pub async fn broadcast(&self, room_id: &str, event: &ChatEvent) -> usize {
        let (members, failed) = {
            let rooms = self.rooms.read().await;
            let Some(members) = rooms.get(room_id) else {
                debug!(room_id = %room_id, kind = %event.kind, "Broadcast to empty room");
                return 0;
            };

            let send_timeout = self.send_timeout;
            let deliveries = members.values().map(|connection| async move {
                connection
                    .outbound
                    .send_timeout(event.clone(), send_timeout)
                    .await
                    .err()
                    .map(|_| connection.id)
            });

            let failed: Vec<ConnectionId> =
                join_all(deliveries).await.into_iter().flatten().collect();
            (members.len(), failed)
        };

        if !failed.is_empty() {
            self.evict(room_id, &failed).await;
        }

        debug!(
            room_id = %room_id,
            kind = %event.kind,
            delivered = members - failed.len(),
            "Broadcast event"
        );
        members - failed.len()
    }

    async fn evict(&self, room_id: &str, ids: &[ConnectionId]) {
        // Recorded before the registry lock is released so that a
        // concurrent leave finds the connection in one place or the other.
        let mut rooms = self.rooms.write().await;
        let mut evicted = self.evicted.lock().await;
        for id in ids {
            if let Some(connection) = remove_member(&mut rooms, room_id, *id) {
                warn!(
                    room_id = %room_id,
                    connection_id = %id,
                    username = %connection.identity.username,
                    "Evicting connection after failed delivery"
                );
                evicted.insert(*id, (room_id.to_string(), connection.identity.username));
            }
        }
    }

    /// Get the number of connections in a room.
    pub async fn member_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map_or(0, HashMap::len)
    }

    /// Get the number of rooms with at least one connection.
    #[cfg(test)]
    pub async fn active_rooms(&self) -> usize {
        self.rooms.read().await.len()
    }
}

fn remove_member(
    rooms: &mut HashMap<String, HashMap<ConnectionId, Connection>>,
    room_id: &str,
    id: ConnectionId,
) -> Option<Connection> {
    let members = rooms.get_mut(room_id)?;
    let removed = members.remove(&id);
    if members.is_empty() {
        rooms.remove(room_id);
    }
    removed
}
