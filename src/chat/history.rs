//! Message persistence boundary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::event::ChatEvent;
use crate::{ChatError, Result};

/// Storage for chat and bot events.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist an event and return its ID.
    ///
    /// System notices are never persisted; saving one is a validation error.
    async fn save_message(&self, event: &ChatEvent) -> Result<i64>;

    /// Load the most recent `limit` events of a room, oldest first.
    async fn load_recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatEvent>>;
}

/// Message store kept in process memory.
#[derive(Default)]
pub struct MemoryMessageStore {
    rooms: Mutex<HashMap<String, Vec<ChatEvent>>>,
}

impl MemoryMessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn save_message(&self, event: &ChatEvent) -> Result<i64> {
        if !event.is_persistent() {
            return Err(ChatError::Validation(
                "system notices are not persisted".to_string(),
            ));
        }

        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let id = rooms.values().map(Vec::len).sum::<usize>() as i64 + 1;
        let mut stored = event.clone();
        stored.id = Some(id);
        rooms.entry(event.room_id.clone()).or_default().push(stored);
        Ok(id)
    }

    async fn load_recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatEvent>> {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let events = rooms.get(room_id).map(Vec::as_slice).unwrap_or_default();
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::event::Identity;

    #[tokio::test]
    async fn test_save_assigns_increasing_ids() {
        let store = MemoryMessageStore::new();
        let alice = Identity::new(1, "alice");
        let first = store
            .save_message(&ChatEvent::user_message(&alice, "room-1", "one"))
            .await
            .unwrap();
        let second = store
            .save_message(&ChatEvent::bot("room-2", "two"))
            .await
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_system_notice_rejected() {
        let store = MemoryMessageStore::new();
        let result = store
            .save_message(&ChatEvent::joined("room-1", "alice"))
            .await;
        assert!(matches!(result, Err(ChatError::Validation(_))));
        assert!(store.load_recent("room-1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_recent_window_oldest_first() {
        let store = MemoryMessageStore::new();
        for i in 0..5 {
            store
                .save_message(&ChatEvent::bot("room-1", i.to_string()))
                .await
                .unwrap();
        }

        let recent: Vec<String> = store
            .load_recent("room-1", 3)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(recent, vec!["2", "3", "4"]);
        assert!(store.load_recent("other", 3).await.unwrap().is_empty());
    }
}
