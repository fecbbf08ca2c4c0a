use std::collections::HashMap;

use anyhow::Result;
use arena_types::Room;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Repository for room aggregates, keyed by room code. Loads and saves are
/// the only suspension points the engine goes through.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>>;
    async fn save(&self, room: &Room) -> Result<()>;
    async fn delete_by_code(&self, code: &str) -> Result<()>;
    async fn exists_by_code(&self, code: &str) -> Result<bool>;
}

/// Map-backed store for tests and storage-free deployments.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<String, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(code).cloned())
    }

    async fn save(&self, room: &Room) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        rooms.insert(room.code.clone(), room.clone());
        Ok(())
    }

    async fn delete_by_code(&self, code: &str) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        rooms.remove(code);
        Ok(())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let rooms = self.rooms.read().await;
        Ok(rooms.contains_key(code))
    }
}
