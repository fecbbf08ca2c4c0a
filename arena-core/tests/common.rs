use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arena_core::{EngineSettings, EventSink, MemoryRoomStore, RoomStore, RoundEngine};
use arena_types::{Room, ServerMessage};
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Gateway stand-in that records every broadcast with its room scope.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, ServerMessage)>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn broadcast(&self, code: &str, event: ServerMessage) {
        self.events.lock().await.push((code.to_string(), event));
    }
}

impl RecordingSink {
    pub async fn events_for(&self, code: &str) -> Vec<ServerMessage> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(scope, _)| scope == code)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn count_matching(&self, code: &str, pred: impl Fn(&ServerMessage) -> bool) -> usize {
        self.events_for(code).await.iter().filter(|e| pred(e)).count()
    }
}

/// Store that suspends before every operation, the way a real database
/// driver does. Timer callbacks must survive yielding mid-transition.
#[derive(Default)]
pub struct YieldingStore {
    inner: MemoryRoomStore,
}

impl YieldingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for YieldingStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        tokio::task::yield_now().await;
        self.inner.find_by_code(code).await
    }

    async fn save(&self, room: &Room) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.save(room).await
    }

    async fn delete_by_code(&self, code: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.delete_by_code(code).await
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner.exists_by_code(code).await
    }
}

/// Settings with countdowns short enough for tests to wait through.
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        countdown: Duration::from_millis(20),
        results_overlay: Duration::from_millis(50),
        ..EngineSettings::default()
    }
}

pub fn test_engine() -> (Arc<RoundEngine>, Arc<MemoryRoomStore>, Arc<RecordingSink>) {
    let store = Arc::new(MemoryRoomStore::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = RoundEngine::new(store.clone(), sink.clone(), fast_settings());
    (engine, store, sink)
}

pub fn yielding_engine() -> (Arc<RoundEngine>, Arc<YieldingStore>, Arc<RecordingSink>) {
    let store = Arc::new(YieldingStore::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = RoundEngine::new(store.clone(), sink.clone(), fast_settings());
    (engine, store, sink)
}

pub fn conn() -> Uuid {
    Uuid::new_v4()
}

/// Create a room and wait until its first round is active. Returns the room
/// code and the creator's connection id.
pub async fn room_with_active_round(
    engine: &Arc<RoundEngine>,
    extra_players: &[Uuid],
    round_time_limit_seconds: u32,
    max_rounds: u32,
) -> (String, Uuid) {
    let host = conn();
    let room = engine
        .create_room(host, "Host".to_string(), "owl".to_string())
        .await
        .unwrap();
    for (i, player) in extra_players.iter().enumerate() {
        engine
            .join_room(&room.code, *player, format!("P{i}"), "fox".to_string())
            .await
            .unwrap();
    }
    engine
        .start_game(&room.code, Some(round_time_limit_seconds), Some(max_rounds))
        .await
        .unwrap();
    // Outlive the preround countdown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    (room.code, host)
}
