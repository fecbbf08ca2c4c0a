use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use arena_core::EventSink;
use arena_types::ServerMessage;
use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id the engine knows this connection's player by.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub room_code: Option<String>,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            connected_at: now,
            last_activity: now,
            room_code: None,
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn set_room(&mut self, room_code: Option<String>) {
        self.room_code = room_code;
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    /// Remove a connection, returning the room it was in so the caller can
    /// take the player out of that room.
    pub async fn remove_connection(&self, id: ConnectionId) -> Option<String> {
        let mut connections = self.connections.write().await;
        connections.remove(&id).and_then(|conn| conn.room_code)
    }

    pub async fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn set_connection_room(&self, id: ConnectionId, room_code: Option<String>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.set_room(room_code);
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    pub async fn send_to_room(&self, room_code: &str, message: ServerMessage) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if let Some(ref code) = connection.room_code {
                if code == room_code {
                    let _ = connection.send_message(message.clone());
                }
            }
        }
    }

    /// Drop connections idle past the timeout and return the (id, room)
    /// pairs that were reaped so their players can be removed from rooms.
    pub async fn cleanup_inactive_connections(
        &self,
        timeout: Duration,
    ) -> Vec<(ConnectionId, Option<String>)> {
        let inactive_connections: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        let mut reaped = Vec::with_capacity(inactive_connections.len());
        for connection_id in inactive_connections {
            tracing::info!("Removing inactive connection: {}", connection_id);
            let room_code = self.remove_connection(connection_id).await;
            reaped.push((connection_id, room_code));
        }
        reaped
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for ConnectionManager {
    async fn broadcast(&self, code: &str, event: ServerMessage) {
        self.send_to_room(code, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::RoomError;

    fn error_message(text: &str) -> ServerMessage {
        ServerMessage::Error {
            error: RoomError::Persistence {
                message: text.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        manager.remove_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_removal_reports_room_membership() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        manager
            .set_connection_room(conn_id, Some("AB1CD".to_string()))
            .await;

        let room = manager.remove_connection(conn_id).await;
        assert_eq!(room.as_deref(), Some("AB1CD"));
    }

    #[tokio::test]
    async fn test_room_broadcast_reaches_only_members() {
        let manager = ConnectionManager::new();
        let in_room_a = ConnectionId::new();
        let in_room_b = ConnectionId::new();
        let no_room = ConnectionId::new();

        let mut receiver_a = manager.create_connection(in_room_a).await;
        let mut receiver_b = manager.create_connection(in_room_b).await;
        let mut receiver_none = manager.create_connection(no_room).await;

        manager
            .set_connection_room(in_room_a, Some("AB1CD".to_string()))
            .await;
        manager
            .set_connection_room(in_room_b, Some("ZZ9ZZ".to_string()))
            .await;

        manager.send_to_room("AB1CD", error_message("scoped")).await;

        assert!(receiver_a.try_recv().is_ok());
        assert!(receiver_b.try_recv().is_err());
        assert!(receiver_none.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_message_sending_to_nonexistent_connection() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let result = manager
            .send_to_connection(conn_id, error_message("test"))
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Connection not found");
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager
            .send_to_connection(conn_id, error_message("test"))
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        manager
            .set_connection_room(conn_id, Some("AB1CD".to_string()))
            .await;

        let short_timeout = Duration::from_millis(10);
        let reaped = manager.cleanup_inactive_connections(short_timeout).await;
        assert!(reaped.is_empty());
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let reaped = manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].1.as_deref(), Some("AB1CD"));
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_connection_operations() {
        let manager = std::sync::Arc::new(ConnectionManager::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let manager_clone = manager.clone();
            let handle = tokio::spawn(async move {
                let conn_id = ConnectionId::new();
                let _receiver = manager_clone.create_connection(conn_id).await;

                tokio::time::sleep(Duration::from_millis(1)).await;

                manager_clone
                    .set_connection_room(conn_id, Some(format!("ROOM{i}")))
                    .await;
                manager_clone.remove_connection(conn_id).await;
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.connection_count().await, 0);
    }
}
