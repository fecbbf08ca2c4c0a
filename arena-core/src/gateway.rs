use arena_types::ServerMessage;
use async_trait::async_trait;

/// Outbound side of the event gateway: deliver an event to every client
/// subscribed to a room code. The engine never sees the transport.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn broadcast(&self, code: &str, event: ServerMessage);
}
