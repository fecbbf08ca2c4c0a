use std::sync::Arc;

use arena_core::RoundEngine;
use arena_types::{ClientMessage, RoomError, ServerMessage};
use tracing::{error, info};

use crate::websocket::connection::{ConnectionId, ConnectionManager};

/// Routes one connection's parsed messages into the engine and sends the
/// per-request replies back to that connection. Broadcasts to the rest of
/// the room come out of the engine through the [`ConnectionManager`].
#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    engine: Arc<RoundEngine>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        engine: Arc<RoundEngine>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            engine,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match message {
            ClientMessage::CreateRoom { name, avatar } => self.handle_create_room(name, avatar).await,
            ClientMessage::JoinRoom { code, name, avatar } => {
                self.handle_join_room(code, name, avatar).await
            }
            ClientMessage::StartGame {
                code,
                round_time_limit_seconds,
                max_rounds,
            } => {
                self.handle_start_game(code, round_time_limit_seconds, max_rounds)
                    .await
            }
            ClientMessage::SubmitGuess { code, guess } => {
                self.handle_submit_guess(code, guess).await
            }
            ClientMessage::FinishRound {
                code,
                elapsed_seconds,
            } => self.handle_finish_round(code, elapsed_seconds).await,
            ClientMessage::LeaveRoom { code } => self.handle_leave_room(code).await,
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);

        let Some(connection) = self
            .connection_manager
            .get_connection(self.connection_id)
            .await
        else {
            return;
        };

        if let Some(code) = connection.room_code {
            if let Err(e) = self
                .engine
                .leave_room(&code, self.connection_id.as_uuid())
                .await
            {
                error!(
                    "Failed to remove disconnected player {} from room {}: {}",
                    self.connection_id, code, e
                );
            }
        }
    }

    async fn handle_create_room(&self, name: String, avatar: String) -> Result<(), String> {
        info!("Connection {} creating room", self.connection_id);

        match self
            .engine
            .create_room(self.connection_id.as_uuid(), name, avatar)
            .await
        {
            Ok(room) => {
                self.connection_manager
                    .set_connection_room(self.connection_id, Some(room.code.clone()))
                    .await;
                self.send_message(ServerMessage::RoomCreated {
                    code: room.code,
                    players: room.players,
                })
                .await
            }
            Err(e) => self.send_error(e).await,
        }
    }

    async fn handle_join_room(
        &self,
        code: String,
        name: String,
        avatar: String,
    ) -> Result<(), String> {
        info!("Connection {} joining room {}", self.connection_id, code);

        match self
            .engine
            .join_room(&code, self.connection_id.as_uuid(), name, avatar)
            .await
        {
            Ok(players) => {
                self.connection_manager
                    .set_connection_room(self.connection_id, Some(code.clone()))
                    .await;
                self.send_message(ServerMessage::RoomJoined { code, players })
                    .await
            }
            Err(e) => self.send_error(e).await,
        }
    }

    async fn handle_start_game(
        &self,
        code: String,
        round_time_limit_seconds: Option<u32>,
        max_rounds: Option<u32>,
    ) -> Result<(), String> {
        info!("Connection {} starting game in {}", self.connection_id, code);

        match self
            .engine
            .start_game(&code, round_time_limit_seconds, max_rounds)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => self.send_error(e).await,
        }
    }

    async fn handle_submit_guess(&self, code: String, guess: String) -> Result<(), String> {
        match self
            .engine
            .submit_guess(&code, self.connection_id.as_uuid(), &guess)
            .await
        {
            Ok(marks) => self.send_message(ServerMessage::GuessEvaluated { marks }).await,
            Err(e) => self.send_error(e).await,
        }
    }

    async fn handle_finish_round(&self, code: String, elapsed_seconds: u32) -> Result<(), String> {
        match self
            .engine
            .finish_round(&code, self.connection_id.as_uuid(), elapsed_seconds)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => self.send_error(e).await,
        }
    }

    async fn handle_leave_room(&self, code: String) -> Result<(), String> {
        info!("Connection {} leaving room {}", self.connection_id, code);

        match self
            .engine
            .leave_room(&code, self.connection_id.as_uuid())
            .await
        {
            Ok(()) => {
                self.connection_manager
                    .set_connection_room(self.connection_id, None)
                    .await;
                Ok(())
            }
            Err(e) => self.send_error(e).await,
        }
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    async fn send_error(&self, error: RoomError) -> Result<(), String> {
        self.send_message(ServerMessage::Error { error }).await
    }
}
