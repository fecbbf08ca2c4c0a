use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GuessMark, Player, PodiumEntry, RankingEntry, RoomError};

/// Inbound player actions, validated at the gateway boundary before they
/// reach the engine. Malformed frames never construct one of these.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    CreateRoom {
        name: String,
        avatar: String,
    },
    JoinRoom {
        code: String,
        name: String,
        avatar: String,
    },
    StartGame {
        code: String,
        round_time_limit_seconds: Option<u32>,
        max_rounds: Option<u32>,
    },
    SubmitGuess {
        code: String,
        guess: String,
    },
    FinishRound {
        code: String,
        elapsed_seconds: u32,
    },
    LeaveRoom {
        code: String,
    },
}

/// Outbound events. Broadcasts are scoped to a room code; the reply variants
/// (`RoomCreated`, `RoomJoined`, `GuessEvaluated`, `Error`) go only to the
/// initiating connection.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    RoomCreated {
        code: String,
        players: Vec<Player>,
    },
    RoomJoined {
        code: String,
        players: Vec<Player>,
    },
    GuessEvaluated {
        marks: Vec<GuessMark>,
    },
    RoomUpdated {
        players: Vec<Player>,
    },
    GameStarted {
        round: u32,
        time_limit_seconds: u32,
    },
    PreroundStarted {
        round: u32,
        countdown_seconds: u32,
    },
    ActiveRoundStarted {
        round: u32,
        time_limit_seconds: u32,
    },
    WaitingRoomUpdated {
        players: Vec<Player>,
    },
    RoundResults {
        podium: Vec<PodiumEntry>,
    },
    GameEnded {
        ranking: Vec<RankingEntry>,
    },
    Error {
        error: RoomError,
    },
}
