use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Everything a room action can fail with. None of these are fatal to the
/// server; they are reported back to the initiating client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
pub enum RoomError {
    #[error("room {code} not found")]
    RoomNotFound { code: String },
    #[error("room {code} is full")]
    RoomFull { code: String },
    #[error("no active round in room {code}")]
    RoundNotActive { code: String },
    #[error("guess must be exactly {expected_length} ASCII digits")]
    InvalidGuess { expected_length: u32 },
    #[error("persistence failure: {message}")]
    Persistence { message: String },
}
