use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// One participant, embedded in exactly one room. Identified by the
/// transport-session id of the connection that joined.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Player {
    pub connection_id: Uuid,
    pub name: String,
    pub avatar: String,
    pub finished_this_round: bool,
    /// Completion time for the current round, clamped to the room's limit.
    pub round_time_seconds: u32,
    pub guessed_correctly: bool,
    /// Cumulative time across rounds; reset only when a new game starts.
    pub total_time_seconds: u32,
}

impl Player {
    pub fn new(connection_id: Uuid, name: String, avatar: String) -> Self {
        Self {
            connection_id,
            name,
            avatar,
            finished_this_round: false,
            round_time_seconds: 0,
            guessed_correctly: false,
            total_time_seconds: 0,
        }
    }

    /// Clear the per-round flags at the start of a round.
    pub fn reset_round_progress(&mut self) {
        self.finished_this_round = false;
        self.round_time_seconds = 0;
        self.guessed_correctly = false;
    }
}

/// One round's standing for a player, ordered by that round's time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PodiumEntry {
    pub name: String,
    pub avatar: String,
    pub round_time_seconds: u32,
    pub total_time_seconds: u32,
    pub guessed_correctly: bool,
}

/// End-of-game standing, ordered by cumulative time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RankingEntry {
    pub name: String,
    pub avatar: String,
    pub total_time_seconds: u32,
}

/// Aggregate root for one game session. The secret is never serialized
/// toward clients; rooms only cross the repository boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: String,
    pub secret: String,
    pub current_round: u32,
    pub max_rounds: u32,
    pub round_time_limit_seconds: u32,
    pub is_round_active: bool,
    pub players: Vec<Player>,
}

impl Room {
    pub fn new(
        code: String,
        secret: String,
        round_time_limit_seconds: u32,
        max_rounds: u32,
        first_player: Player,
    ) -> Self {
        Self {
            code,
            secret,
            current_round: 1,
            max_rounds,
            round_time_limit_seconds,
            is_round_active: false,
            players: vec![first_player],
        }
    }

    pub fn player_mut(&mut self, connection_id: Uuid) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
    }

    /// Remove the player for a connection. Returns true if one was removed.
    pub fn remove_player(&mut self, connection_id: Uuid) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.connection_id != connection_id);
        self.players.len() != before
    }

    pub fn all_finished(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.finished_this_round)
    }

    pub fn is_last_round(&self) -> bool {
        self.current_round >= self.max_rounds
    }

    /// Clear every player's per-round flags at the start of a round.
    pub fn reset_round_progress(&mut self) {
        for player in &mut self.players {
            player.reset_round_progress();
        }
    }

    /// Full reset when the host starts a new game.
    pub fn reset_for_new_game(&mut self, round_time_limit_seconds: u32, max_rounds: u32) {
        self.current_round = 1;
        self.max_rounds = max_rounds;
        self.round_time_limit_seconds = round_time_limit_seconds;
        self.is_round_active = false;
        for player in &mut self.players {
            player.reset_round_progress();
            player.total_time_seconds = 0;
        }
    }

    /// This round's standings, fastest first. Stable, so ties keep join order.
    pub fn podium(&self) -> Vec<PodiumEntry> {
        let mut entries: Vec<PodiumEntry> = self
            .players
            .iter()
            .map(|p| PodiumEntry {
                name: p.name.clone(),
                avatar: p.avatar.clone(),
                round_time_seconds: p.round_time_seconds,
                total_time_seconds: p.total_time_seconds,
                guessed_correctly: p.guessed_correctly,
            })
            .collect();
        entries.sort_by_key(|e| e.round_time_seconds);
        entries
    }

    /// End-of-game standings, lowest cumulative time first.
    pub fn final_ranking(&self) -> Vec<RankingEntry> {
        let mut entries: Vec<RankingEntry> = self
            .players
            .iter()
            .map(|p| RankingEntry {
                name: p.name.clone(),
                avatar: p.avatar.clone(),
                total_time_seconds: p.total_time_seconds,
            })
            .collect();
        entries.sort_by_key(|e| e.total_time_seconds);
        entries
    }
}
