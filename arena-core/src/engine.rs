use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arena_types::{GuessMark, Player, Room, RoomError, ServerMessage};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::evaluator::{evaluate_guess, is_fully_correct};
use crate::gateway::EventSink;
use crate::store::RoomStore;
use crate::timers::{RoundPhase, TimerRegistry};
use crate::{generate_room_code, generate_secret};

pub const MIN_ROUND_SECONDS: u32 = 15;
pub const MAX_ROUND_SECONDS: u32 = 180;
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 50;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub countdown: Duration,
    pub results_overlay: Duration,
    pub default_round_time_limit_seconds: u32,
    pub default_max_rounds: u32,
    pub max_players_per_room: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(3),
            results_overlay: Duration::from_secs(15),
            default_round_time_limit_seconds: 45,
            default_max_rounds: 10,
            max_players_per_room: 10,
        }
    }
}

/// Drives every room through its phases: lobby, preround countdown, active
/// round, results overlay, then the next round or game over.
///
/// All work on one room — player actions and timer expirations alike — is
/// serialized through that room's mutex, so a transition never races another.
/// Timer bookkeeping only happens while the room's lock is held; callbacks
/// reload the room once they hold it and silently abandon when the room has
/// been deleted in the meantime.
pub struct RoundEngine {
    store: Arc<dyn RoomStore>,
    events: Arc<dyn EventSink>,
    timers: TimerRegistry,
    locks: DashMap<String, Arc<Mutex<()>>>,
    settings: EngineSettings,
}

fn persistence(err: anyhow::Error) -> RoomError {
    RoomError::Persistence {
        message: err.to_string(),
    }
}

impl RoundEngine {
    pub fn new(
        store: Arc<dyn RoomStore>,
        events: Arc<dyn EventSink>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            events,
            timers: TimerRegistry::new(),
            locks: DashMap::new(),
            settings,
        })
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn room_lock(&self, code: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, code: &str) -> Result<Option<Room>, RoomError> {
        self.store.find_by_code(code).await.map_err(persistence)
    }

    async fn load_required(&self, code: &str) -> Result<Room, RoomError> {
        self.load(code).await?.ok_or_else(|| RoomError::RoomNotFound {
            code: code.to_string(),
        })
    }

    async fn save(&self, room: &Room) -> Result<(), RoomError> {
        self.store.save(room).await.map_err(persistence)
    }

    /// Create a room for its first player. The code is regenerated until the
    /// repository confirms it is unused.
    pub async fn create_room(
        self: &Arc<Self>,
        connection_id: Uuid,
        name: String,
        avatar: String,
    ) -> Result<Room, RoomError> {
        let code = loop {
            let candidate = generate_room_code();
            if !self
                .store
                .exists_by_code(&candidate)
                .await
                .map_err(persistence)?
            {
                break candidate;
            }
        };

        let lock = self.room_lock(&code);
        let _guard = lock.lock().await;

        let room = Room::new(
            code.clone(),
            generate_secret(),
            self.settings.default_round_time_limit_seconds,
            self.settings.default_max_rounds,
            Player::new(connection_id, name, avatar),
        );
        self.save(&room).await?;

        info!(room = %code, "room created");
        self.events
            .broadcast(
                &code,
                ServerMessage::RoomUpdated {
                    players: room.players.clone(),
                },
            )
            .await;
        Ok(room)
    }

    /// Joining is allowed in every phase; a mid-round joiner simply has no
    /// round in progress until the next one starts.
    pub async fn join_room(
        self: &Arc<Self>,
        code: &str,
        connection_id: Uuid,
        name: String,
        avatar: String,
    ) -> Result<Vec<Player>, RoomError> {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;

        let mut room = self.load_required(code).await?;
        if room.players.len() >= self.settings.max_players_per_room {
            return Err(RoomError::RoomFull {
                code: code.to_string(),
            });
        }
        room.players.push(Player::new(connection_id, name, avatar));
        self.save(&room).await?;

        info!(room = %code, players = room.players.len(), "player joined");
        self.events
            .broadcast(
                code,
                ServerMessage::RoomUpdated {
                    players: room.players.clone(),
                },
            )
            .await;
        Ok(room.players)
    }

    /// Host starts (or restarts) a game. Parameters fall back to the room's
    /// current values and are clamped to sane bounds; all pending timers are
    /// superseded before the first preround.
    pub async fn start_game(
        self: &Arc<Self>,
        code: &str,
        round_time_limit_seconds: Option<u32>,
        max_rounds: Option<u32>,
    ) -> Result<(), RoomError> {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;

        let mut room = self.load_required(code).await?;
        let limit = round_time_limit_seconds
            .unwrap_or(room.round_time_limit_seconds)
            .clamp(MIN_ROUND_SECONDS, MAX_ROUND_SECONDS);
        let rounds = max_rounds
            .unwrap_or(room.max_rounds)
            .clamp(MIN_ROUNDS, MAX_ROUNDS);

        self.timers.disarm_all(code);
        room.reset_for_new_game(limit, rounds);
        self.save(&room).await?;

        info!(room = %code, limit, rounds, "game started");
        self.events
            .broadcast(
                code,
                ServerMessage::GameStarted {
                    round: room.current_round,
                    time_limit_seconds: limit,
                },
            )
            .await;

        self.begin_preround(code, false).await
    }

    /// Wordle-style evaluation of one attempt. Does not finish the player's
    /// round; clients may call this any number of times while a round runs.
    pub async fn submit_guess(
        self: &Arc<Self>,
        code: &str,
        connection_id: Uuid,
        guess: &str,
    ) -> Result<Vec<GuessMark>, RoomError> {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;

        let mut room = self.load_required(code).await?;
        if !room.is_round_active {
            return Err(RoomError::RoundNotActive {
                code: code.to_string(),
            });
        }

        // Malformed guesses fail here, before any state is touched.
        let marks = evaluate_guess(&room.secret, guess)?;

        if let Some(player) = room.player_mut(connection_id) {
            player.guessed_correctly = is_fully_correct(&marks);
            self.save(&room).await?;
        }
        Ok(marks)
    }

    /// A player declares their round done (solved it or gave up). When the
    /// last unfinished player reports, the round closes early.
    pub async fn finish_round(
        self: &Arc<Self>,
        code: &str,
        connection_id: Uuid,
        elapsed_seconds: u32,
    ) -> Result<(), RoomError> {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;

        let mut room = self.load_required(code).await?;
        if !room.is_round_active {
            return Err(RoomError::RoundNotActive {
                code: code.to_string(),
            });
        }
        let limit = room.round_time_limit_seconds;
        let Some(player) = room.player_mut(connection_id) else {
            return Ok(());
        };
        player.finished_this_round = true;
        player.round_time_seconds = elapsed_seconds.min(limit);
        player.total_time_seconds += player.round_time_seconds;
        self.save(&room).await?;

        self.events
            .broadcast(
                code,
                ServerMessage::WaitingRoomUpdated {
                    players: room.players.clone(),
                },
            )
            .await;

        if room.all_finished() {
            self.close_round(code).await?;
        }
        Ok(())
    }

    /// Close the current round regardless of who finished. Safe to call on a
    /// room whose round already closed; the reload-and-check makes the
    /// second call a no-op, so the timer path and the all-finished path
    /// cannot both emit results.
    pub async fn force_close_round(self: &Arc<Self>, code: &str) -> Result<(), RoomError> {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;
        self.close_round(code).await
    }

    /// Remove a connection's player from the room. Unconditional: succeeds
    /// mid-round and on unknown rooms. Deletes the room (and disarms its
    /// timers) when the last player leaves.
    pub async fn leave_room(
        self: &Arc<Self>,
        code: &str,
        connection_id: Uuid,
    ) -> Result<(), RoomError> {
        let lock = self.room_lock(code);
        let guard = lock.lock().await;

        let Some(mut room) = self.load(code).await? else {
            return Ok(());
        };
        if !room.remove_player(connection_id) {
            return Ok(());
        }

        if room.players.is_empty() {
            self.timers.disarm_all(code);
            self.store.delete_by_code(code).await.map_err(persistence)?;
            info!(room = %code, "last player left, room deleted");
            drop(guard);
            drop(lock);
            // Only drop the lock entry when nobody else holds a clone of it;
            // a queued waiter keeps the entry, finds the room gone and no-ops.
            self.locks
                .remove_if(code, |_, lock| Arc::strong_count(lock) == 1);
            return Ok(());
        }

        self.save(&room).await?;
        info!(room = %code, players = room.players.len(), "player left");
        self.events
            .broadcast(
                code,
                ServerMessage::RoomUpdated {
                    players: room.players.clone(),
                },
            )
            .await;

        // The departure may have left everyone remaining finished; close the
        // round now instead of waiting out the timer.
        if room.is_round_active && room.all_finished() {
            self.close_round(code).await?;
        }
        Ok(())
    }

    // ---- internal transitions; caller holds the room lock ----

    // Boxed future: the preround, active round and results transitions call
    // back into each other through the timer callbacks, so as plain async
    // fns their opaque types would be mutually recursive.
    fn begin_preround<'a>(
        self: &'a Arc<Self>,
        code: &'a str,
        advance_round: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), RoomError>> + Send + 'a>> {
        Box::pin(async move {
            let Some(mut room) = self.load(code).await? else {
                return Ok(());
            };

            if advance_round {
                if room.is_last_round() {
                    info!(room = %code, "no rounds left, game over");
                    self.events
                        .broadcast(
                            code,
                            ServerMessage::GameEnded {
                                ranking: room.final_ranking(),
                            },
                        )
                        .await;
                    return Ok(());
                }
                room.current_round += 1;
            }

            self.timers.disarm(code, RoundPhase::ActiveRound);
            self.timers.disarm(code, RoundPhase::Results);
            room.is_round_active = false;
            room.reset_round_progress();
            self.save(&room).await?;

            let countdown_seconds = self.settings.countdown.as_secs() as u32;
            info!(
                room = %code,
                round = room.current_round,
                max = room.max_rounds,
                "preround countdown {}s",
                countdown_seconds
            );
            self.events
                .broadcast(
                    code,
                    ServerMessage::PreroundStarted {
                        round: room.current_round,
                        countdown_seconds,
                    },
                )
                .await;

            let engine = Arc::clone(self);
            let timer_code = code.to_string();
            self.timers
                .arm(code, RoundPhase::Preround, self.settings.countdown, async move {
                    engine.on_countdown_elapsed(&timer_code).await;
                });
            Ok(())
        })
    }

    async fn begin_active_round(self: &Arc<Self>, code: &str) -> Result<(), RoomError> {
        // The room may have emptied out during the countdown.
        let Some(mut room) = self.load(code).await? else {
            return Ok(());
        };

        room.secret = generate_secret();
        room.is_round_active = true;
        self.save(&room).await?;

        let limit = room.round_time_limit_seconds;
        info!(room = %code, round = room.current_round, "round active for {}s", limit);
        self.events
            .broadcast(
                code,
                ServerMessage::ActiveRoundStarted {
                    round: room.current_round,
                    time_limit_seconds: limit,
                },
            )
            .await;

        let engine = Arc::clone(self);
        let timer_code = code.to_string();
        self.timers.arm(
            code,
            RoundPhase::ActiveRound,
            Duration::from_secs(u64::from(limit)),
            async move {
                engine.on_round_timeout(&timer_code).await;
            },
        );
        Ok(())
    }

    async fn close_round(self: &Arc<Self>, code: &str) -> Result<(), RoomError> {
        // Disarm before anything else so a timer about to fire cannot close
        // the same round a second time.
        self.timers.disarm(code, RoundPhase::ActiveRound);

        let Some(mut room) = self.load(code).await? else {
            return Ok(());
        };
        if !room.is_round_active {
            return Ok(());
        }

        let limit = room.round_time_limit_seconds;
        for player in &mut room.players {
            if !player.finished_this_round {
                player.finished_this_round = true;
                player.round_time_seconds = limit;
                player.guessed_correctly = false;
                player.total_time_seconds += limit;
            }
        }
        self.save(&room).await?;
        self.events
            .broadcast(
                code,
                ServerMessage::WaitingRoomUpdated {
                    players: room.players.clone(),
                },
            )
            .await;

        self.end_round(room).await
    }

    async fn end_round(self: &Arc<Self>, mut room: Room) -> Result<(), RoomError> {
        let code = room.code.clone();
        self.timers.disarm(&code, RoundPhase::ActiveRound);
        room.is_round_active = false;
        self.save(&room).await?;

        if room.is_last_round() {
            info!(room = %code, "game over after round {}", room.current_round);
            self.events
                .broadcast(
                    &code,
                    ServerMessage::GameEnded {
                        ranking: room.final_ranking(),
                    },
                )
                .await;
            return Ok(());
        }

        info!(room = %code, round = room.current_round, "round finished, showing podium");
        self.events
            .broadcast(
                &code,
                ServerMessage::RoundResults {
                    podium: room.podium(),
                },
            )
            .await;

        let engine = Arc::clone(self);
        let timer_code = code.clone();
        self.timers.arm(
            &code,
            RoundPhase::Results,
            self.settings.results_overlay,
            async move {
                engine.on_results_elapsed(&timer_code).await;
            },
        );
        Ok(())
    }

    // ---- timer callbacks; acquire the room lock, never propagate errors ----

    async fn on_countdown_elapsed(self: &Arc<Self>, code: &str) {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;
        if let Err(err) = self.begin_active_round(code).await {
            warn!(room = %code, %err, "could not start active round, leaving phase for retry");
        }
    }

    async fn on_round_timeout(self: &Arc<Self>, code: &str) {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;
        if let Err(err) = self.close_round(code).await {
            warn!(room = %code, %err, "could not close timed-out round, leaving phase for retry");
        }
    }

    async fn on_results_elapsed(self: &Arc<Self>, code: &str) {
        let lock = self.room_lock(code);
        let _guard = lock.lock().await;
        // Everyone may have disconnected during the overlay.
        match self.load(code).await {
            Ok(Some(room)) if !room.players.is_empty() => {
                if let Err(err) = self.begin_preround(code, true).await {
                    warn!(room = %code, %err, "could not advance to next round");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(room = %code, %err, "could not reload room after results overlay"),
        }
    }
}
