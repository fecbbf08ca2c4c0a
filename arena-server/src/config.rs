use std::env;
use std::time::Duration;

use arena_core::EngineSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub countdown_seconds: u64,
    pub results_overlay_seconds: u64,
    pub round_time_limit_seconds: u32,
    pub max_rounds: u32,
    pub max_players_per_room: usize,
    pub connection_timeout_seconds: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            countdown_seconds: env::var("COUNTDOWN_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("Invalid COUNTDOWN_SECONDS"),
            results_overlay_seconds: env::var("RESULTS_OVERLAY_SECONDS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("Invalid RESULTS_OVERLAY_SECONDS"),
            round_time_limit_seconds: env::var("ROUND_TIME_LIMIT_SECONDS")
                .unwrap_or_else(|_| "45".to_string())
                .parse()
                .expect("Invalid ROUND_TIME_LIMIT_SECONDS"),
            max_rounds: env::var("MAX_ROUNDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("Invalid MAX_ROUNDS"),
            max_players_per_room: env::var("MAX_PLAYERS_PER_ROOM")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("Invalid MAX_PLAYERS_PER_ROOM"),
            connection_timeout_seconds: env::var("CONNECTION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid CONNECTION_TIMEOUT_SECONDS"),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            countdown: Duration::from_secs(self.countdown_seconds),
            results_overlay: Duration::from_secs(self.results_overlay_seconds),
            default_round_time_limit_seconds: self.round_time_limit_seconds,
            default_max_rounds: self.max_rounds,
            max_players_per_room: self.max_players_per_room,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
