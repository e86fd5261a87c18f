//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::room::RoomSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Well-known shared room id for quick play
    pub quick_play_room: String,
    /// Auto-countdown start value in seconds
    pub countdown_secs: u32,
    /// Countdown tick cadence in milliseconds
    pub countdown_tick_ms: u64,
    /// Client heartbeat interval in milliseconds
    pub heartbeat_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Every knob has a default; nothing is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT; fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            quick_play_room: env::var("QUICK_PLAY_ROOM")
                .unwrap_or_else(|_| "quickplay_lobby".to_string()),
            countdown_secs: parse_or("COUNTDOWN_SECS", 10)?,
            countdown_tick_ms: parse_or("COUNTDOWN_TICK_MS", 1000)?,
            heartbeat_ms: parse_or("HEARTBEAT_MS", 250)?,
        })
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            quick_play_room: self.quick_play_room.clone(),
            countdown_start: self.countdown_secs,
            countdown_tick: Duration::from_millis(self.countdown_tick_ms),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}
