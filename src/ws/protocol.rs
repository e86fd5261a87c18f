//! WebSocket protocol message definitions
//! These are the wire types for client-server communication
//!
//! Tags are SCREAMING_SNAKE_CASE and field names camelCase to match the
//! browser clients on the other end of the socket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Instantaneous state of one participant's runner, sent every heartbeat.
///
/// Always a full snapshot, never a delta: a lost update is superseded by
/// the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub score: u32,
    pub crashed: bool,
    #[serde(default)]
    pub jumping: bool,
    #[serde(default)]
    pub ducking: bool,
    #[serde(default)]
    pub name: String,
}

/// One entry of a room roster, ordered by join time.
///
/// `is_host` is recomputed from membership order on every broadcast; it
/// is never stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: Uuid,
    pub name: String,
    pub is_host: bool,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMsg {
    /// Join (or create) a named room
    #[serde(rename_all = "camelCase")]
    JoinRoom { room: String, player_name: String },

    /// Join the well-known shared quick-play room
    #[serde(rename_all = "camelCase")]
    QuickPlay { player_name: String },

    /// Host only: mint a seed and start the game immediately
    StartGame,

    /// Heartbeat snapshot, fanned out to the room as RIVAL_UPDATE
    PlayerUpdate { state: PlayerUpdate },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMsg {
    /// Assigns the connection id after connect
    Welcome { id: Uuid },

    /// Current room membership, ordered by join time
    RosterUpdate { roster: Vec<RosterEntry> },

    /// Auto-countdown has begun
    CountdownStart { count: u32 },

    /// Seconds remaining in the auto-countdown
    CountdownUpdate { count: u32 },

    /// Session begins; `seed` drives every deterministic RNG stream
    GameStart { seed: u32 },

    /// Relay of another participant's PlayerUpdate
    RivalUpdate { id: Uuid, state: PlayerUpdate },

    /// Non-fatal notice to display
    Error { message: String },
}
