//! Authoritative room/session server.
//!
//! All rooms live inside one event-loop task; every inbound command is
//! handled to completion before the next, so membership mutation needs
//! no locking.

mod server;

pub use server::{
    RoomCmd, RoomServer, RoomServerHandle, RoomSettings, RoomStats, DEFAULT_PLAYER_NAME,
};
