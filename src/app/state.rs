//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::room::{RoomServer, RoomServerHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: RoomServerHandle,
}

impl AppState {
    /// Spawn the room server loop and wire up shared state
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let rooms = RoomServer::spawn(config.room_settings());

        Self { config, rooms }
    }
}
