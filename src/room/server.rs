//! Room state and the authoritative event loop

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, PlayerUpdate, RosterEntry, ServerMsg};

/// Display name used when a client joins with a blank name
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

/// Room server tunables
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Well-known shared room id targeted by QUICK_PLAY
    pub quick_play_room: String,
    /// Auto-countdown start value (seconds remaining)
    pub countdown_start: u32,
    /// Cadence of countdown ticks (1 s in production, short in tests)
    pub countdown_tick: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            quick_play_room: "quickplay_lobby".to_string(),
            countdown_start: 10,
            countdown_tick: Duration::from_secs(1),
        }
    }
}

/// Commands consumed by the room server loop
#[derive(Debug)]
pub enum RoomCmd {
    /// New connection; the server replies with WELCOME on `tx`
    Connect {
        id: Uuid,
        tx: mpsc::UnboundedSender<ServerMsg>,
    },
    /// A parsed message from a connected client
    Inbound { id: Uuid, msg: ClientMsg },
    /// Transport closed; removes the participant from its room
    Disconnect { id: Uuid },
    /// Internal: one countdown tick elapsed for `room`
    CountdownTick { room: String, generation: u64 },
    /// Server-wide counters, for /health and tests
    Stats { reply: oneshot::Sender<RoomStats> },
    /// Roster projection of one room; None if the room does not exist
    Roster {
        room: String,
        reply: oneshot::Sender<Option<Vec<RosterEntry>>>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct RoomStats {
    pub active_rooms: usize,
    pub connected_participants: usize,
}

/// Cloneable handle for feeding commands into the room server loop
#[derive(Clone)]
pub struct RoomServerHandle {
    cmd_tx: mpsc::UnboundedSender<RoomCmd>,
}

impl RoomServerHandle {
    pub fn connect(&self, id: Uuid, tx: mpsc::UnboundedSender<ServerMsg>) {
        let _ = self.cmd_tx.send(RoomCmd::Connect { id, tx });
    }

    pub fn inbound(&self, id: Uuid, msg: ClientMsg) {
        let _ = self.cmd_tx.send(RoomCmd::Inbound { id, msg });
    }

    pub fn disconnect(&self, id: Uuid) {
        let _ = self.cmd_tx.send(RoomCmd::Disconnect { id });
    }

    pub async fn stats(&self) -> RoomStats {
        let (reply, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(RoomCmd::Stats { reply });
        rx.await.unwrap_or(RoomStats {
            active_rooms: 0,
            connected_participants: 0,
        })
    }

    pub async fn roster(&self, room: &str) -> Option<Vec<RosterEntry>> {
        let (reply, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(RoomCmd::Roster {
            room: room.to_string(),
            reply,
        });
        rx.await.ok().flatten()
    }
}

/// A connected participant
struct Connection {
    tx: mpsc::UnboundedSender<ServerMsg>,
    name: String,
    room: Option<String>,
}

/// In-flight auto-countdown; at most one per room
struct Countdown {
    remaining: u32,
    generation: u64,
    ticker: JoinHandle<()>,
}

/// Immutable per-game session data, minted at game start
struct GameSession {
    seed: u32,
}

/// One room: ordered membership (join order), optional countdown,
/// optional in-flight session. Host = earliest surviving joiner.
#[derive(Default)]
struct Room {
    members: Vec<Uuid>,
    countdown: Option<Countdown>,
    session: Option<GameSession>,
}

/// The authoritative room server
pub struct RoomServer {
    settings: RoomSettings,
    rooms: HashMap<String, Room>,
    conns: HashMap<Uuid, Connection>,
    cmd_tx: mpsc::UnboundedSender<RoomCmd>,
    cmd_rx: mpsc::UnboundedReceiver<RoomCmd>,
    /// Monotonic counter guarding stale countdown ticks
    countdown_generation: u64,
}

impl RoomServer {
    pub fn new(settings: RoomSettings) -> (Self, RoomServerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = RoomServerHandle {
            cmd_tx: cmd_tx.clone(),
        };
        let server = Self {
            settings,
            rooms: HashMap::new(),
            conns: HashMap::new(),
            cmd_tx,
            cmd_rx,
            countdown_generation: 0,
        };
        (server, handle)
    }

    /// Spawn the event loop and return its handle
    pub fn spawn(settings: RoomSettings) -> RoomServerHandle {
        let (server, handle) = Self::new(settings);
        tokio::spawn(server.run());
        handle
    }

    /// Consume commands until every handle is dropped
    pub async fn run(mut self) {
        info!("Room server started");
        while let Some(cmd) = self.cmd_rx.recv().await {
            self.handle(cmd);
        }
        info!("Room server stopped");
    }

    fn handle(&mut self, cmd: RoomCmd) {
        match cmd {
            RoomCmd::Connect { id, tx } => {
                debug!(conn = %id, "New connection");
                let welcome = ServerMsg::Welcome { id };
                let _ = tx.send(welcome);
                self.conns.insert(
                    id,
                    Connection {
                        tx,
                        name: DEFAULT_PLAYER_NAME.to_string(),
                        room: None,
                    },
                );
            }
            RoomCmd::Inbound { id, msg } => self.handle_msg(id, msg),
            RoomCmd::Disconnect { id } => {
                self.leave_room(id);
                self.conns.remove(&id);
                debug!(conn = %id, "Connection closed");
            }
            RoomCmd::CountdownTick { room, generation } => {
                self.handle_countdown_tick(&room, generation);
            }
            RoomCmd::Stats { reply } => {
                let _ = reply.send(RoomStats {
                    active_rooms: self.rooms.len(),
                    connected_participants: self.conns.len(),
                });
            }
            RoomCmd::Roster { room, reply } => {
                let roster = self.rooms.get(&room).map(|r| self.build_roster(r));
                let _ = reply.send(roster);
            }
        }
    }

    fn handle_msg(&mut self, id: Uuid, msg: ClientMsg) {
        if !self.conns.contains_key(&id) {
            warn!(conn = %id, "Message from unknown connection");
            return;
        }

        match msg {
            ClientMsg::JoinRoom { room, player_name } => {
                self.join_room(id, room, player_name);
            }
            ClientMsg::QuickPlay { player_name } => {
                let room = self.settings.quick_play_room.clone();
                self.join_room(id, room, player_name);
            }
            ClientMsg::StartGame => {
                // Host only; anything else is a protocol violation and
                // silently ignored.
                let Some(room_id) = self.room_of(id) else {
                    debug!(conn = %id, "START_GAME outside a room, ignoring");
                    return;
                };
                let is_host = self
                    .rooms
                    .get(&room_id)
                    .map(|r| r.members.first() == Some(&id))
                    .unwrap_or(false);
                if is_host {
                    self.start_game(&room_id);
                } else {
                    debug!(conn = %id, room = %room_id, "START_GAME from non-host, ignoring");
                }
            }
            ClientMsg::PlayerUpdate { state } => {
                if let Some(room_id) = self.room_of(id) {
                    self.relay_update(&room_id, id, state);
                }
            }
        }
    }

    fn room_of(&self, id: Uuid) -> Option<String> {
        self.conns.get(&id).and_then(|c| c.room.clone())
    }

    fn join_room(&mut self, id: Uuid, room_id: String, player_name: String) {
        // Leave any prior room first (room switch).
        self.leave_room(id);

        let name = {
            let trimmed = player_name.trim();
            if trimmed.is_empty() {
                DEFAULT_PLAYER_NAME.to_string()
            } else {
                trimmed.to_string()
            }
        };

        if let Some(conn) = self.conns.get_mut(&id) {
            conn.name = name.clone();
            conn.room = Some(room_id.clone());
        } else {
            return;
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!(room = %room_id, "Room created");
            Room::default()
        });
        room.members.push(id);

        info!(conn = %id, room = %room_id, name = %name, "Joined room");
        self.broadcast_roster(&room_id);

        // Quick-play auto-start: begin the countdown once the shared room
        // reaches two participants and no countdown is running.
        if room_id == self.settings.quick_play_room {
            let should_start = self
                .rooms
                .get(&room_id)
                .map(|r| r.members.len() >= 2 && r.countdown.is_none())
                .unwrap_or(false);
            if should_start {
                self.start_countdown(&room_id);
            }
        }
    }

    fn leave_room(&mut self, id: Uuid) {
        let Some(room_id) = self.room_of(id) else {
            return;
        };
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.room = None;
        }

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        room.members.retain(|m| *m != id);
        info!(conn = %id, room = %room_id, "Left room");

        if room.members.is_empty() {
            if let Some(countdown) = room.countdown.take() {
                countdown.ticker.abort();
            }
            self.rooms.remove(&room_id);
            info!(room = %room_id, "Room destroyed");
        } else {
            // Host may have changed; the roster carries the derived flag.
            self.broadcast_roster(&room_id);
        }
    }

    fn start_countdown(&mut self, room_id: &str) {
        self.countdown_generation += 1;
        let generation = self.countdown_generation;
        let count = self.settings.countdown_start;

        let tick = self.settings.countdown_tick;
        let cmd_tx = self.cmd_tx.clone();
        let room = room_id.to_string();
        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                if cmd_tx
                    .send(RoomCmd::CountdownTick {
                        room: room.clone(),
                        generation,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        if let Some(room) = self.rooms.get_mut(room_id) {
            room.countdown = Some(Countdown {
                remaining: count,
                generation,
                ticker,
            });
        } else {
            ticker.abort();
            return;
        }

        info!(room = %room_id, count, "Countdown started");
        self.broadcast(room_id, &ServerMsg::CountdownStart { count });
    }

    fn handle_countdown_tick(&mut self, room_id: &str, generation: u64) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let Some(countdown) = room.countdown.as_mut() else {
            return;
        };
        if countdown.generation != generation {
            // Stale tick from a cancelled countdown.
            return;
        }

        countdown.remaining = countdown.remaining.saturating_sub(1);
        let remaining = countdown.remaining;

        if remaining > 0 {
            self.broadcast(room_id, &ServerMsg::CountdownUpdate { count: remaining });
        } else {
            self.start_game(room_id);
        }
    }

    /// Mint a session seed and broadcast GAME_START. Cancels any running
    /// countdown for the room.
    fn start_game(&mut self, room_id: &str) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if let Some(countdown) = room.countdown.take() {
            countdown.ticker.abort();
        }

        let seed = unix_millis() as u32;
        room.session = Some(GameSession { seed });

        info!(room = %room_id, seed, "Game starting");
        self.broadcast(room_id, &ServerMsg::GameStart { seed });
    }

    /// Stateless fan-out of one participant's snapshot to everyone else
    /// in the room. No interpretation, no validation.
    fn relay_update(&self, room_id: &str, sender: Uuid, state: PlayerUpdate) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let relay = ServerMsg::RivalUpdate { id: sender, state };
        for member in &room.members {
            if *member == sender {
                continue;
            }
            if let Some(conn) = self.conns.get(member) {
                let _ = conn.tx.send(relay.clone());
            }
        }
    }

    fn build_roster(&self, room: &Room) -> Vec<RosterEntry> {
        room.members
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| {
                self.conns.get(id).map(|conn| RosterEntry {
                    id: *id,
                    name: conn.name.clone(),
                    is_host: idx == 0,
                })
            })
            .collect()
    }

    fn broadcast_roster(&self, room_id: &str) {
        if let Some(room) = self.rooms.get(room_id) {
            let roster = self.build_roster(room);
            self.broadcast(room_id, &ServerMsg::RosterUpdate { roster });
        }
    }

    /// Fire-and-forget delivery to every member; a slow or dead
    /// connection never blocks the others.
    fn broadcast(&self, room_id: &str, msg: &ServerMsg) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        for member in &room.members {
            if let Some(conn) = self.conns.get(member) {
                let _ = conn.tx.send(msg.clone());
            }
        }
    }
}
