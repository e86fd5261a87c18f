//! Same-device relay transport.
//!
//! Fallback room authority for sessions where every participant lives in
//! one process (split-screen, offline demos, tests). It speaks the same
//! message types as the room server over in-process channels, covering
//! membership, rosters, host-gated starts and state fan-out. There is no
//! auto-countdown here: on a shared device the host simply presses
//! start.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::room::DEFAULT_PLAYER_NAME;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, PlayerUpdate, RosterEntry, ServerMsg};

use super::transport::{SessionTransport, TransportError, TransportEvent};

struct Peer {
    name: String,
    room: Option<String>,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

/// In-process room authority shared by all local transports.
pub struct LocalRelayHub {
    quick_play_room: String,
    peers: DashMap<Uuid, Peer>,
    /// Ordered membership per room; index 0 is the host.
    rooms: DashMap<String, Vec<Uuid>>,
}

impl LocalRelayHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            quick_play_room: "quickplay_lobby".to_string(),
            peers: DashMap::new(),
            rooms: DashMap::new(),
        })
    }

    /// Register a new participant. The WELCOME message is already queued
    /// on the returned receiver.
    pub fn connect(
        hub: &Arc<Self>,
    ) -> (LocalRelayTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TransportEvent::Message(ServerMsg::Welcome { id }));
        hub.peers.insert(
            id,
            Peer {
                name: DEFAULT_PLAYER_NAME.to_string(),
                room: None,
                tx,
            },
        );
        debug!(conn = %id, "Local relay participant connected");
        (
            LocalRelayTransport {
                hub: Arc::clone(hub),
                id,
            },
            rx,
        )
    }

    fn handle(&self, id: Uuid, msg: ClientMsg) {
        match msg {
            ClientMsg::JoinRoom { room, player_name } => self.join_room(id, room, player_name),
            ClientMsg::QuickPlay { player_name } => {
                let room = self.quick_play_room.clone();
                self.join_room(id, room, player_name);
            }
            ClientMsg::StartGame => self.start_game(id),
            ClientMsg::PlayerUpdate { state } => self.relay_update(id, state),
        }
    }

    fn join_room(&self, id: Uuid, room: String, player_name: String) {
        let name = if player_name.trim().is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            player_name
        };

        let previous = match self.peers.get_mut(&id) {
            Some(mut peer) => {
                peer.name = name;
                peer.room.replace(room.clone())
            }
            None => return,
        };
        if let Some(prev) = previous {
            self.remove_from_room(id, &prev);
        }

        self.rooms.entry(room.clone()).or_default().push(id);
        info!(conn = %id, room = %room, "Joined local relay room");
        self.broadcast_roster(&room);
    }

    fn start_game(&self, id: Uuid) {
        let Some(room) = self.peers.get(&id).and_then(|p| p.room.clone()) else {
            return;
        };
        let members = match self.rooms.get(&room) {
            Some(members) => members.clone(),
            None => return,
        };
        // Host only; silently ignored otherwise, like the room server.
        if members.first() != Some(&id) {
            debug!(conn = %id, room = %room, "Ignoring start from non-host");
            return;
        }
        let seed = unix_millis() as u32;
        info!(room = %room, seed, "Local relay game starting");
        self.broadcast(&members, ServerMsg::GameStart { seed });
    }

    fn relay_update(&self, id: Uuid, state: PlayerUpdate) {
        let Some(room) = self.peers.get(&id).and_then(|p| p.room.clone()) else {
            return;
        };
        let members = match self.rooms.get(&room) {
            Some(members) => members.clone(),
            None => return,
        };
        for member in members {
            if member == id {
                continue;
            }
            if let Some(peer) = self.peers.get(&member) {
                let _ = peer.tx.send(TransportEvent::Message(ServerMsg::RivalUpdate {
                    id,
                    state: state.clone(),
                }));
            }
        }
    }

    fn disconnect(&self, id: Uuid) {
        let Some((_, peer)) = self.peers.remove(&id) else {
            return;
        };
        let _ = peer.tx.send(TransportEvent::Closed {
            reason: "transport closed".to_string(),
        });
        if let Some(room) = peer.room {
            self.remove_from_room(id, &room);
        }
        debug!(conn = %id, "Local relay participant disconnected");
    }

    fn remove_from_room(&self, id: Uuid, room: &str) {
        let emptied = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.retain(|m| *m != id);
                members.is_empty()
            }
            None => return,
        };
        if emptied {
            self.rooms.remove(room);
        } else {
            self.broadcast_roster(room);
        }
    }

    fn broadcast_roster(&self, room: &str) {
        let members = match self.rooms.get(room) {
            Some(members) => members.clone(),
            None => return,
        };
        let roster: Vec<RosterEntry> = members
            .iter()
            .enumerate()
            .filter_map(|(idx, member)| {
                self.peers.get(member).map(|peer| RosterEntry {
                    id: *member,
                    name: peer.name.clone(),
                    is_host: idx == 0,
                })
            })
            .collect();
        self.broadcast(&members, ServerMsg::RosterUpdate { roster });
    }

    fn broadcast(&self, members: &[Uuid], msg: ServerMsg) {
        for member in members {
            if let Some(peer) = self.peers.get(member) {
                let _ = peer.tx.send(TransportEvent::Message(msg.clone()));
            }
        }
    }

    pub fn participant_count(&self) -> usize {
        self.peers.len()
    }
}

/// One participant's handle into the hub.
pub struct LocalRelayTransport {
    hub: Arc<LocalRelayHub>,
    id: Uuid,
}

impl LocalRelayTransport {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl SessionTransport for LocalRelayTransport {
    fn send(&self, msg: ClientMsg) -> Result<(), TransportError> {
        if !self.hub.peers.contains_key(&self.id) {
            return Err(TransportError::Closed);
        }
        self.hub.handle(self.id, msg);
        Ok(())
    }

    fn close(&self) {
        self.hub.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::PlayerUpdate;

    async fn next_msg(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> ServerMsg {
        match rx.recv().await {
            Some(TransportEvent::Message(msg)) => msg,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn quick_play_builds_a_shared_roster() {
        let hub = LocalRelayHub::new();
        let (ann, mut ann_rx) = LocalRelayHub::connect(&hub);
        let (bob, mut bob_rx) = LocalRelayHub::connect(&hub);

        let ann_id = match next_msg(&mut ann_rx).await {
            ServerMsg::Welcome { id } => id,
            other => panic!("expected welcome, got {other:?}"),
        };
        assert!(matches!(next_msg(&mut bob_rx).await, ServerMsg::Welcome { .. }));

        ann.send(ClientMsg::QuickPlay {
            player_name: "Ann".to_string(),
        })
        .unwrap();
        match next_msg(&mut ann_rx).await {
            ServerMsg::RosterUpdate { roster } => {
                assert_eq!(roster.len(), 1);
                assert_eq!(roster[0].name, "Ann");
                assert!(roster[0].is_host);
                assert_eq!(roster[0].id, ann_id);
            }
            other => panic!("expected roster, got {other:?}"),
        }

        bob.send(ClientMsg::QuickPlay {
            player_name: "Bob".to_string(),
        })
        .unwrap();
        for rx in [&mut ann_rx, &mut bob_rx] {
            match next_msg(rx).await {
                ServerMsg::RosterUpdate { roster } => {
                    assert_eq!(roster.len(), 2);
                    assert!(roster[0].is_host);
                    assert!(!roster[1].is_host);
                }
                other => panic!("expected roster, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn only_the_host_can_start_and_all_get_one_seed() {
        let hub = LocalRelayHub::new();
        let (ann, mut ann_rx) = LocalRelayHub::connect(&hub);
        let (bob, mut bob_rx) = LocalRelayHub::connect(&hub);
        next_msg(&mut ann_rx).await;
        next_msg(&mut bob_rx).await;

        ann.send(ClientMsg::QuickPlay {
            player_name: "Ann".to_string(),
        })
        .unwrap();
        bob.send(ClientMsg::QuickPlay {
            player_name: "Bob".to_string(),
        })
        .unwrap();
        next_msg(&mut ann_rx).await;
        next_msg(&mut ann_rx).await;
        next_msg(&mut bob_rx).await;

        // Non-host start is ignored.
        bob.send(ClientMsg::StartGame).unwrap();
        ann.send(ClientMsg::StartGame).unwrap();

        let ann_seed = match next_msg(&mut ann_rx).await {
            ServerMsg::GameStart { seed } => seed,
            other => panic!("expected game start, got {other:?}"),
        };
        let bob_seed = match next_msg(&mut bob_rx).await {
            ServerMsg::GameStart { seed } => seed,
            other => panic!("expected game start, got {other:?}"),
        };
        assert_eq!(ann_seed, bob_seed);
    }

    #[tokio::test]
    async fn updates_fan_out_to_everyone_but_the_sender() {
        let hub = LocalRelayHub::new();
        let (ann, mut ann_rx) = LocalRelayHub::connect(&hub);
        let (bob, mut bob_rx) = LocalRelayHub::connect(&hub);
        next_msg(&mut ann_rx).await;
        next_msg(&mut bob_rx).await;
        ann.send(ClientMsg::QuickPlay {
            player_name: "Ann".to_string(),
        })
        .unwrap();
        bob.send(ClientMsg::QuickPlay {
            player_name: "Bob".to_string(),
        })
        .unwrap();
        next_msg(&mut ann_rx).await;
        next_msg(&mut ann_rx).await;
        next_msg(&mut bob_rx).await;

        let state = PlayerUpdate {
            score: 42,
            name: "Ann".to_string(),
            ..Default::default()
        };
        ann.send(ClientMsg::PlayerUpdate {
            state: state.clone(),
        })
        .unwrap();

        match next_msg(&mut bob_rx).await {
            ServerMsg::RivalUpdate { id, state: got } => {
                assert_eq!(id, ann.id());
                assert_eq!(got, state);
            }
            other => panic!("expected rival update, got {other:?}"),
        }
        assert!(
            ann_rx.try_recv().is_err(),
            "sender must not receive its own update"
        );
    }

    #[tokio::test]
    async fn disconnect_shrinks_the_roster_and_hands_off_host() {
        let hub = LocalRelayHub::new();
        let (ann, mut ann_rx) = LocalRelayHub::connect(&hub);
        let (bob, mut bob_rx) = LocalRelayHub::connect(&hub);
        next_msg(&mut ann_rx).await;
        next_msg(&mut bob_rx).await;
        ann.send(ClientMsg::QuickPlay {
            player_name: "Ann".to_string(),
        })
        .unwrap();
        bob.send(ClientMsg::QuickPlay {
            player_name: "Bob".to_string(),
        })
        .unwrap();
        next_msg(&mut ann_rx).await;
        next_msg(&mut ann_rx).await;
        next_msg(&mut bob_rx).await;

        ann.close();
        assert!(ann.send(ClientMsg::StartGame).is_err());

        match next_msg(&mut bob_rx).await {
            ServerMsg::RosterUpdate { roster } => {
                assert_eq!(roster.len(), 1);
                assert_eq!(roster[0].name, "Bob");
                assert!(roster[0].is_host);
            }
            other => panic!("expected roster, got {other:?}"),
        }

        bob.close();
        assert_eq!(hub.participant_count(), 0);
        assert!(hub.rooms.is_empty());
    }
}
