//! Client session controller.
//!
//! One controller owns one local participant's whole journey: it joins a
//! room through a [`SessionTransport`], reacts to server messages, and on
//! game start builds the local instance set (player, bot fill, rival
//! board) driven by one shared clock. The embedding UI observes
//! [`SessionEvent`]s and steers through [`SessionHandle`] commands; it
//! never touches the transport directly.
//!
//! Every timer lives inside the `run` select loop, so when the loop
//! returns (leave, transport close) no stale heartbeat or frame tick can
//! fire into a dead session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::sim::{SeededRng, SimClock, DEFAULT_DELTA_CLAMP_MS};
use crate::util::time::monotonic_millis;
use crate::ws::protocol::{ClientMsg, RosterEntry, ServerMsg};

use super::rivals::{BoardEvent, RivalBoard};
use super::runner::{BotBrain, EngineFactory, GameInstance};
use super::transport::{SessionTransport, TransportEvent};

/// Callsigns handed to locally simulated opponents.
const ROYALE_NAMES: &[&str] = &[
    "Quicksilver",
    "Nebula",
    "CometRush",
    "ByteKnight",
    "NovaBlade",
    "ShadowDash",
    "CircuitFox",
    "Zenith",
    "NightPulse",
    "EchoSprite",
    "Sunset",
    "Vapor",
    "Lumen",
    "Solaris",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    LobbyIdle,
    Connecting,
    LobbyWaiting,
    Countdown,
    Playing,
    /// Local player crashed; the session keeps running for the rest.
    Spectating,
    GameOver,
}

/// What the embedding UI hears from the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// Human-readable condition report (connection problems, rejections).
    Status(String),
    RosterChanged(Vec<RosterEntry>),
    CountdownTick(u32),
    GameStarted { seed: u32 },
    Rival(BoardEvent),
    MatchOver {
        winner: Option<String>,
        /// (name, score) for every instance, creation order.
        scores: Vec<(String, u32)>,
    },
}

/// What the embedding UI can ask for.
#[derive(Debug, Clone, Copy)]
pub enum SessionCommand {
    StartGame,
    Jump,
    Duck(bool),
    /// Discard the finished session and wait in the lobby again.
    PlayAgain,
    Leave,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub player_name: String,
    /// Explicit room id; `None` means quick play.
    pub room: Option<String>,
    pub heartbeat: Duration,
    pub frame: Duration,
    /// Wait after the local crash before declaring the match over.
    pub game_over_grace: Duration,
    pub front_slots: usize,
    pub bot_minis: usize,
    pub delta_clamp_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            room: None,
            heartbeat: Duration::from_millis(250),
            frame: Duration::from_millis(16),
            game_over_grace: Duration::from_secs(2),
            front_slots: 2,
            bot_minis: 4,
            delta_clamp_ms: DEFAULT_DELTA_CLAMP_MS,
        }
    }
}

/// Cloneable command handle for the embedding UI.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn start_game(&self) {
        let _ = self.cmd_tx.send(SessionCommand::StartGame);
    }

    pub fn jump(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Jump);
    }

    pub fn duck(&self, ducking: bool) {
        let _ = self.cmd_tx.send(SessionCommand::Duck(ducking));
    }

    pub fn play_again(&self) {
        let _ = self.cmd_tx.send(SessionCommand::PlayAgain);
    }

    pub fn leave(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Leave);
    }
}

pub struct SessionController {
    transport: Box<dyn SessionTransport>,
    transport_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    engines: Arc<dyn EngineFactory>,
    config: SessionConfig,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    cmd_rx: Option<mpsc::UnboundedReceiver<SessionCommand>>,

    phase: SessionPhase,
    my_id: Option<Uuid>,
    roster: Vec<RosterEntry>,

    // Per-game state, rebuilt on every GAME_START.
    player: Option<GameInstance>,
    bots: Vec<GameInstance>,
    board: Option<RivalBoard>,
    clock: SimClock,
    /// Remote participants in the roster at game start; until the board
    /// has seen them all, "everyone else crashed" cannot be concluded.
    expected_remotes: usize,
    /// Monotonic-ms deadline armed by the local crash.
    grace_deadline: Option<f64>,
}

impl SessionController {
    pub fn new(
        transport: Box<dyn SessionTransport>,
        transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        engines: Arc<dyn EngineFactory>,
        config: SessionConfig,
    ) -> (
        Self,
        SessionHandle,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let delta_clamp = config.delta_clamp_ms;
        (
            Self {
                transport,
                transport_rx: Some(transport_rx),
                engines,
                config,
                event_tx,
                cmd_rx: Some(cmd_rx),
                phase: SessionPhase::LobbyIdle,
                my_id: None,
                roster: Vec::new(),
                player: None,
                bots: Vec::new(),
                board: None,
                clock: SimClock::new(delta_clamp),
                expected_remotes: 0,
                grace_deadline: None,
            },
            SessionHandle { cmd_tx },
            event_rx,
        )
    }

    /// Drive the session to completion. Returns when the participant
    /// leaves or the transport closes.
    pub async fn run(mut self) {
        let (Some(mut transport_rx), Some(mut cmd_rx)) =
            (self.transport_rx.take(), self.cmd_rx.take())
        else {
            return;
        };

        self.set_phase(SessionPhase::Connecting);
        let join = match self.config.room.clone() {
            Some(room) => ClientMsg::JoinRoom {
                room,
                player_name: self.config.player_name.clone(),
            },
            None => ClientMsg::QuickPlay {
                player_name: self.config.player_name.clone(),
            },
        };
        if self.transport.send(join).is_err() {
            self.emit(SessionEvent::Status("Connection failed".to_string()));
            self.set_phase(SessionPhase::LobbyIdle);
            return;
        }

        let mut heartbeat = tokio::time::interval(self.config.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frame = tokio::time::interval(self.config.frame);
        frame.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = transport_rx.recv() => match event {
                    Some(TransportEvent::Message(msg)) => self.handle_server_msg(msg),
                    Some(TransportEvent::Closed { reason }) => {
                        info!(%reason, "Transport closed");
                        self.emit(SessionEvent::Status(format!("Disconnected: {reason}")));
                        self.set_phase(SessionPhase::LobbyIdle);
                        break;
                    }
                    None => break,
                },
                cmd = cmd_rx.recv() => match cmd {
                    Some(SessionCommand::StartGame) => {
                        let _ = self.transport.send(ClientMsg::StartGame);
                    }
                    Some(SessionCommand::Jump) => {
                        if self.phase == SessionPhase::Playing {
                            if let Some(player) = self.player.as_mut() {
                                player.engine.trigger_jump();
                            }
                        }
                    }
                    Some(SessionCommand::Duck(ducking)) => {
                        if self.phase == SessionPhase::Playing {
                            if let Some(player) = self.player.as_mut() {
                                player.engine.trigger_duck(ducking);
                            }
                        }
                    }
                    Some(SessionCommand::PlayAgain) => self.reset_to_lobby(),
                    Some(SessionCommand::Leave) | None => {
                        self.set_phase(SessionPhase::LobbyIdle);
                        break;
                    }
                },
                _ = heartbeat.tick(), if self.in_game() => self.send_heartbeat(),
                _ = frame.tick(), if self.in_game() => self.frame_tick(),
            }
        }

        self.transport.close();
    }

    fn in_game(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Playing | SessionPhase::Spectating
        )
    }

    fn handle_server_msg(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Welcome { id } => {
                debug!(conn = %id, "Session welcomed");
                self.my_id = Some(id);
            }
            ServerMsg::RosterUpdate { roster } => {
                self.roster = roster.clone();
                if self.phase == SessionPhase::Connecting {
                    self.set_phase(SessionPhase::LobbyWaiting);
                }
                self.emit(SessionEvent::RosterChanged(roster));
            }
            ServerMsg::CountdownStart { count } | ServerMsg::CountdownUpdate { count } => {
                if matches!(
                    self.phase,
                    SessionPhase::Connecting | SessionPhase::LobbyWaiting | SessionPhase::GameOver
                ) {
                    self.set_phase(SessionPhase::Countdown);
                }
                self.emit(SessionEvent::CountdownTick(count));
            }
            ServerMsg::GameStart { seed } => self.start_session(seed),
            ServerMsg::RivalUpdate { id, state } => {
                if let Some(board) = self.board.as_mut() {
                    for event in board.apply_update(id, state, self.engines.as_ref()) {
                        self.emit(SessionEvent::Rival(event));
                    }
                }
            }
            ServerMsg::Error { message } => {
                warn!(%message, "Server rejected a request");
                self.emit(SessionEvent::Status(message));
            }
        }
    }

    /// Build the local instance set for a fresh game.
    fn start_session(&mut self, seed: u32) {
        let mut rng = SeededRng::new(seed);

        let name = if self.config.player_name.trim().is_empty() {
            "You".to_string()
        } else {
            self.config.player_name.clone()
        };
        let mut player = GameInstance::local(name.clone(), self.engines.create(&name, seed));
        player.engine.activate();
        self.player = Some(player);

        // Remote participants claim display slots through their updates;
        // bots fill whatever the roster leaves unclaimed.
        self.expected_remotes = self.roster.len().saturating_sub(1);
        let total_slots = self.config.front_slots + self.config.bot_minis;
        let bot_count = total_slots.saturating_sub(self.expected_remotes);

        self.bots.clear();
        let name_offset = rng.next_range(0.0, ROYALE_NAMES.len() as f64) as usize;
        for i in 0..bot_count {
            let bot_name = ROYALE_NAMES[(name_offset + i) % ROYALE_NAMES.len()];
            let skill = (0.9 - i as f64 * 0.03).max(0.5);
            let brain = BotBrain::new(rng.fork(i as u32 + 1), skill);
            let mut bot =
                GameInstance::bot(bot_name, self.engines.create(bot_name, seed), brain);
            bot.engine.activate();
            self.bots.push(bot);
        }

        self.board = Some(RivalBoard::new(seed, self.config.front_slots));
        self.grace_deadline = None;
        self.clock.start(monotonic_millis());

        info!(seed, bots = bot_count, remotes = self.expected_remotes, "Game starting");
        self.emit(SessionEvent::GameStarted { seed });
        self.set_phase(SessionPhase::Playing);
        self.send_heartbeat();
    }

    fn send_heartbeat(&mut self) {
        let Some(player) = self.player.as_ref() else {
            return;
        };
        let _ = self.transport.send(ClientMsg::PlayerUpdate {
            state: player.snapshot(),
        });
    }

    fn frame_tick(&mut self) {
        let now = monotonic_millis();
        let delta = self.clock.tick(now);

        if let Some(player) = self.player.as_mut() {
            player.tick(delta);
        }
        for bot in &mut self.bots {
            bot.tick(delta);
        }

        if self.phase == SessionPhase::Playing {
            if self.player.as_ref().is_some_and(|p| p.engine.crashed()) {
                // Last snapshot carries the crash before we go quiet.
                self.send_heartbeat();
                self.grace_deadline = Some(now + self.config.game_over_grace.as_millis() as f64);
                self.set_phase(SessionPhase::Spectating);
            } else if self.local_player_won() {
                self.finish_match();
                return;
            }
        }

        if self.phase == SessionPhase::Spectating {
            if let Some(deadline) = self.grace_deadline {
                if now >= deadline && self.survivors() <= 1 {
                    self.finish_match();
                }
            }
        }
    }

    /// True when the session has opponents and every one of them has
    /// crashed. Solo runs never end in a win; only the local crash ends
    /// them.
    fn local_player_won(&self) -> bool {
        let opponents = self.bots.len() + self.expected_remotes;
        if opponents == 0 {
            return false;
        }
        if !self.bots.iter().all(|b| b.engine.crashed()) {
            return false;
        }
        match self.board.as_ref() {
            Some(board) => board.len() >= self.expected_remotes && board.all_crashed(),
            None => false,
        }
    }

    /// Instances not yet crashed, local player included.
    fn survivors(&self) -> usize {
        let mut alive = 0;
        if self.player.as_ref().is_some_and(|p| !p.engine.crashed()) {
            alive += 1;
        }
        alive += self.bots.iter().filter(|b| !b.engine.crashed()).count();
        if let Some(board) = self.board.as_ref() {
            alive += board
                .standings()
                .iter()
                .filter(|(_, _, crashed)| !crashed)
                .count();
        }
        alive
    }

    /// Declare the result: the unique survivor wins; with none left the
    /// highest score wins, earliest-created instance on a tie.
    fn finish_match(&mut self) {
        let mut standings: Vec<(String, u32, bool)> = Vec::new();
        if let Some(player) = self.player.as_ref() {
            standings.push((
                player.name.clone(),
                player.engine.score(),
                player.engine.crashed(),
            ));
        }
        for bot in &self.bots {
            standings.push((bot.name.clone(), bot.engine.score(), bot.engine.crashed()));
        }
        if let Some(board) = self.board.as_ref() {
            standings.extend(board.standings());
        }

        let survivors: Vec<&(String, u32, bool)> =
            standings.iter().filter(|(_, _, crashed)| !crashed).collect();
        let winner = match survivors.as_slice() {
            [only] => Some(only.0.clone()),
            _ => {
                // Highest score; earliest-created instance takes a tie.
                let mut best: Option<&(String, u32, bool)> = None;
                for entry in &standings {
                    if best.map_or(true, |b| entry.1 > b.1) {
                        best = Some(entry);
                    }
                }
                best.map(|(name, _, _)| name.clone())
            }
        };

        let scores: Vec<(String, u32)> = standings
            .iter()
            .map(|(name, score, _)| (name.clone(), *score))
            .collect();
        info!(winner = ?winner, "Match over");
        self.emit(SessionEvent::MatchOver { winner, scores });
        self.set_phase(SessionPhase::GameOver);
    }

    /// Drop the finished game and wait in the room for the next start.
    fn reset_to_lobby(&mut self) {
        self.player = None;
        self.bots.clear();
        self.board = None;
        self.grace_deadline = None;
        self.clock.reset();
        self.set_phase(SessionPhase::LobbyWaiting);
        self.emit(SessionEvent::RosterChanged(self.roster.clone()));
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::runner::HeadlessFactory;
    use crate::session::transport::TransportError;
    use crate::ws::protocol::PlayerUpdate;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Transport double that records everything the controller sends.
    struct ScriptTransport {
        sent: Arc<Mutex<Vec<ClientMsg>>>,
    }

    impl ScriptTransport {
        fn new() -> (Self, Arc<Mutex<Vec<ClientMsg>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            (Self { sent: sent.clone() }, sent)
        }
    }

    impl SessionTransport for ScriptTransport {
        fn send(&self, msg: ClientMsg) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(msg);
            Ok(())
        }

        fn close(&self) {}
    }

    fn test_config() -> SessionConfig {
        SessionConfig {
            player_name: "Ann".to_string(),
            room: Some("test_room".to_string()),
            heartbeat: Duration::from_millis(10),
            frame: Duration::from_millis(2),
            game_over_grace: Duration::from_millis(30),
            front_slots: 2,
            bot_minis: 0,
            delta_clamp_ms: 50.0,
        }
    }

    fn roster_entry(name: &str, is_host: bool) -> RosterEntry {
        RosterEntry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_host,
        }
    }

    async fn expect_event(
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        want: &SessionEvent,
    ) {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event stream ended");
            if &event == want {
                return;
            }
        }
    }

    #[test]
    fn game_start_builds_player_and_bot_fill() {
        let (transport, _sent) = ScriptTransport::new();
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.front_slots = 1;
        config.bot_minis = 1;
        let (mut controller, _handle, _events) = SessionController::new(
            Box::new(transport),
            rx,
            Arc::new(HeadlessFactory),
            config,
        );

        controller.handle_server_msg(ServerMsg::RosterUpdate {
            roster: vec![roster_entry("Ann", true)],
        });
        controller.handle_server_msg(ServerMsg::GameStart { seed: 99 });

        assert_eq!(controller.phase, SessionPhase::Playing);
        let player = controller.player.as_ref().unwrap();
        assert_eq!(player.name, "Ann");
        assert!(!player.is_remote());
        // Alone in the roster: both slots filled with bots.
        assert_eq!(controller.bots.len(), 2);
        assert!(controller.board.is_some());
    }

    #[test]
    fn remote_participants_shrink_the_bot_fill() {
        let (transport, _sent) = ScriptTransport::new();
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.front_slots = 2;
        config.bot_minis = 2;
        let (mut controller, _handle, _events) = SessionController::new(
            Box::new(transport),
            rx,
            Arc::new(HeadlessFactory),
            config,
        );

        controller.handle_server_msg(ServerMsg::RosterUpdate {
            roster: vec![
                roster_entry("Ann", true),
                roster_entry("Bob", false),
                roster_entry("Cyd", false),
            ],
        });
        controller.handle_server_msg(ServerMsg::GameStart { seed: 7 });

        assert_eq!(controller.expected_remotes, 2);
        assert_eq!(controller.bots.len(), 2);
    }

    #[tokio::test]
    async fn lobby_to_playing_emits_the_expected_sequence() {
        let (transport, sent) = ScriptTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (controller, handle, mut events) = SessionController::new(
            Box::new(transport),
            rx,
            Arc::new(HeadlessFactory),
            test_config(),
        );
        let runner = tokio::spawn(controller.run());

        let me = roster_entry("Ann", true);
        tx.send(TransportEvent::Message(ServerMsg::Welcome { id: me.id }))
            .unwrap();
        tx.send(TransportEvent::Message(ServerMsg::RosterUpdate {
            roster: vec![me.clone()],
        }))
        .unwrap();
        expect_event(
            &mut events,
            &SessionEvent::PhaseChanged(SessionPhase::LobbyWaiting),
        )
        .await;

        tx.send(TransportEvent::Message(ServerMsg::CountdownStart { count: 10 }))
            .unwrap();
        expect_event(&mut events, &SessionEvent::CountdownTick(10)).await;

        tx.send(TransportEvent::Message(ServerMsg::GameStart { seed: 5 }))
            .unwrap();
        expect_event(&mut events, &SessionEvent::GameStarted { seed: 5 }).await;
        expect_event(
            &mut events,
            &SessionEvent::PhaseChanged(SessionPhase::Playing),
        )
        .await;

        // Heartbeats flow once playing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let sent = sent.lock().unwrap();
            assert!(matches!(sent[0], ClientMsg::JoinRoom { .. }));
            assert!(
                sent.iter()
                    .any(|m| matches!(m, ClientMsg::PlayerUpdate { .. })),
                "no heartbeat sent: {sent:?}"
            );
        }

        handle.leave();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn solo_crash_runs_through_spectating_to_game_over() {
        let (transport, sent) = ScriptTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.front_slots = 0;
        config.bot_minis = 0;
        let (controller, handle, mut events) = SessionController::new(
            Box::new(transport),
            rx,
            Arc::new(HeadlessFactory),
            config,
        );
        let runner = tokio::spawn(controller.run());

        let me = roster_entry("Ann", true);
        tx.send(TransportEvent::Message(ServerMsg::Welcome { id: me.id }))
            .unwrap();
        tx.send(TransportEvent::Message(ServerMsg::RosterUpdate {
            roster: vec![me],
        }))
        .unwrap();
        tx.send(TransportEvent::Message(ServerMsg::GameStart { seed: 5 }))
            .unwrap();

        // Idle player hits the first obstacle, spectates through the
        // grace window, then the match resolves on score.
        expect_event(
            &mut events,
            &SessionEvent::PhaseChanged(SessionPhase::Spectating),
        )
        .await;
        let mut saw_match_over = false;
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
                .await
                .expect("timed out waiting for game over")
                .expect("event stream ended");
            match event {
                SessionEvent::MatchOver { winner, scores } => {
                    assert_eq!(winner.as_deref(), Some("Ann"));
                    assert_eq!(scores.len(), 1);
                    saw_match_over = true;
                }
                SessionEvent::PhaseChanged(SessionPhase::GameOver) => break,
                _ => {}
            }
        }
        assert!(saw_match_over, "match-over must precede game-over");

        // The final heartbeat reported the crash.
        {
            let sent = sent.lock().unwrap();
            let crashed_sent = sent.iter().any(|m| {
                matches!(m, ClientMsg::PlayerUpdate {
                    state: PlayerUpdate { crashed: true, .. }
                })
            });
            assert!(crashed_sent, "crash never reported: {sent:?}");
        }

        handle.leave();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn play_again_returns_to_the_lobby() {
        let (transport, _sent) = ScriptTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (controller, handle, mut events) = SessionController::new(
            Box::new(transport),
            rx,
            Arc::new(HeadlessFactory),
            test_config(),
        );
        let runner = tokio::spawn(controller.run());

        tx.send(TransportEvent::Message(ServerMsg::RosterUpdate {
            roster: vec![roster_entry("Ann", true)],
        }))
        .unwrap();
        tx.send(TransportEvent::Message(ServerMsg::GameStart { seed: 1 }))
            .unwrap();
        expect_event(
            &mut events,
            &SessionEvent::PhaseChanged(SessionPhase::Playing),
        )
        .await;

        handle.play_again();
        expect_event(
            &mut events,
            &SessionEvent::PhaseChanged(SessionPhase::LobbyWaiting),
        )
        .await;

        handle.leave();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn transport_close_surfaces_a_status_and_ends_the_run() {
        let (transport, _sent) = ScriptTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (controller, _handle, mut events) = SessionController::new(
            Box::new(transport),
            rx,
            Arc::new(HeadlessFactory),
            test_config(),
        );
        let runner = tokio::spawn(controller.run());

        tx.send(TransportEvent::Closed {
            reason: "server gone".to_string(),
        })
        .unwrap();

        expect_event(
            &mut events,
            &SessionEvent::Status("Disconnected: server gone".to_string()),
        )
        .await;
        runner.await.unwrap();
    }
}
