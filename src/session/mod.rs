//! Client-side session runtime: the state machine that takes one local
//! player from lobby to game over, the rival proxy reconciler that
//! mirrors remote participants, and the transport backends it speaks
//! through (server WebSocket or same-device relay).

pub mod controller;
pub mod local_relay;
pub mod rivals;
pub mod runner;
pub mod transport;

pub use controller::{
    SessionCommand, SessionConfig, SessionController, SessionEvent, SessionHandle, SessionPhase,
};
pub use local_relay::{LocalRelayHub, LocalRelayTransport};
pub use rivals::{BoardEvent, DisplaySlot, RivalBoard};
pub use runner::{
    BotBrain, EngineFactory, GameInstance, HeadlessFactory, HeadlessRunner, RunnerEngine,
};
pub use transport::{SessionTransport, TransportError, TransportEvent, WsTransport};
