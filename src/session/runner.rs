//! Driven game instances.
//!
//! The runner engine (rendering, physics, obstacle sprites) is an
//! external collaborator; [`RunnerEngine`] is the surface the session
//! layer needs from it. [`GameInstance`] wraps one engine with a driver:
//! locally driven (human input or a bot brain) or remotely mirrored
//! (input-less copy of another participant, updated from RIVAL_UPDATE).

use crate::sim::SeededRng;
use crate::ws::protocol::PlayerUpdate;

/// What the session layer needs from one runner engine instance.
///
/// Obstacle generation inside the engine must be a pure function of the
/// construction seed so every instance in a session shows the same
/// obstacle stream.
pub trait RunnerEngine: Send {
    /// Begin the run (the engine starts scrolling).
    fn activate(&mut self);
    /// Advance the simulation by a clamped clock delta, in milliseconds.
    fn advance(&mut self, delta_ms: f64);
    fn trigger_jump(&mut self);
    fn trigger_duck(&mut self, ducking: bool);
    fn score(&self) -> u32;
    fn crashed(&self) -> bool;
    fn jumping(&self) -> bool;
    fn ducking(&self) -> bool;
    /// Distance to the nearest upcoming obstacle, if any is in sight.
    fn nearest_obstacle_gap(&self) -> Option<f64>;
    /// Visual override for remote mirrors: mark crashed/alive without
    /// running the local simulation into an obstacle.
    fn set_crashed(&mut self, crashed: bool);
    /// Visual override for remote mirrors: show the remote score.
    fn set_score(&mut self, score: u32);
}

/// Creates engine instances for a session. Implemented by the embedding
/// application over the real renderer; [`HeadlessFactory`] serves tests
/// and terminal clients.
pub trait EngineFactory: Send + Sync {
    fn create(&self, name: &str, seed: u32) -> Box<dyn RunnerEngine>;
}

/// Simple reaction-window jumper used for locally simulated opponents.
///
/// The decision stream is a fork of the session RNG, so bot behavior is
/// reproducible per seed without perturbing the obstacle stream.
pub struct BotBrain {
    rng: SeededRng,
    skill: f64,
}

impl BotBrain {
    pub fn new(rng: SeededRng, skill: f64) -> Self {
        Self { rng, skill }
    }

    fn think(&mut self, engine: &mut dyn RunnerEngine) {
        if engine.crashed() || engine.jumping() || engine.ducking() {
            return;
        }
        let Some(gap) = engine.nearest_obstacle_gap() else {
            return;
        };
        let reaction_window = 110.0 + self.rng.next_f64() * 20.0;
        if gap < reaction_window && self.rng.next_bool(self.skill) {
            engine.trigger_jump();
        }
    }
}

enum InstanceDriver {
    /// Advanced by the shared clock; `bot` decides inputs when present,
    /// otherwise input arrives from the embedding UI.
    Local { bot: Option<BotBrain> },
    /// Input-less mirror of a remote participant; never self-advances,
    /// state is applied from the wire.
    Remote,
}

/// One driven game instance: the local player, a local bot, or a mirror
/// of a remote participant.
pub struct GameInstance {
    pub name: String,
    driver: InstanceDriver,
    pub engine: Box<dyn RunnerEngine>,
}

impl GameInstance {
    pub fn local(name: impl Into<String>, engine: Box<dyn RunnerEngine>) -> Self {
        Self {
            name: name.into(),
            driver: InstanceDriver::Local { bot: None },
            engine,
        }
    }

    pub fn bot(name: impl Into<String>, engine: Box<dyn RunnerEngine>, brain: BotBrain) -> Self {
        Self {
            name: name.into(),
            driver: InstanceDriver::Local { bot: Some(brain) },
            engine,
        }
    }

    pub fn remote(name: impl Into<String>, engine: Box<dyn RunnerEngine>) -> Self {
        Self {
            name: name.into(),
            driver: InstanceDriver::Remote,
            engine,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.driver, InstanceDriver::Remote)
    }

    /// Advance by one shared-clock delta. Remote mirrors are driven by
    /// the wire, not the clock, and ignore ticks.
    pub fn tick(&mut self, delta_ms: f64) {
        match &mut self.driver {
            InstanceDriver::Local { bot } => {
                if let Some(brain) = bot {
                    brain.think(self.engine.as_mut());
                }
                self.engine.advance(delta_ms);
            }
            InstanceDriver::Remote => {}
        }
    }

    /// Full-state snapshot for the heartbeat.
    pub fn snapshot(&self) -> PlayerUpdate {
        PlayerUpdate {
            score: self.engine.score(),
            crashed: self.engine.crashed(),
            jumping: self.engine.jumping(),
            ducking: self.engine.ducking(),
            name: self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------
// Headless engine
// ---------------------------------------------------------------------

const BASE_SPEED: f64 = 0.3; // distance units per ms
const ACCELERATION: f64 = 0.000_005; // speed gain per ms
const JUMP_DURATION_MS: f64 = 450.0;
const MIN_OBSTACLE_GAP: f64 = 280.0;
const MAX_OBSTACLE_GAP: f64 = 650.0;

/// Deterministic engine with no rendering: a scrolling distance, a
/// seeded obstacle stream, and a jump that clears whatever it is over.
/// Stands in for the real runner in tests and terminal clients.
pub struct HeadlessRunner {
    rng: SeededRng,
    activated: bool,
    crashed: bool,
    distance: f64,
    speed: f64,
    next_obstacle: f64,
    jump_remaining_ms: f64,
    ducking: bool,
    score_override: Option<u32>,
}

impl HeadlessRunner {
    pub fn new(seed: u32) -> Self {
        let mut rng = SeededRng::new(seed);
        let first_gap = rng.next_range(MIN_OBSTACLE_GAP, MAX_OBSTACLE_GAP);
        Self {
            rng,
            activated: false,
            crashed: false,
            distance: 0.0,
            speed: BASE_SPEED,
            next_obstacle: first_gap,
            jump_remaining_ms: 0.0,
            ducking: false,
            score_override: None,
        }
    }
}

impl RunnerEngine for HeadlessRunner {
    fn activate(&mut self) {
        self.activated = true;
    }

    fn advance(&mut self, delta_ms: f64) {
        if !self.activated || self.crashed {
            return;
        }

        self.distance += self.speed * delta_ms;
        self.speed += ACCELERATION * delta_ms;

        if self.jump_remaining_ms > 0.0 {
            self.jump_remaining_ms = (self.jump_remaining_ms - delta_ms).max(0.0);
        }

        if self.distance >= self.next_obstacle {
            if self.jump_remaining_ms > 0.0 {
                // Cleared it; seed the next one from the shared stream.
                self.next_obstacle =
                    self.distance + self.rng.next_range(MIN_OBSTACLE_GAP, MAX_OBSTACLE_GAP);
            } else {
                self.crashed = true;
            }
        }
    }

    fn trigger_jump(&mut self) {
        if self.activated && !self.crashed && self.jump_remaining_ms <= 0.0 && !self.ducking {
            self.jump_remaining_ms = JUMP_DURATION_MS;
        }
    }

    fn trigger_duck(&mut self, ducking: bool) {
        if !self.crashed && self.jump_remaining_ms <= 0.0 {
            self.ducking = ducking;
        }
    }

    fn score(&self) -> u32 {
        self.score_override
            .unwrap_or_else(|| (self.distance / 10.0) as u32)
    }

    fn crashed(&self) -> bool {
        self.crashed
    }

    fn jumping(&self) -> bool {
        self.jump_remaining_ms > 0.0
    }

    fn ducking(&self) -> bool {
        self.ducking
    }

    fn nearest_obstacle_gap(&self) -> Option<f64> {
        if self.activated && !self.crashed {
            Some(self.next_obstacle - self.distance)
        } else {
            None
        }
    }

    fn set_crashed(&mut self, crashed: bool) {
        self.crashed = crashed;
    }

    fn set_score(&mut self, score: u32) {
        self.score_override = Some(score);
    }
}

/// Factory producing [`HeadlessRunner`] instances.
pub struct HeadlessFactory;

impl EngineFactory for HeadlessFactory {
    fn create(&self, _name: &str, seed: u32) -> Box<dyn RunnerEngine> {
        Box::new(HeadlessRunner::new(seed))
    }
}
