//! Deterministic simulation primitives shared by every game instance
//! in a session: the seeded sequence generator and the simulation clock.

pub mod clock;
pub mod rng;

pub use clock::{SimClock, DEFAULT_DELTA_CLAMP_MS};
pub use rng::SeededRng;
