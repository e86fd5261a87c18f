//! Seeded deterministic random number generator (Mulberry32 mixing).
//!
//! Every client in a session derives its obstacle stream from the same
//! session seed, so the output sequence must be a pure function of the
//! seed and the call count — nothing else.

/// Deterministic 32-bit generator with a single word of state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next integer in [0, 2^32).
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next float in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    /// Next float in [min, max).
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Random boolean that is `true` with probability `p`.
    pub fn next_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Derive an independent child generator seeded from this stream.
    ///
    /// Consumes one draw from the parent, so sibling forks with distinct
    /// offsets get distinct streams while the shared obstacle stream of
    /// engines seeded directly from the session seed is untouched.
    pub fn fork(&mut self, offset: u32) -> SeededRng {
        SeededRng::new(self.next_u32().wrapping_add(offset))
    }

    /// Current state, for debugging and replay capture.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restore a previously captured state.
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }
}
