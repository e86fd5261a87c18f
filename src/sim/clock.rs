//! Shared simulation clock.
//!
//! Every locally hosted instance in a session (the player, local bots,
//! remote mirrors) advances by the same clamped delta per tick, so
//! co-located runners cannot drift apart even when the host stalls
//! (background tab, GC pause). Timestamps are wall-clock milliseconds
//! supplied by the caller, which keeps the clock fully testable.

/// Default maximum delta per tick, in milliseconds.
pub const DEFAULT_DELTA_CLAMP_MS: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct SimClock {
    sim_time: f64,
    last_wall_time: f64,
    delta_clamp: f64,
    paused: bool,
    paused_at: f64,
}

impl SimClock {
    pub fn new(delta_clamp_ms: f64) -> Self {
        Self {
            sim_time: 0.0,
            last_wall_time: 0.0,
            delta_clamp: delta_clamp_ms,
            paused: false,
            paused_at: 0.0,
        }
    }

    /// Zero accumulated simulation time and anchor to `now_ms`.
    pub fn start(&mut self, now_ms: f64) {
        self.sim_time = 0.0;
        self.last_wall_time = now_ms;
        self.paused = false;
    }

    /// Advance simulation time and return the clamped delta.
    ///
    /// Returns 0 while paused. A wall-clock jump of any size surfaces as
    /// at most `delta_clamp` of simulated time.
    pub fn tick(&mut self, now_ms: f64) -> f64 {
        if self.paused {
            return 0.0;
        }

        let raw_delta = now_ms - self.last_wall_time;
        let clamped = raw_delta.min(self.delta_clamp).max(0.0);

        self.sim_time += clamped;
        self.last_wall_time = now_ms;

        clamped
    }

    pub fn pause(&mut self, now_ms: f64) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.paused_at = now_ms;
    }

    /// Unfreeze accumulation. Re-anchors the wall-clock reference so the
    /// paused interval never shows up as a delta spike.
    pub fn resume(&mut self, now_ms: f64) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.last_wall_time = now_ms;
    }

    pub fn reset(&mut self) {
        self.sim_time = 0.0;
        self.last_wall_time = 0.0;
        self.paused = false;
    }

    /// Accumulated simulation time in milliseconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_DELTA_CLAMP_MS)
    }
}
