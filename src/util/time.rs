//! Time utilities shared by the server and session runtime

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Process start reference for monotonic millisecond readings
static PROCESS_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Monotonic wall-clock reading in milliseconds, suitable for feeding
/// [`crate::sim::SimClock::tick`]
pub fn monotonic_millis() -> f64 {
    let start = PROCESS_START.get_or_init(Instant::now);
    start.elapsed().as_secs_f64() * 1000.0
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
