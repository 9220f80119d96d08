//! Time utilities for the simulation clock

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
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

/// Length of one simulation "unit" of time: a 60 Hz frame
pub const FRAME_MILLIS: f32 = 1000.0 / 60.0;

/// Largest step the world will integrate in one update
pub const MAX_DELTA_UNITS: f32 = 10.0;

/// Convert a wall-clock step into frame units (1.0 == one 60 Hz frame).
///
/// The result is not clamped; `World::update` owns the clamping so that
/// out-of-range values get logged in one place.
pub fn delta_units(elapsed: Duration) -> f32 {
    elapsed.as_secs_f32() * 1000.0 / FRAME_MILLIS
}

/// Clamp a raw step into `[0, MAX_DELTA_UNITS]`. NaN collapses to zero.
pub fn clamp_delta(raw: f32) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, MAX_DELTA_UNITS)
}
