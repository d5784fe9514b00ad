//! Server configuration.
//!
//! Defaults: 10-minute clocks, a 100-entry chat log and a 30-second
//! teardown grace for finished rooms; each knob can be overridden through
//! a `CHESSROOM_*` environment variable.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Per-side clock budget handed out by `start()`.
    pub initial_clock_secs: u64,
    /// Bounded chat log size; oldest entries are evicted.
    pub chat_capacity: usize,
    /// How long a finished room lingers before teardown.
    pub finished_grace: Duration,
    /// Cadence of the in-actor flag-fall sweep while a clock is running.
    pub flag_sweep_interval: Duration,
    /// Rule toggles passed through to the engine.
    pub rules: chess::Rules,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            initial_clock_secs: 10 * 60,
            chat_capacity: 100,
            finished_grace: Duration::from_secs(30),
            flag_sweep_interval: Duration::from_secs(1),
            rules: chess::Rules::default(),
        }
    }
}

impl RoomConfig {
    /// Defaults with environment overrides. Unparseable values fall back to
    /// the default rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_u64("CHESSROOM_CLOCK_SECS") {
            config.initial_clock_secs = secs;
        }
        if let Some(cap) = env_u64("CHESSROOM_CHAT_CAPACITY") {
            config.chat_capacity = cap as usize;
        }
        if let Some(secs) = env_u64("CHESSROOM_FINISHED_GRACE_SECS") {
            config.finished_grace = Duration::from_secs(secs);
        }
        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}
