use shared::{Move, BASE_TICK_RATE, LIMIT_GAP, TICK_INCREASE_INTERVAL_SECS};
use std::time::Duration;

/// Tunables for one match.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Ticks per second at match start.
    pub base_tick_rate: u32,
    /// Match time after which the tick rate grows by one.
    pub tick_increase_interval: Duration,
    /// Empty margin kept around the living players when the bounds shrink.
    pub limit_gap: u32,
    /// Direction every player heads in until it sends an intent.
    pub initial_move: Move,
    /// Shuffle the roster before ids are assigned.
    pub shuffle_players: bool,
    /// Seed for the shuffle and the match id. Random when unset.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_tick_rate: BASE_TICK_RATE,
            tick_increase_interval: Duration::from_secs(TICK_INCREASE_INTERVAL_SECS),
            limit_gap: LIMIT_GAP,
            initial_move: Move::Up,
            shuffle_players: true,
            seed: None,
        }
    }
}
