//! Wire vocabulary shared by the match server and anything that talks to it.
//!
//! The server streams newline separated, pipe delimited text lines (see [`protocol`]);
//! clients answer with move intents and chat lines. Both sides agree on the types here.

pub mod protocol;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use protocol::{ClientPacket, Packet, ProtocolError};
pub use snapshot::{GameSnapshot, PlayerSnapshot};

/// Ticks per second at match start.
pub const BASE_TICK_RATE: u32 = 1;
/// Seconds of match time after which the tick rate grows by one.
pub const TICK_INCREASE_INTERVAL_SECS: u64 = 10;
/// Empty margin kept between the living players and the active bounds.
pub const LIMIT_GAP: u32 = 1;
/// Rating every new session starts with.
pub const INITIAL_RATING: f64 = 1000.0;

/// Field separator inside a protocol line.
pub const DELIMITER: char = '|';

/// Dense per-match player identifier in `[0, n)`.
pub type PlayerId = usize;

/// A cell on the board. `y` grows downwards, so `Up` decrements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// One step of movement requested by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Move {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Right, Move::Down, Move::Left];

    pub fn as_str(&self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Right => "right",
            Move::Down => "down",
            Move::Left => "left",
        }
    }

    pub fn opposite(&self) -> Move {
        match self {
            Move::Up => Move::Down,
            Move::Right => Move::Left,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Move::Up),
            "right" => Ok(Move::Right),
            "down" => Ok(Move::Down),
            "left" => Ok(Move::Left),
            other => Err(ProtocolError::InvalidMove(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_parse() {
        assert_eq!("up".parse::<Move>().unwrap(), Move::Up);
        assert_eq!("left".parse::<Move>().unwrap(), Move::Left);
        assert!("UP".parse::<Move>().is_err());
        assert!("".parse::<Move>().is_err());
    }

    #[test]
    fn test_move_display_matches_parse() {
        for mv in Move::ALL {
            assert_eq!(mv.to_string().parse::<Move>().unwrap(), mv);
        }
    }

    #[test]
    fn test_move_opposite() {
        for mv in Move::ALL {
            assert_ne!(mv.opposite(), mv);
            assert_eq!(mv.opposite().opposite(), mv);
        }
    }

    #[test]
    fn test_default_move_is_up() {
        assert_eq!(Move::default(), Move::Up);
    }
}
