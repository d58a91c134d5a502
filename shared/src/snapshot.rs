//! Serializable view of a running match.
//!
//! The server hands this document to whatever replicates match state to spectators;
//! it is not part of the player line protocol.

use crate::{PlayerId, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub pos: Position,
    /// Every cell the player occupied this match, oldest first.
    pub moves: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub lower_limit: Position,
    pub upper_limit: Position,
    pub players: Vec<PlayerSnapshot>,
}

impl GameSnapshot {
    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    pub fn encode(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> bincode::Result<GameSnapshot> {
        bincode::deserialize(bytes)
    }
}
