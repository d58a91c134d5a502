//! Local practice opponent
//!
//! A bot consumes the same line protocol a remote client would, keeps its own picture of
//! the board and answers every `tick` with a move that avoids the walls it knows about.

use crate::board::Bounds;
use crate::session::PlayerLink;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::{Move, Packet, PlayerId, Position};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct Bot {
    rng: StdRng,
    me: Option<PlayerId>,
    bounds: Bounds,
    heads: HashMap<PlayerId, Position>,
    trails: HashMap<PlayerId, Vec<Position>>,
    walls: HashSet<Position>,
    heading: Move,
}

impl Bot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            me: None,
            bounds: Bounds::full(0, 0),
            heads: HashMap::new(),
            trails: HashMap::new(),
            walls: HashSet::new(),
            heading: Move::default(),
        }
    }

    pub fn me(&self) -> Option<PlayerId> {
        self.me
    }

    /// Updates the bot's view. Returns a move when the server asks for one.
    pub fn observe(&mut self, packet: &Packet) -> Option<Move> {
        match packet {
            Packet::Game {
                width,
                height,
                player_id,
            } => {
                self.me = Some(*player_id);
                self.bounds = Bounds::full(*width, *height);
                self.heads.clear();
                self.trails.clear();
                self.walls.clear();
            }
            Packet::Limit { lower, upper } => {
                self.bounds = Bounds {
                    lower: *lower,
                    upper: *upper,
                };
            }
            Packet::Pos { id, pos } => {
                self.heads.insert(*id, *pos);
                self.trails.entry(*id).or_default().push(*pos);
                self.walls.insert(*pos);
            }
            Packet::Die { ids } => {
                for id in ids {
                    self.heads.remove(id);
                    for pos in self.trails.remove(id).unwrap_or_default() {
                        self.walls.remove(&pos);
                    }
                }
            }
            Packet::Tick => return Some(self.choose()),
            Packet::Player { .. } | Packet::Message { .. } | Packet::Win { .. } | Packet::Lose { .. } => {}
        }
        None
    }

    /// Picks a free neighbouring cell, preferring cells no opponent head can reach too.
    pub fn choose(&mut self) -> Move {
        let Some(head) = self.me.and_then(|me| self.heads.get(&me).copied()) else {
            return self.heading;
        };

        // Reversing always runs into the cell just left
        let mut candidates: Vec<Move> = Move::ALL
            .into_iter()
            .filter(|mv| *mv != self.heading.opposite())
            .collect();
        candidates.shuffle(&mut self.rng);
        // Favour going straight
        candidates.sort_by_key(|mv| *mv != self.heading);

        let contested: HashSet<Position> = self
            .heads
            .iter()
            .filter(|(id, _)| Some(**id) != self.me)
            .flat_map(|(_, pos)| Move::ALL.map(|mv| self.bounds.step(*pos, mv)))
            .collect();

        let free: Vec<Move> = candidates
            .into_iter()
            .filter(|mv| !self.walls.contains(&self.bounds.step(head, *mv)))
            .collect();

        let choice = free
            .iter()
            .copied()
            .find(|mv| !contested.contains(&self.bounds.step(head, *mv)))
            .or_else(|| free.first().copied())
            .unwrap_or(self.heading);
        self.heading = choice;
        choice
    }

    /// Plays until the match reports a result for this bot or the link closes.
    pub async fn play(mut self, mut link: PlayerLink) -> PlayerLink {
        while let Some(payload) = link.recv().await {
            for line in payload.lines() {
                let Ok(packet) = Packet::parse(line) else {
                    continue;
                };
                if matches!(packet, Packet::Win { .. } | Packet::Lose { .. }) {
                    debug!("Bot {:?} finished with {}", self.me, packet.kind());
                    return link;
                }
                if let Some(mv) = self.observe(&packet) {
                    link.submit_move(mv);
                }
            }
        }
        link
    }
}
