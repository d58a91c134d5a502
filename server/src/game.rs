//! Authoritative match simulation
//!
//! A [`Game`] owns everything one match mutates: the board arena, the active bounds, the
//! roster and the tick schedule. Nothing is shared between matches, so any number of
//! them can run side by side as independent tokio tasks.
//!
//! ## Tick
//!
//! 1. Players whose connection dropped die and their trails are cleared.
//! 2. Every living player, in ascending id order, reads one move intent and moves. New
//!    positions are computed from the positions at tick start and wrap at the current
//!    bounds.
//! 3. A second pass in the same order resolves occupancy against the board, which is
//!    updated as the pass goes, so an earlier claim is visible to later players:
//!    - empty cell: claimed, the player lives
//!    - owned by another player who now stands on it: both die
//!    - any other owned cell: the mover dies
//! 4. Trails of everyone who died are cleared, then `die` and `pos` lines go out as a
//!    single payload to every living player.
//! 5. The match ends when nobody is left (solo match) or at most one player is left.
//!    Otherwise players get `tick`, the bounds shrink if somebody died, and the next
//!    tick is scheduled at the current tick rate.

use crate::board::{Board, Bounds};
use crate::chat::{ChatLine, ChatRelay};
use crate::config::GameConfig;
use crate::rating::{MultiElo, RatingUpdater};
use crate::schedule::TickSchedule;
use crate::session::PlayerSession;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::{GameSnapshot, Packet, PlayerId, Position};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// What the caller should do after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Run the next tick after the delay.
    Continue(Duration),
    /// The match is over; these players won.
    Ended(Vec<PlayerId>),
}

/// Terminal notification, emitted once per match.
#[derive(Debug)]
pub struct MatchEnd {
    pub game_id: String,
    pub winners: Vec<PlayerId>,
    pub ticks: u64,
    /// The roster, with updated ratings and score history, in id order.
    pub players: Vec<PlayerSession>,
}

pub struct Game {
    id: String,
    width: u32,
    height: u32,
    bounds: Bounds,
    limit_gap: u32,
    board: Board,
    players: Vec<PlayerSession>,
    schedule: TickSchedule,
    rating: Box<dyn RatingUpdater>,
    ticks: u64,
    winners: Option<Vec<PlayerId>>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bounds", &self.bounds)
            .field("players", &self.players.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Game {
    /// Sets up a match for a non-empty roster and sends every player the opening packets.
    pub fn new(players: Vec<PlayerSession>, config: GameConfig) -> Self {
        Self::with_rating(players, config, Box::new(MultiElo::default()))
    }

    pub fn with_rating(
        mut players: Vec<PlayerSession>,
        config: GameConfig,
        rating: Box<dyn RatingUpdater>,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        if config.shuffle_players {
            players.shuffle(&mut rng);
        }

        let side = players.len() as u32 * 2 + 2;
        let mut game = Game {
            id: format!("{:08x}", rng.gen::<u32>()),
            width: side,
            height: side,
            bounds: Bounds::full(side, side),
            limit_gap: config.limit_gap,
            board: Board::new(side, side),
            players,
            schedule: TickSchedule::new(config.base_tick_rate, config.tick_increase_interval),
            rating,
            ticks: 0,
            winners: None,
        };

        game.initialize_players(&config);
        game.announce_start();
        info!(
            "Game {} started with {} players on a {}x{} board",
            game.id,
            game.players.len(),
            game.width,
            game.height
        );
        game
    }

    fn initialize_players(&mut self, config: &GameConfig) {
        for (i, player) in self.players.iter_mut().enumerate() {
            let spawn = Position::new(i as u32 * 2, i as u32 * 2);
            player.id = i;
            player.spawn(spawn, config.initial_move);
            self.board.claim(spawn, i);
        }
    }

    fn announce_start(&self) {
        for player in self.alive_players() {
            player.send(&Packet::Game {
                width: self.width,
                height: self.height,
                player_id: player.id,
            });
        }
        self.broadcast_limits();

        let roster: Vec<Packet> = self
            .alive_players()
            .map(|player| Packet::Player {
                id: player.id,
                name: player.name().to_string(),
            })
            .collect();
        self.raw_broadcast_to_alive(&Packet::join(&roster));
        self.raw_broadcast_to_alive(&Packet::join(&self.position_packets()));
        self.broadcast_to_alive(&Packet::Tick);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[PlayerSession] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSession> {
        self.players.get(id)
    }

    pub fn tick_rate(&self) -> u32 {
        self.schedule.rate()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_finished(&self) -> bool {
        self.winners.is_some()
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &PlayerSession> {
        self.players.iter().filter(|player| player.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            lower_limit: self.bounds.lower,
            upper_limit: self.bounds.upper,
            players: self.players.iter().map(PlayerSession::snapshot).collect(),
        }
    }

    pub fn broadcast_to_alive(&self, packet: &Packet) {
        for player in self.alive_players() {
            player.send(packet);
        }
    }

    pub fn raw_broadcast_to_alive(&self, payload: &str) {
        for player in self.alive_players() {
            player.raw_send(payload.to_string());
        }
    }

    fn broadcast_limits(&self) {
        self.broadcast_to_alive(&Packet::Limit {
            lower: self.bounds.lower,
            upper: self.bounds.upper,
        });
    }

    fn position_packets(&self) -> Vec<Packet> {
        self.alive_players()
            .map(|player| Packet::Pos {
                id: player.id,
                pos: player.pos(),
            })
            .collect()
    }

    /// Fans a chat message out to every living player.
    pub fn relay_chat(&self, line: ChatLine) {
        debug!("Game {}: player {} says {:?}", self.id, line.from, line.text);
        self.broadcast_to_alive(&Packet::Message {
            from: line.from,
            text: line.text,
        });
    }

    /// Runs one tick. Once the match has ended this does nothing and repeats the result.
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(winners) = &self.winners {
            return TickOutcome::Ended(winners.clone());
        }
        self.ticks += 1;
        let mut dead: Vec<PlayerId> = Vec::new();

        for player in self.players.iter_mut() {
            if player.is_alive() && !player.is_connected() {
                player.kill();
                self.board.release_trail(player.id, player.moves());
                info!("Game {}: player {} disconnected", self.id, player.id);
                dead.push(player.id);
            }
        }

        let mut targets: Vec<(PlayerId, Position)> = Vec::new();
        for player in self.players.iter_mut().filter(|p| p.is_alive()) {
            let direction = player.read_move();
            let target = self.bounds.step(player.pos(), direction);
            player.set_pos(target);
            targets.push((player.id, target));
        }

        for (id, target) in targets {
            // Already killed earlier in this pass by someone running into it
            if !self.players[id].is_alive() {
                continue;
            }
            match self.board.owner(target) {
                None => self.board.claim(target, id),
                Some(owner) if owner != id && self.players[owner].pos() == target => {
                    if self.players[owner].kill() {
                        dead.push(owner);
                    }
                    if self.players[id].kill() {
                        dead.push(id);
                    }
                    debug!(
                        "Game {}: players {} and {} collided at ({}, {})",
                        self.id, id, owner, target.x, target.y
                    );
                }
                Some(_) => {
                    if self.players[id].kill() {
                        dead.push(id);
                    }
                }
            }
        }

        for &id in &dead {
            let player = &mut self.players[id];
            self.board.release_trail(id, player.moves());
            player.lose();
        }
        if !dead.is_empty() {
            info!("Game {} tick {}: players {:?} died", self.id, self.ticks, dead);
        }

        let mut update = Vec::with_capacity(self.players.len() + 1);
        if !dead.is_empty() {
            update.push(Packet::Die { ids: dead.clone() });
        }
        update.extend(self.position_packets());
        self.raw_broadcast_to_alive(&Packet::join(&update));

        if self.should_end() {
            return TickOutcome::Ended(self.finish());
        }

        self.broadcast_to_alive(&Packet::Tick);
        if !dead.is_empty() {
            self.update_map_size();
        }

        let previous_rate = self.schedule.rate();
        let delay = self.schedule.advance();
        if self.schedule.rate() != previous_rate {
            debug!(
                "Game {}: tick rate {} -> {}",
                self.id,
                previous_rate,
                self.schedule.rate()
            );
        }
        TickOutcome::Continue(delay)
    }

    fn should_end(&self) -> bool {
        let alive = self.alive_count();
        if self.players.len() == 1 {
            alive == 0
        } else {
            alive <= 1
        }
    }

    /// Declares the survivors winners and settles ratings.
    fn finish(&mut self) -> Vec<PlayerId> {
        let winners: Vec<PlayerId> = self.alive_players().map(|p| p.id).collect();
        let losers: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| !p.is_alive())
            .map(|p| p.id)
            .collect();

        for &id in &winners {
            self.players[id].win();
        }

        if !winners.is_empty() && !losers.is_empty() {
            let ranked: Vec<PlayerId> = winners.iter().chain(&losers).copied().collect();
            let ratings_of = |ids: &[PlayerId]| -> Vec<f64> {
                ids.iter().map(|&id| self.players[id].rating).collect()
            };
            let updated = self
                .rating
                .update(&ratings_of(&winners), &ratings_of(&losers));
            if updated.len() == ranked.len() {
                for (id, rating) in ranked.into_iter().zip(updated) {
                    self.players[id].rating = rating;
                }
            } else {
                warn!(
                    "Game {}: rating update returned {} values for {} players",
                    self.id,
                    updated.len(),
                    ranked.len()
                );
            }
        }

        info!(
            "Game {} ended after {} ticks, winners {:?}",
            self.id, self.ticks, winners
        );
        self.winners = Some(winners.clone());
        winners
    }

    fn update_map_size(&mut self) {
        let alive: Vec<Position> = self.alive_players().map(PlayerSession::pos).collect();
        if self.bounds.shrink_around(alive, self.limit_gap) {
            info!(
                "Game {}: bounds now ({}, {})-({}, {})",
                self.id,
                self.bounds.lower.x,
                self.bounds.lower.y,
                self.bounds.upper.x,
                self.bounds.upper.y
            );
            self.broadcast_limits();
        }
    }

    /// Drives the match to completion. Chat is relayed between ticks; the next tick is
    /// only scheduled once the previous one has fully run.
    pub async fn run(mut self) -> MatchEnd {
        let (relay, mut chat) = ChatRelay::subscribe(&self.players);
        let mut delay = self.schedule.period();

        let winners = loop {
            let timer = sleep(delay);
            tokio::pin!(timer);
            loop {
                tokio::select! {
                    _ = &mut timer => break,
                    Some(line) = chat.recv() => self.relay_chat(line),
                }
            }

            match self.tick() {
                TickOutcome::Continue(next) => delay = next,
                TickOutcome::Ended(winners) => break winners,
            }
        };
        drop(relay);

        MatchEnd {
            game_id: self.id,
            winners,
            ticks: self.ticks,
            players: self.players,
        }
    }

    /// Runs the match on its own task and returns the channel its end is reported on.
    pub fn spawn(self) -> oneshot::Receiver<MatchEnd> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let end = self.run().await;
            let game_id = end.game_id.clone();
            if tx.send(end).is_err() {
                warn!("Game {} ended but nobody was waiting for it", game_id);
            }
        });
        rx
    }
}
