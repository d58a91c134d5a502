//! # Match Server Library
//!
//! Authoritative engine for a grid elimination game. Players move one cell per tick and
//! leave a permanent trail; running into any trail, including one's own, or into another
//! player is fatal. The last player standing wins.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! One [`game::Game`] per match. It owns the board, the bounds, the roster and the tick
//! schedule, runs the tick loop on a single task, and reports the winners exactly once
//! through [`game::MatchEnd`].
//!
//! ### Board Module (`board`)
//! The cell ownership arena and the shrinking play-area bounds with wrap-around movement.
//!
//! ### Session Module (`session`)
//! [`session::PlayerSession`] is the engine's view of a participant;
//! [`session::PlayerLink`] is the connection-side handle that submits intents and chat and
//! receives outbound lines in order.
//!
//! ### Rating, Chat and Schedule Modules
//! Multi-player Elo applied at match end, the match-scoped chat relay, and the tick-rate
//! step function.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::game::Game;
//! use server::session::PlayerSession;
//! use shared::Move;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (alice, alice_link) = PlayerSession::new("alice");
//!     let (bob, bob_link) = PlayerSession::new("bob");
//!
//!     let ended = Game::new(vec![alice, bob], GameConfig::default()).spawn();
//!
//!     // A connection task forwards client input through the links
//!     alice_link.submit_move(Move::Right);
//!     bob_link.handle_line("move|left");
//!
//!     let end = ended.await.expect("match task panicked");
//!     println!("winners: {:?}", end.winners);
//! }
//! ```
//!
//! ## Concurrency
//!
//! A match is a single task: each tick runs to completion before the next one is
//! scheduled, so the board and the roster have exactly one writer. Move intents and
//! disconnects arrive from other tasks through the per-player link and are sampled once
//! at the start of each tick.

pub mod board;
pub mod bot;
pub mod chat;
pub mod config;
pub mod game;
pub mod rating;
pub mod schedule;
pub mod session;
