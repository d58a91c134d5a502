//! Player sessions and the connection handles that feed them
//!
//! A participant is split in two halves:
//! - [`PlayerSession`] is owned by the match engine. It carries the per-match state the
//!   engine reads (position, trail, alive flag, rating) and the capabilities the engine
//!   uses (read one move intent, send lines, subscribe to chat).
//! - [`PlayerLink`] is held by whatever owns the network connection. It submits move
//!   intents and chat, observes outbound payloads in send order, and flags disconnects.
//!
//! The move intent slot is a single-value `watch` channel: intents arriving between two
//! ticks overwrite each other and the engine reads whatever is current once per tick.
//! When nothing new arrived the player keeps going in the previous direction.

use log::debug;
use shared::{ClientPacket, Move, Packet, PlayerId, PlayerSnapshot, Position, INITIAL_RATING};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{broadcast, mpsc, watch};

const CHAT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreType {
    Lose,
    Win,
}

/// One finished match in a player's history.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    pub kind: ScoreType,
    pub time: SystemTime,
}

/// Engine-side half of a participant.
#[derive(Debug)]
pub struct PlayerSession {
    /// Dense per-match id, assigned by the engine at match start.
    pub id: PlayerId,
    name: String,
    pos: Position,
    moves: Vec<Position>,
    alive: bool,
    /// Read and written by the engine only when a match ends.
    pub rating: f64,
    scores: Vec<Score>,
    current_move: Move,
    intents: watch::Receiver<Move>,
    connected: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
    chat: broadcast::Sender<String>,
}

/// Connection-side half of a participant.
#[derive(Debug)]
pub struct PlayerLink {
    intents: watch::Sender<Move>,
    connected: Arc<AtomicBool>,
    chat: broadcast::Sender<String>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl PlayerSession {
    /// Creates a connected participant with the default starting rating.
    pub fn new(name: impl Into<String>) -> (PlayerSession, PlayerLink) {
        Self::with_rating(name, INITIAL_RATING)
    }

    pub fn with_rating(name: impl Into<String>, rating: f64) -> (PlayerSession, PlayerLink) {
        let (intent_tx, intent_rx) = watch::channel(Move::default());
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (chat_tx, _) = broadcast::channel(CHAT_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));

        let session = PlayerSession {
            id: 0,
            name: name.into(),
            pos: Position::default(),
            moves: Vec::new(),
            alive: false,
            rating,
            scores: Vec::new(),
            current_move: Move::default(),
            intents: intent_rx,
            connected: Arc::clone(&connected),
            outbound: outbound_tx,
            chat: chat_tx.clone(),
        };
        let link = PlayerLink {
            intents: intent_tx,
            connected,
            chat: chat_tx,
            outbound: outbound_rx,
        };
        (session, link)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Every cell occupied this match, oldest first.
    pub fn moves(&self) -> &[Position] {
        &self.moves
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Places the player on its spawn cell, clears the trail and forgets any intent
    /// left over from before the match.
    pub fn spawn(&mut self, pos: Position, direction: Move) {
        self.pos = pos;
        self.moves.clear();
        self.moves.push(pos);
        self.alive = true;
        self.current_move = direction;
        let _ = self.intents.borrow_and_update();
    }

    /// Consumes the buffered intent, falling back to the previous direction.
    pub fn read_move(&mut self) -> Move {
        if self.intents.has_changed().unwrap_or(false) {
            self.current_move = *self.intents.borrow_and_update();
        }
        self.current_move
    }

    /// Moves the head and appends the cell to the trail.
    pub fn set_pos(&mut self, pos: Position) {
        self.pos = pos;
        self.moves.push(pos);
    }

    /// Marks the player dead. Returns true only on the alive to dead transition.
    pub fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    pub fn win(&mut self) {
        self.record(ScoreType::Win);
        self.send(&Packet::Win {
            wins: self.wins(),
            losses: self.losses(),
        });
    }

    pub fn lose(&mut self) {
        self.record(ScoreType::Lose);
        self.send(&Packet::Lose {
            wins: self.wins(),
            losses: self.losses(),
        });
    }

    fn record(&mut self, kind: ScoreType) {
        self.scores.push(Score {
            kind,
            time: SystemTime::now(),
        });
    }

    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    pub fn wins(&self) -> usize {
        self.scores.iter().filter(|s| s.kind == ScoreType::Win).count()
    }

    pub fn losses(&self) -> usize {
        self.scores.iter().filter(|s| s.kind == ScoreType::Lose).count()
    }

    pub fn send(&self, packet: &Packet) {
        let mut line = packet.encode();
        line.push('\n');
        if self.outbound.send(line).is_err() {
            debug!(
                "Dropping {} line for player {}: link closed",
                packet.kind(),
                self.id
            );
        }
    }

    /// Queues an already framed payload. Delivery is not retried.
    pub fn raw_send(&self, payload: String) {
        if payload.is_empty() {
            return;
        }
        if self.outbound.send(payload).is_err() {
            debug!("Dropping payload for player {}: link closed", self.id);
        }
    }

    /// Starts receiving this player's chat. The subscription ends when the receiver drops.
    pub fn subscribe_chat(&self) -> broadcast::Receiver<String> {
        self.chat.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            alive: self.alive,
            pos: self.pos,
            moves: self.moves.clone(),
        }
    }
}

impl PlayerLink {
    /// Replaces the buffered intent.
    pub fn submit_move(&self, direction: Move) {
        self.intents.send_replace(direction);
    }

    pub fn chat(&self, text: impl Into<String>) {
        // No subscribers outside a match
        let _ = self.chat.send(text.into());
    }

    /// Applies one inbound protocol line. Lines that do not parse are ignored.
    pub fn handle_line(&self, line: &str) {
        match ClientPacket::parse(line) {
            Ok(ClientPacket::Move(direction)) => self.submit_move(direction),
            Ok(ClientPacket::Chat(text)) => self.chat(text),
            Err(e) => debug!("Ignoring client line {:?}: {}", line, e),
        }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Waits for the next outbound payload.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    /// Takes every queued payload and decodes its lines, in send order.
    pub fn drain_packets(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Some(payload) = self.try_recv() {
            packets.extend(payload.lines().filter_map(|line| Packet::parse(line).ok()));
        }
        packets
    }
}

impl Drop for PlayerLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let (session, link) = PlayerSession::new("alice");
        assert_eq!(session.name(), "alice");
        assert_eq!(session.rating, INITIAL_RATING);
        assert!(!session.is_alive());
        assert!(session.is_connected());
        assert!(link.is_connected());
        assert!(session.moves().is_empty());
    }

    #[test]
    fn test_spawn_resets_trail() {
        let (mut session, _link) = PlayerSession::new("alice");
        session.spawn(Position::new(4, 4), Move::Up);
        session.set_pos(Position::new(4, 3));
        session.spawn(Position::new(2, 2), Move::Left);

        assert!(session.is_alive());
        assert_eq!(session.pos(), Position::new(2, 2));
        assert_eq!(session.moves(), &[Position::new(2, 2)]);
        assert_eq!(session.read_move(), Move::Left);
    }

    #[test]
    fn test_read_move_defaults_to_previous_direction() {
        let (mut session, link) = PlayerSession::new("alice");
        session.spawn(Position::new(0, 0), Move::Up);
        assert_eq!(session.read_move(), Move::Up);

        link.submit_move(Move::Right);
        assert_eq!(session.read_move(), Move::Right);
        // Nothing new: keep going right
        assert_eq!(session.read_move(), Move::Right);
    }

    #[test]
    fn test_last_intent_wins() {
        let (mut session, link) = PlayerSession::new("alice");
        session.spawn(Position::new(0, 0), Move::Up);
        link.submit_move(Move::Left);
        link.submit_move(Move::Down);
        link.submit_move(Move::Right);
        assert_eq!(session.read_move(), Move::Right);
    }

    #[test]
    fn test_spawn_discards_stale_intent() {
        let (mut session, link) = PlayerSession::new("alice");
        link.submit_move(Move::Left);
        session.spawn(Position::new(0, 0), Move::Up);
        assert_eq!(session.read_move(), Move::Up);
    }

    #[test]
    fn test_malformed_lines_are_ignored() {
        let (mut session, link) = PlayerSession::new("alice");
        session.spawn(Position::new(0, 0), Move::Down);
        link.handle_line("move|sideways");
        link.handle_line("garbage");
        assert_eq!(session.read_move(), Move::Down);

        link.handle_line("move|left");
        assert_eq!(session.read_move(), Move::Left);
    }

    #[test]
    fn test_set_pos_appends_trail() {
        let (mut session, _link) = PlayerSession::new("alice");
        session.spawn(Position::new(1, 1), Move::Up);
        session.set_pos(Position::new(1, 0));
        assert_eq!(session.pos(), Position::new(1, 0));
        assert_eq!(session.moves(), &[Position::new(1, 1), Position::new(1, 0)]);
    }

    #[test]
    fn test_kill_is_one_way() {
        let (mut session, _link) = PlayerSession::new("alice");
        session.spawn(Position::new(0, 0), Move::Up);
        assert!(session.kill());
        assert!(!session.kill());
        assert!(!session.is_alive());
    }

    #[test]
    fn test_dropping_link_disconnects() {
        let (session, link) = PlayerSession::new("alice");
        drop(link);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_explicit_disconnect() {
        let (session, link) = PlayerSession::new("alice");
        link.disconnect();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_send_preserves_order() {
        let (session, mut link) = PlayerSession::new("alice");
        session.send(&Packet::Tick);
        session.raw_send("pos|0|1|2\n".to_string());
        session.send(&Packet::Die { ids: vec![1] });

        assert_eq!(link.try_recv().as_deref(), Some("tick\n"));
        assert_eq!(link.try_recv().as_deref(), Some("pos|0|1|2\n"));
        assert_eq!(link.try_recv().as_deref(), Some("die|1\n"));
        assert_eq!(link.try_recv(), None);
    }

    #[test]
    fn test_send_after_link_dropped_is_silent() {
        let (session, link) = PlayerSession::new("alice");
        drop(link);
        session.send(&Packet::Tick);
    }

    #[test]
    fn test_win_and_lose_bookkeeping() {
        let (mut session, mut link) = PlayerSession::new("alice");
        session.lose();
        session.win();
        session.win();

        assert_eq!(session.wins(), 2);
        assert_eq!(session.losses(), 1);
        assert_eq!(session.scores().len(), 3);
        assert_eq!(
            link.drain_packets(),
            vec![
                Packet::Lose { wins: 0, losses: 1 },
                Packet::Win { wins: 1, losses: 1 },
                Packet::Win { wins: 2, losses: 1 },
            ]
        );
    }

    #[test]
    fn test_chat_reaches_subscribers() {
        let (session, link) = PlayerSession::new("alice");
        let mut chat = session.subscribe_chat();
        link.handle_line("chat|hello");
        assert_eq!(chat.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_chat_without_subscribers_is_dropped() {
        let (session, link) = PlayerSession::new("alice");
        link.chat("nobody listens");
        let mut chat = session.subscribe_chat();
        assert!(chat.try_recv().is_err());
    }

    #[test]
    fn test_snapshot() {
        let (mut session, _link) = PlayerSession::new("alice");
        session.id = 3;
        session.spawn(Position::new(6, 6), Move::Up);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.id, 3);
        assert!(snapshot.alive);
        assert_eq!(snapshot.moves, vec![Position::new(6, 6)]);
    }

    #[test]
    fn test_recv_ends_with_session() {
        let (session, mut link) = PlayerSession::new("alice");
        session.send(&Packet::Tick);
        assert_eq!(tokio_test::block_on(link.recv()).as_deref(), Some("tick\n"));
        drop(session);
        assert_eq!(tokio_test::block_on(link.recv()), None);
    }
}
