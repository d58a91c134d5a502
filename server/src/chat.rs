//! Chat relay scoped to one match
//!
//! [`ChatRelay::subscribe`] takes a chat subscription on every living player and funnels
//! their messages into one channel the match loop drains between ticks. The relay owns the
//! forwarding tasks; dropping it tears every subscription down at once.

use crate::session::PlayerSession;
use log::debug;
use shared::PlayerId;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A chat message attributed to its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub from: PlayerId,
    pub text: String,
}

#[derive(Debug)]
pub struct ChatRelay {
    forwarders: Vec<JoinHandle<()>>,
}

impl ChatRelay {
    /// Subscribes to the chat of every living player. Must run inside a tokio runtime.
    pub fn subscribe(players: &[PlayerSession]) -> (ChatRelay, mpsc::UnboundedReceiver<ChatLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarders = players
            .iter()
            .filter(|player| player.is_alive())
            .map(|player| {
                let from = player.id;
                let mut chat = player.subscribe_chat();
                let tx = tx.clone();
                tokio::spawn(async move {
                    loop {
                        match chat.recv().await {
                            Ok(text) => {
                                if tx.send(ChatLine { from, text }).is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                debug!("Player {} chat lagged, {} messages lost", from, skipped);
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                })
            })
            .collect();
        (ChatRelay { forwarders }, rx)
    }

    pub fn subscriptions(&self) -> usize {
        self.forwarders.len()
    }
}

impl Drop for ChatRelay {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Move, Position};

    fn spawned(name: &str, id: PlayerId) -> (PlayerSession, crate::session::PlayerLink) {
        let (mut session, link) = PlayerSession::new(name);
        session.id = id;
        session.spawn(Position::new(0, 0), Move::Up);
        (session, link)
    }

    #[tokio::test]
    async fn test_relay_attributes_messages() {
        let (alice, alice_link) = spawned("alice", 0);
        let (bob, bob_link) = spawned("bob", 1);
        let players = vec![alice, bob];

        let (relay, mut lines) = ChatRelay::subscribe(&players);
        assert_eq!(relay.subscriptions(), 2);

        bob_link.chat("hi");
        alice_link.chat("hello");

        let mut received = vec![lines.recv().await.unwrap(), lines.recv().await.unwrap()];
        received.sort_by_key(|line| line.from);
        assert_eq!(
            received,
            vec![
                ChatLine {
                    from: 0,
                    text: "hello".to_string()
                },
                ChatLine {
                    from: 1,
                    text: "hi".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_dead_players_are_not_subscribed() {
        let (alice, _alice_link) = spawned("alice", 0);
        let (mut bob, _bob_link) = spawned("bob", 1);
        bob.kill();

        let (relay, _lines) = ChatRelay::subscribe(&[alice, bob]);
        assert_eq!(relay.subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_dropping_relay_ends_subscriptions() {
        let (alice, alice_link) = spawned("alice", 0);
        let players = vec![alice];

        let (relay, mut lines) = ChatRelay::subscribe(&players);
        drop(relay);

        alice_link.chat("anyone?");
        // Forwarders are gone, so the channel closes without delivering
        assert_eq!(lines.recv().await, None);
    }
}
