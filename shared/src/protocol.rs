//! Line protocol spoken between the match server and its players.
//!
//! Every event is one ASCII line: the event kind, then its fields, separated by
//! [`DELIMITER`](crate::DELIMITER). Lines produced during the same tick are joined with
//! `\n` and flushed to a recipient as a single payload.

use crate::{Move, PlayerId, Position, DELIMITER};
use std::fmt;

/// Events the server sends to players.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Board dimensions and the recipient's own id, once per match.
    Game {
        width: u32,
        height: u32,
        player_id: PlayerId,
    },
    /// One roster entry.
    Player { id: PlayerId, name: String },
    /// Active bounds, both corners inclusive.
    Limit { lower: Position, upper: Position },
    Pos { id: PlayerId, pos: Position },
    /// Every player that died during one tick.
    Die { ids: Vec<PlayerId> },
    /// Chat relayed from `from`.
    Message { from: PlayerId, text: String },
    /// The server is ready for the next move intent.
    Tick,
    Win { wins: usize, losses: usize },
    Lose { wins: usize, losses: usize },
}

impl Packet {
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Game { .. } => "game",
            Packet::Player { .. } => "player",
            Packet::Limit { .. } => "limit",
            Packet::Pos { .. } => "pos",
            Packet::Die { .. } => "die",
            Packet::Message { .. } => "message",
            Packet::Tick => "tick",
            Packet::Win { .. } => "win",
            Packet::Lose { .. } => "lose",
        }
    }

    /// Encodes the packet as a single line without the trailing newline.
    pub fn encode(&self) -> String {
        let d = DELIMITER;
        match self {
            Packet::Game {
                width,
                height,
                player_id,
            } => format!("game{d}{width}{d}{height}{d}{player_id}"),
            Packet::Player { id, name } => format!("player{d}{id}{d}{}", single_line(name)),
            Packet::Limit { lower, upper } => format!(
                "limit{d}{}{d}{}{d}{}{d}{}",
                lower.x, lower.y, upper.x, upper.y
            ),
            Packet::Pos { id, pos } => format!("pos{d}{id}{d}{}{d}{}", pos.x, pos.y),
            Packet::Die { ids } => {
                let mut line = String::from("die");
                for id in ids {
                    line.push(d);
                    line.push_str(&id.to_string());
                }
                line
            }
            Packet::Message { from, text } => {
                format!("message{d}{from}{d}{}", single_line(text))
            }
            Packet::Tick => "tick".to_string(),
            Packet::Win { wins, losses } => format!("win{d}{wins}{d}{losses}"),
            Packet::Lose { wins, losses } => format!("lose{d}{wins}{d}{losses}"),
        }
    }

    /// Joins packets into one newline terminated payload.
    pub fn join(packets: &[Packet]) -> String {
        let mut payload = String::new();
        for packet in packets {
            payload.push_str(&packet.encode());
            payload.push('\n');
        }
        payload
    }

    /// Parses one line produced by [`Packet::encode`].
    pub fn parse(line: &str) -> Result<Packet, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (kind, rest) = match line.split_once(DELIMITER) {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (line, None),
        };

        match kind {
            "game" => {
                let [width, height, player_id] = fields::<3>("game", rest)?;
                Ok(Packet::Game {
                    width: number(width)?,
                    height: number(height)?,
                    player_id: number(player_id)?,
                })
            }
            "player" => {
                let (id, name) = pair("player", rest)?;
                Ok(Packet::Player {
                    id: number(id)?,
                    name: name.to_string(),
                })
            }
            "limit" => {
                let [lx, ly, ux, uy] = fields::<4>("limit", rest)?;
                Ok(Packet::Limit {
                    lower: Position::new(number(lx)?, number(ly)?),
                    upper: Position::new(number(ux)?, number(uy)?),
                })
            }
            "pos" => {
                let [id, x, y] = fields::<3>("pos", rest)?;
                Ok(Packet::Pos {
                    id: number(id)?,
                    pos: Position::new(number(x)?, number(y)?),
                })
            }
            "die" => {
                let rest = rest.ok_or(ProtocolError::MissingField("die"))?;
                let ids = rest
                    .split(DELIMITER)
                    .map(number::<PlayerId>)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Packet::Die { ids })
            }
            "message" => {
                let (from, text) = pair("message", rest)?;
                Ok(Packet::Message {
                    from: number(from)?,
                    text: text.to_string(),
                })
            }
            "tick" => Ok(Packet::Tick),
            "win" => {
                let [wins, losses] = fields::<2>("win", rest)?;
                Ok(Packet::Win {
                    wins: number(wins)?,
                    losses: number(losses)?,
                })
            }
            "lose" => {
                let [wins, losses] = fields::<2>("lose", rest)?;
                Ok(Packet::Lose {
                    wins: number(wins)?,
                    losses: number(losses)?,
                })
            }
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Lines a player sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    Move(Move),
    Chat(String),
}

impl ClientPacket {
    pub fn parse(line: &str) -> Result<ClientPacket, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.split_once(DELIMITER) {
            Some(("move", direction)) => Ok(ClientPacket::Move(direction.parse()?)),
            Some(("chat", text)) if !text.is_empty() => Ok(ClientPacket::Chat(text.to_string())),
            Some(("chat", _)) => Err(ProtocolError::MissingField("chat")),
            Some((kind, _)) => Err(ProtocolError::UnknownKind(kind.to_string())),
            None => Err(ProtocolError::UnknownKind(line.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ClientPacket::Move(mv) => format!("move{DELIMITER}{mv}"),
            ClientPacket::Chat(text) => format!("chat{DELIMITER}{}", single_line(text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownKind(String),
    MissingField(&'static str),
    InvalidNumber(String),
    InvalidMove(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownKind(kind) => write!(f, "unknown packet kind '{}'", kind),
            ProtocolError::MissingField(kind) => write!(f, "missing field in '{}' packet", kind),
            ProtocolError::InvalidNumber(raw) => write!(f, "invalid number '{}'", raw),
            ProtocolError::InvalidMove(raw) => write!(f, "invalid move '{}'", raw),
        }
    }
}

impl std::error::Error for ProtocolError {}

// Free text must not break line framing.
fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

fn number<T: std::str::FromStr>(raw: &str) -> Result<T, ProtocolError> {
    raw.parse()
        .map_err(|_| ProtocolError::InvalidNumber(raw.to_string()))
}

fn fields<'a, const N: usize>(
    kind: &'static str,
    rest: Option<&'a str>,
) -> Result<[&'a str; N], ProtocolError> {
    let rest = rest.ok_or(ProtocolError::MissingField(kind))?;
    let mut out = [""; N];
    let mut parts = rest.split(DELIMITER);
    for slot in out.iter_mut() {
        *slot = parts.next().ok_or(ProtocolError::MissingField(kind))?;
    }
    Ok(out)
}

// Id followed by free text, which may itself contain the delimiter.
fn pair<'a>(kind: &'static str, rest: Option<&'a str>) -> Result<(&'a str, &'a str), ProtocolError> {
    rest.and_then(|rest| rest.split_once(DELIMITER))
        .ok_or(ProtocolError::MissingField(kind))
}

/// Splits a flushed payload back into packets, skipping blank lines.
pub fn parse_payload(payload: &str) -> Result<Vec<Packet>, ProtocolError> {
    payload
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Packet::parse)
        .collect()
}
