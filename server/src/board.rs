//! Board arena and active play-area bounds
//!
//! The board is a flat `width * height` arena of cells, each either empty or owned by
//! one player. Only the match engine writes to it; players never hold references into
//! it, they only remember the positions they visited.
//!
//! The bounds are the rectangle movement currently wraps inside. They start as the
//! whole board and only ever tighten around the surviving players.

use log::debug;
use shared::{Move, PlayerId, Position};

/// Inclusive rectangle movement is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub lower: Position,
    pub upper: Position,
}

impl Bounds {
    /// Bounds covering a whole `width * height` board.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            lower: Position::new(0, 0),
            upper: Position::new(width.saturating_sub(1), height.saturating_sub(1)),
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        (self.lower.x..=self.upper.x).contains(&pos.x)
            && (self.lower.y..=self.upper.y).contains(&pos.y)
    }

    /// Moves one cell in `direction`, wrapping to the opposite bound on the same axis
    /// when stepping past the current edge.
    pub fn step(&self, pos: Position, direction: Move) -> Position {
        let Position { mut x, mut y } = pos;
        match direction {
            Move::Up => {
                if y <= self.lower.y {
                    y = self.upper.y
                } else {
                    y -= 1
                }
            }
            Move::Right => {
                if x >= self.upper.x {
                    x = self.lower.x
                } else {
                    x += 1
                }
            }
            Move::Down => {
                if y >= self.upper.y {
                    y = self.lower.y
                } else {
                    y += 1
                }
            }
            Move::Left => {
                if x <= self.lower.x {
                    x = self.upper.x
                } else {
                    x -= 1
                }
            }
        }
        Position { x, y }
    }

    /// Tightens the bounds towards the bounding box of `positions` while keeping `gap`
    /// cells of margin around it. A bound only moves if the candidate is strictly
    /// tighter than the current one. Returns true if any bound changed.
    pub fn shrink_around<I>(&mut self, positions: I, gap: u32) -> bool
    where
        I: IntoIterator<Item = Position>,
    {
        let mut positions = positions.into_iter();
        let Some(first) = positions.next() else {
            return false;
        };
        let (mut min, mut max) = (first, first);
        for pos in positions {
            min.x = min.x.min(pos.x);
            min.y = min.y.min(pos.y);
            max.x = max.x.max(pos.x);
            max.y = max.y.max(pos.y);
        }

        let before = *self;
        self.lower.x = tighter_lower(self.lower.x, min.x, gap);
        self.lower.y = tighter_lower(self.lower.y, min.y, gap);
        self.upper.x = tighter_upper(self.upper.x, max.x, gap);
        self.upper.y = tighter_upper(self.upper.y, max.y, gap);
        *self != before
    }
}

fn tighter_lower(current: u32, min: u32, gap: u32) -> u32 {
    match min.checked_sub(gap) {
        Some(candidate) if candidate > current => candidate,
        _ => current,
    }
}

fn tighter_upper(current: u32, max: u32, gap: u32) -> u32 {
    match max.checked_add(gap) {
        Some(candidate) if candidate < current => candidate,
        _ => current,
    }
}

/// Cell ownership arena.
#[derive(Debug, Clone)]
pub struct Board {
    width: u32,
    height: u32,
    cells: Vec<Option<PlayerId>>,
}

impl Board {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < self.width && pos.y < self.height {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Owner of the cell, `None` when empty or off the board.
    pub fn owner(&self, pos: Position) -> Option<PlayerId> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        self.owner(pos).is_none()
    }

    pub fn claim(&mut self, pos: Position, id: PlayerId) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = Some(id);
        }
    }

    /// Empties every cell of `trail` that `id` still owns. Returns how many were freed.
    pub fn release_trail(&mut self, id: PlayerId, trail: &[Position]) -> usize {
        let mut freed = 0;
        for &pos in trail {
            if let Some(i) = self.index(pos) {
                if self.cells[i] == Some(id) {
                    self.cells[i] = None;
                    freed += 1;
                }
            }
        }
        debug!("Released {} cells of player {}", freed, id);
        freed
    }

    /// Every owned cell with its owner.
    pub fn occupied(&self) -> impl Iterator<Item = (Position, PlayerId)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.map(|id| (Position::new((i % width) as u32, (i / width) as u32), id))
        })
    }
}
