//! Entity identity, grid coordinates and component definitions.

mod components;
mod template;

pub use components::*;
pub use template::*;

use serde::{Deserialize, Serialize};

use crate::mechanics::Direction;

/// Unique identifier for all entities in the game.
///
/// Identifiers carry no data. The world hands them out from a counter that
/// only ever increases, so a destroyed id never aliases a later entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create an entity ID from a raw value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell on a single dungeon level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// L1 distance, the step count under 4-neighbor movement.
    pub fn manhattan(&self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// L-inf distance, the step count under 8-neighbor movement.
    pub fn chebyshev(&self, other: Point) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Shift by a raw offset.
    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// The neighboring cell in a direction.
    pub fn step(&self, direction: Direction) -> Point {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
