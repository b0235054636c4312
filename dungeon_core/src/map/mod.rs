//! Tile grid of the current dungeon level.

mod generator;

pub use generator::*;

use dungeon_rules::Point;
use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// Terrain kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Wall,
    Floor,
    /// Closed door: blocks movement and sight.
    Door,
    StairsDown,
    Water,
}

impl TileKind {
    pub fn is_walkable(&self) -> bool {
        matches!(
            self,
            TileKind::Floor | TileKind::StairsDown | TileKind::Water
        )
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, TileKind::Wall | TileKind::Door)
    }

    /// Single-character glyph, used by [`DungeonMap::from_ascii`].
    pub fn glyph(&self) -> char {
        match self {
            TileKind::Wall => '#',
            TileKind::Floor => '.',
            TileKind::Door => '+',
            TileKind::StairsDown => '>',
            TileKind::Water => '~',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(TileKind::Wall),
            '.' => Some(TileKind::Floor),
            '+' => Some(TileKind::Door),
            '>' => Some(TileKind::StairsDown),
            '~' => Some(TileKind::Water),
            _ => None,
        }
    }
}

/// A rectangular level.
///
/// Cells outside the rectangle are treated as solid, opaque rock. Every
/// change to a tile bumps [`revision`](Self::revision).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonMap {
    width: i32,
    height: i32,
    depth: i32,
    tiles: Vec<TileKind>,
    revision: u64,
}

impl DungeonMap {
    /// A level filled with walls.
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        Self::filled(width, height, depth, TileKind::Wall)
    }

    /// A level filled with floor.
    pub fn open(width: i32, height: i32, depth: i32) -> Self {
        Self::filled(width, height, depth, TileKind::Floor)
    }

    fn filled(width: i32, height: i32, depth: i32, kind: TileKind) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            depth,
            tiles: vec![kind; (width * height) as usize],
            revision: 0,
        }
    }

    /// Build a level from rows of glyphs (`#`, `.`, `+`, `>`, `~`).
    pub fn from_ascii(rows: &[&str], depth: i32) -> Result<Self, MapError> {
        let height = rows.len() as i32;
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0) as i32;
        let mut map = Self::new(width, height, depth);

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as i32 != width {
                return Err(MapError::RaggedRow { row: y });
            }
            for (x, glyph) in row.chars().enumerate() {
                let kind =
                    TileKind::from_glyph(glyph).ok_or(MapError::UnknownGlyph { glyph, x, y })?;
                let idx = y * width as usize + x;
                map.tiles[idx] = kind;
            }
        }
        Ok(map)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// The `z` this level sits at.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Counter bumped on every tile change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Continue the revision count of the level this one replaces, so an
    /// observer cache from the old level can never match the new one.
    pub fn follow_revision(&mut self, previous: u64) {
        self.revision = self.revision.max(previous + 1);
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    fn index(&self, p: Point) -> Option<usize> {
        self.in_bounds(p)
            .then(|| (p.y * self.width + p.x) as usize)
    }

    /// The tile at `p`, or `None` outside the level.
    pub fn tile(&self, p: Point) -> Option<TileKind> {
        self.index(p).map(|i| self.tiles[i])
    }

    /// Replace the tile at `p`. Returns `false` if `p` is out of bounds.
    pub fn set_tile(&mut self, p: Point, kind: TileKind) -> bool {
        let Some(i) = self.index(p) else {
            return false;
        };
        if self.tiles[i] != kind {
            self.tiles[i] = kind;
            self.revision += 1;
        }
        true
    }

    pub fn is_walkable(&self, p: Point) -> bool {
        self.tile(p).map(|t| t.is_walkable()).unwrap_or(false)
    }

    pub fn is_opaque(&self, p: Point) -> bool {
        self.tile(p).map(|t| t.is_opaque()).unwrap_or(true)
    }

    /// Every cell of the given kind, row by row.
    pub fn find_all(&self, kind: TileKind) -> Vec<Point> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == kind)
            .map(|(i, _)| Point::new(i as i32 % self.width, i as i32 / self.width))
            .collect()
    }

    /// Render back to glyph rows.
    pub fn to_ascii(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.tiles[(y * self.width + x) as usize].glyph())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_flags() {
        assert!(!TileKind::Wall.is_walkable());
        assert!(TileKind::Wall.is_opaque());
        assert!(!TileKind::Door.is_walkable());
        assert!(TileKind::Door.is_opaque());
        assert!(TileKind::StairsDown.is_walkable());
        assert!(TileKind::Water.is_walkable());
        assert!(!TileKind::Water.is_opaque());
    }

    #[test]
    fn test_from_ascii() {
        let map = DungeonMap::from_ascii(&["#####", "#.>~#", "#####"], 2).unwrap();
        assert_eq!(map.width(), 5);
        assert_eq!(map.height(), 3);
        assert_eq!(map.depth(), 2);
        assert_eq!(map.tile(Point::new(2, 1)), Some(TileKind::StairsDown));
        assert!(map.is_walkable(Point::new(1, 1)));
        assert!(!map.is_walkable(Point::new(0, 1)));
        assert_eq!(map.find_all(TileKind::StairsDown), vec![Point::new(2, 1)]);
        assert_eq!(map.to_ascii()[1], "#.>~#");
    }

    #[test]
    fn test_from_ascii_errors() {
        assert_eq!(
            DungeonMap::from_ascii(&["###", "##"], 0),
            Err(MapError::RaggedRow { row: 1 })
        );
        assert_eq!(
            DungeonMap::from_ascii(&["#?#"], 0),
            Err(MapError::UnknownGlyph {
                glyph: '?',
                x: 1,
                y: 0
            })
        );
    }

    #[test]
    fn test_out_of_bounds_is_solid() {
        let map = DungeonMap::open(3, 3, 0);
        assert!(!map.in_bounds(Point::new(-1, 0)));
        assert!(!map.is_walkable(Point::new(3, 0)));
        assert!(map.is_opaque(Point::new(0, 3)));
        assert_eq!(map.tile(Point::new(5, 5)), None);
    }

    #[test]
    fn test_revision_tracks_changes() {
        let mut map = DungeonMap::open(4, 4, 0);
        assert_eq!(map.revision(), 0);

        assert!(map.set_tile(Point::new(1, 1), TileKind::Wall));
        assert_eq!(map.revision(), 1);

        // Same kind again is not a change.
        map.set_tile(Point::new(1, 1), TileKind::Wall);
        assert_eq!(map.revision(), 1);

        assert!(!map.set_tile(Point::new(9, 9), TileKind::Floor));
        assert_eq!(map.revision(), 1);
    }

    #[test]
    fn test_follow_revision() {
        let mut next = DungeonMap::open(4, 4, 1);
        next.follow_revision(7);
        assert_eq!(next.revision(), 8);
        next.set_tile(Point::new(0, 0), TileKind::Wall);
        assert_eq!(next.revision(), 9);
    }
}
