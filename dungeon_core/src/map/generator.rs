//! Seeded level generation: rooms joined by L-shaped corridors, with the
//! stairs down in the last room placed.

use dungeon_rules::{Point, RollSource};
use serde::{Deserialize, Serialize};

use super::{DungeonMap, TileKind};
use crate::config::DungeonConfig;

/// An axis-aligned room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Overlap test with a one-cell margin, so rooms never share a wall.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x + self.width + 1 < other.x
            || other.x + other.width + 1 < self.x
            || self.y + self.height + 1 < other.y
            || other.y + other.height + 1 < self.y)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    fn random_point<R: RollSource + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            rng.roll_range(self.x, self.x + self.width - 1),
            rng.roll_range(self.y, self.y + self.height - 1),
        )
    }
}

/// A freshly generated level.
#[derive(Debug, Clone)]
pub struct GeneratedLevel {
    pub map: DungeonMap,
    pub rooms: Vec<Rect>,
    /// Where arrivals are placed: the center of the first room.
    pub entry: Point,
    pub stairs: Option<Point>,
}

/// Builds levels from a [`DungeonConfig`] and the simulation's random stream.
#[derive(Debug, Clone)]
pub struct DungeonGenerator {
    config: DungeonConfig,
}

impl DungeonGenerator {
    pub fn new(config: DungeonConfig) -> Self {
        Self { config }
    }

    /// Generate the level at `depth`.
    pub fn generate<R: RollSource + ?Sized>(&self, depth: i32, rng: &mut R) -> GeneratedLevel {
        let width = self.config.width.max(3);
        let height = self.config.height.max(3);
        let mut map = DungeonMap::new(width, height, depth);

        let rooms = self.place_rooms(width, height, rng);
        for room in &rooms {
            carve_room(&mut map, room);
        }
        self.connect_rooms(&mut map, &rooms, rng);

        let entry = match rooms.first() {
            Some(room) => room.center(),
            None => {
                let center = Point::new(width / 2, height / 2);
                map.set_tile(center, TileKind::Floor);
                center
            }
        };

        let stairs = rooms.last().map(|room| {
            let mut spot = room.random_point(rng);
            if spot == entry {
                spot = [
                    Point::new(room.x, room.y),
                    Point::new(room.x + room.width - 1, room.y + room.height - 1),
                ]
                .into_iter()
                .find(|p| *p != entry)
                .unwrap_or(spot);
            }
            map.set_tile(spot, TileKind::StairsDown);
            spot
        });

        tracing::debug!(
            depth,
            rooms = rooms.len(),
            entry = %entry,
            "generated level"
        );

        GeneratedLevel {
            map,
            rooms,
            entry,
            stairs,
        }
    }

    fn place_rooms<R: RollSource + ?Sized>(
        &self,
        width: i32,
        height: i32,
        rng: &mut R,
    ) -> Vec<Rect> {
        let cfg = &self.config;
        let min_size = cfg.min_room_size.max(1);
        let max_size = cfg.max_room_size.max(min_size);
        let mut rooms: Vec<Rect> = Vec::new();

        for _ in 0..cfg.max_room_attempts {
            if rooms.len() >= cfg.max_rooms {
                break;
            }

            let w = rng.roll_range(min_size, max_size);
            let h = rng.roll_range(min_size, max_size);
            // Keep a one-cell border of rock around the level.
            if w >= width - 2 || h >= height - 2 {
                continue;
            }

            let x = rng.roll_range(1, (width - w - 1).max(1));
            let y = rng.roll_range(1, (height - h - 1).max(1));
            let room = Rect::new(x, y, w, h);

            if rooms.iter().all(|other| !room.intersects(other)) {
                rooms.push(room);
            }
        }

        rooms
    }

    fn connect_rooms<R: RollSource + ?Sized>(
        &self,
        map: &mut DungeonMap,
        rooms: &[Rect],
        rng: &mut R,
    ) {
        if rooms.len() < 2 {
            return;
        }

        for pair in rooms.windows(2) {
            carve_corridor(map, pair[0].center(), pair[1].center(), rng);
        }
        if rooms.len() > 2 {
            carve_corridor(map, rooms[rooms.len() - 1].center(), rooms[0].center(), rng);
        }

        let last = rooms.len() as i32 - 1;
        for _ in 0..rooms.len() / 3 {
            let a = rng.roll_range(0, last) as usize;
            let b = rng.roll_range(0, last) as usize;
            if a != b {
                carve_corridor(map, rooms[a].center(), rooms[b].center(), rng);
            }
        }
    }
}

fn carve_room(map: &mut DungeonMap, room: &Rect) {
    for y in room.y..room.y + room.height {
        for x in room.x..room.x + room.width {
            map.set_tile(Point::new(x, y), TileKind::Floor);
        }
    }
}

/// L-shaped corridor; a coin flip picks which leg comes first.
fn carve_corridor<R: RollSource + ?Sized>(
    map: &mut DungeonMap,
    from: Point,
    to: Point,
    rng: &mut R,
) {
    if rng.roll_die(2) == 1 {
        carve_horizontal(map, from.x, to.x, from.y);
        carve_vertical(map, to.x, from.y, to.y);
    } else {
        carve_vertical(map, from.x, from.y, to.y);
        carve_horizontal(map, from.x, to.x, to.y);
    }
}

fn carve_horizontal(map: &mut DungeonMap, x1: i32, x2: i32, y: i32) {
    for x in x1.min(x2)..=x1.max(x2) {
        map.set_tile(Point::new(x, y), TileKind::Floor);
    }
}

fn carve_vertical(map: &mut DungeonMap, x: i32, y1: i32, y2: i32) {
    for y in y1.min(y2)..=y1.max(y2) {
        map.set_tile(Point::new(x, y), TileKind::Floor);
    }
}
