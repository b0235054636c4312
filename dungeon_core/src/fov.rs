//! Field of view by symmetric shadowcasting.
//!
//! Each of the four quadrants is scanned row by row outward from the
//! observer. Slopes are kept as exact fractions so results do not depend
//! on float rounding. A floor cell is visible only when the observer's
//! center lies in its cone, which makes floor-to-floor visibility
//! symmetric. Walls bounding a visible area are revealed as well.
//!
//! The radius is Euclidean: a cell at offset `(dx, dy)` is in range when
//! `dx² + dy² <= radius²`.

use dungeon_rules::Point;
use std::collections::BTreeSet;

use crate::map::DungeonMap;

#[derive(Debug, Clone, Copy)]
enum Quadrant {
    North,
    East,
    South,
    West,
}

impl Quadrant {
    const ALL: [Quadrant; 4] = [
        Quadrant::North,
        Quadrant::East,
        Quadrant::South,
        Quadrant::West,
    ];

    /// Map a (row depth, column) pair in this quadrant onto the grid.
    fn transform(&self, origin: Point, depth: i32, col: i32) -> Point {
        match self {
            Quadrant::North => Point::new(origin.x + col, origin.y - depth),
            Quadrant::East => Point::new(origin.x + depth, origin.y + col),
            Quadrant::South => Point::new(origin.x + col, origin.y + depth),
            Quadrant::West => Point::new(origin.x - depth, origin.y + col),
        }
    }
}

/// `num / den` with `den > 0`.
#[derive(Debug, Clone, Copy)]
struct Slope {
    num: i32,
    den: i32,
}

impl Slope {
    /// Slope through the near edge of the cell at `(depth, col)`.
    fn through(depth: i32, col: i32) -> Self {
        Self {
            num: 2 * col - 1,
            den: 2 * depth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Row {
    depth: i32,
    start: Slope,
    end: Slope,
}

impl Row {
    /// `depth * start`, rounded with ties going up.
    fn min_col(&self) -> i32 {
        (2 * self.depth * self.start.num + self.start.den).div_euclid(2 * self.start.den)
    }

    /// `depth * end`, rounded with ties going down.
    fn max_col(&self) -> i32 {
        -(self.end.den - 2 * self.depth * self.end.num).div_euclid(2 * self.end.den)
    }

    fn is_symmetric(&self, col: i32) -> bool {
        col * self.start.den >= self.depth * self.start.num
            && col * self.end.den <= self.depth * self.end.num
    }

    fn next(&self) -> Row {
        Row {
            depth: self.depth + 1,
            ..*self
        }
    }
}

/// Cells visible from `origin` on `map` within `radius`.
///
/// The origin is always visible when it is on the map. Cells off the map
/// block sight and are never reported.
pub fn compute_fov(map: &DungeonMap, origin: Point, radius: u32) -> BTreeSet<Point> {
    let mut visible = BTreeSet::new();
    if !map.in_bounds(origin) {
        return visible;
    }
    visible.insert(origin);

    let radius = i32::try_from(radius).unwrap_or(i32::MAX / 4);
    let radius_sq = i64::from(radius) * i64::from(radius);

    for quadrant in Quadrant::ALL {
        let mut rows = vec![Row {
            depth: 1,
            start: Slope { num: -1, den: 1 },
            end: Slope { num: 1, den: 1 },
        }];

        while let Some(mut row) = rows.pop() {
            if row.depth > radius {
                continue;
            }

            let mut prev_wall: Option<bool> = None;
            for col in row.min_col()..=row.max_col() {
                let cell = quadrant.transform(origin, row.depth, col);
                let wall = map.is_opaque(cell);
                let in_range =
                    i64::from(row.depth).pow(2) + i64::from(col).pow(2) <= radius_sq;

                if (wall || row.is_symmetric(col)) && in_range && map.in_bounds(cell) {
                    visible.insert(cell);
                }
                if prev_wall == Some(true) && !wall {
                    row.start = Slope::through(row.depth, col);
                }
                if prev_wall == Some(false) && wall {
                    let mut next = row.next();
                    next.end = Slope::through(row.depth, col);
                    rows.push(next);
                }
                prev_wall = Some(wall);
            }

            if prev_wall == Some(false) {
                rows.push(row.next());
            }
        }
    }

    visible
}
