//! A* search over the tile grid.
//!
//! Movement is 4-neighbor with unit cost and a Manhattan heuristic. The
//! frontier is ordered by `(f, insertion order)`, so equal-cost paths come
//! out the same way every run.

use dungeon_rules::{Direction, Point};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use thiserror::Error;

/// Why no path was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoPath {
    #[error("goal is not reachable from start")]
    Unreachable,

    #[error("search gave up after {0} expansions")]
    SearchLimit(usize),

    #[error("goal cell is not passable")]
    GoalBlocked,
}

/// Bounded A* pathfinder.
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder {
    max_expansions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    f: i32,
    seq: u64,
    point: Point,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the lowest (f, seq) pops first.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Pathfinder {
    pub fn new(max_expansions: usize) -> Self {
        Self {
            max_expansions: max_expansions.max(1),
        }
    }

    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    /// Find a path from `start` to `goal`.
    ///
    /// `passable` decides which cells may be entered; it is never asked about
    /// `start`. The result lists the steps after `start`, ending with `goal`.
    /// `start == goal` yields an empty path.
    pub fn find_path(
        &self,
        start: Point,
        goal: Point,
        passable: impl Fn(Point) -> bool,
    ) -> Result<Vec<Point>, NoPath> {
        if start == goal {
            return Ok(Vec::new());
        }
        if !passable(goal) {
            return Err(NoPath::GoalBlocked);
        }

        let mut open = BinaryHeap::new();
        let mut closed: BTreeSet<Point> = BTreeSet::new();
        let mut g_score: BTreeMap<Point, i32> = BTreeMap::new();
        let mut came_from: BTreeMap<Point, Point> = BTreeMap::new();
        let mut seq = 0u64;
        let mut expansions = 0usize;

        g_score.insert(start, 0);
        open.push(Frontier {
            f: start.manhattan(goal),
            seq,
            point: start,
        });

        while let Some(Frontier { point: current, .. }) = open.pop() {
            if current == goal {
                return Ok(reconstruct(&came_from, start, goal));
            }
            if !closed.insert(current) {
                continue;
            }

            expansions += 1;
            if expansions > self.max_expansions {
                return Err(NoPath::SearchLimit(self.max_expansions));
            }

            let g = g_score.get(&current).copied().unwrap_or(0);
            let neighbors: SmallVec<[Point; 4]> = Direction::CARDINAL
                .iter()
                .map(|&d| current.step(d))
                .filter(|p| !closed.contains(p) && passable(*p))
                .collect();

            for next in neighbors {
                let tentative = g + 1;
                if g_score.get(&next).map_or(true, |&known| tentative < known) {
                    g_score.insert(next, tentative);
                    came_from.insert(next, current);
                    seq += 1;
                    open.push(Frontier {
                        f: tentative + next.manhattan(goal),
                        seq,
                        point: next,
                    });
                }
            }
        }

        Err(NoPath::Unreachable)
    }
}

fn reconstruct(came_from: &BTreeMap<Point, Point>, start: Point, goal: Point) -> Vec<Point> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
