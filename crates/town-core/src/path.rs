//! Grid A* pathfinder.
//!
//! Search runs over a 4-connected grid with uniform step cost and a Manhattan
//! heuristic. The open set is a binary heap keyed by f-score; ties break on
//! lower heuristic first and insertion order second, so search order (and
//! therefore the returned path) is deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::env::MapOracle;
use crate::geometry::{Point, Tile};

/// Pathfinding failure. Always a value, never a panic: callers decide the
/// fallback.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("start tile {0} is blocked")]
    BlockedStart(Tile),

    #[error("goal tile {0} is blocked")]
    BlockedGoal(Tile),

    #[error("no route from {start} to {goal}")]
    Unreachable { start: Tile, goal: Tile },
}

/// Frontier entry. Ordered so the binary heap (a max-heap) yields the entry
/// with the lowest f-score, breaking ties by lower h, then earlier insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    seq: u64,
    tile: Tile,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Finds a path between two positions, flooring fractional inputs to tiles.
///
/// Returns the waypoint sequence in start-to-goal order, inclusive of both
/// endpoints; a search from a tile to itself yields a single-waypoint path.
/// Fails immediately, without searching, when either endpoint is blocked.
pub fn find_path(map: &dyn MapOracle, start: Point, goal: Point) -> Result<Vec<Tile>, PathError> {
    let start = start.tile();
    let goal = goal.tile();

    if !map.is_walkable(start) {
        return Err(PathError::BlockedStart(start));
    }
    if !map.is_walkable(goal) {
        return Err(PathError::BlockedGoal(goal));
    }

    let mut open = BinaryHeap::new();
    let mut closed: HashSet<Tile> = HashSet::new();
    let mut came_from: HashMap<Tile, Tile> = HashMap::new();
    let mut g_score: HashMap<Tile, u32> = HashMap::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open.push(OpenEntry {
        f: start.manhattan_distance(goal),
        h: start.manhattan_distance(goal),
        seq,
        tile: start,
    });

    while let Some(entry) = open.pop() {
        let current = entry.tile;
        if !closed.insert(current) {
            // Superseded heap entry for an already-expanded tile.
            continue;
        }

        if current == goal {
            return Ok(reconstruct(&came_from, current));
        }

        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let neighbor = Tile::new(current.x + dx, current.y + dy);
            if closed.contains(&neighbor) || !map.is_walkable(neighbor) {
                continue;
            }

            let tentative = current_g + 1;
            let known = g_score.get(&neighbor).copied().unwrap_or(u32::MAX);
            if tentative >= known {
                continue;
            }

            g_score.insert(neighbor, tentative);
            came_from.insert(neighbor, current);
            let h = neighbor.manhattan_distance(goal);
            seq += 1;
            open.push(OpenEntry {
                f: tentative + h,
                h,
                seq,
                tile: neighbor,
            });
        }
    }

    Err(PathError::Unreachable { start, goal })
}

fn reconstruct(came_from: &HashMap<Tile, Tile>, goal: Tile) -> Vec<Tile> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}
