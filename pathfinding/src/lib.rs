//! Grid A* over the 4-connected cell graph.
//!
//! Uniform step cost, Manhattan heuristic, ties broken by insertion order.
//! An edge is traversable only when passability holds in both directions
//! across the shared border, which is how one-way ledges stay one-way for
//! route planning.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use common::direction::Direction;
use common::grid::{Cell, Passability};
use fxhash::FxHashMap;

#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on node expansions before the search gives up. Keeps a
    /// degenerate request from stalling the simulation tick; an exhausted
    /// bound reads as "no path".
    pub max_expansions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_expansions: 10_000,
        }
    }
}

/// Shortest cell path from `start` (exclusive) to `goal` (inclusive), or
/// None when the goal is unreachable.
pub fn find_path<P: Passability>(map: &P, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    find_path_with_config(map, start, goal, &Config::default())
}

pub fn find_path_with_config<P: Passability>(
    map: &P,
    start: Cell,
    goal: Cell,
    config: &Config,
) -> Option<Vec<Cell>> {
    if !map.is_valid(start) || !map.is_valid(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    let mut open: BinaryHeap<(Reverse<u32>, Reverse<u32>, Cell, u32)> = BinaryHeap::new();
    let mut g_scores: FxHashMap<Cell, u32> = FxHashMap::default();
    let mut came_from: FxHashMap<Cell, Cell> = FxHashMap::default();
    let mut seq = 0u32;
    let mut expansions = 0usize;

    g_scores.insert(start, 0);
    open.push((Reverse(start.manhattan_distance(goal)), Reverse(seq), start, 0));

    while let Some((_f, _order, cell, g)) = open.pop() {
        if g > g_scores.get(&cell).copied().unwrap_or(u32::MAX) {
            continue; // superseded by a cheaper route
        }
        if cell == goal {
            return Some(reconstruct(start, goal, &came_from));
        }
        expansions += 1;
        if expansions > config.max_expansions {
            log::debug!(
                "path search from {:?} to {:?} exceeded {} expansions, giving up",
                start,
                goal,
                config.max_expansions
            );
            return None;
        }

        for dir in Direction::CARDINALS {
            let next = cell.neighbor(dir);
            if !map.is_valid(next) {
                continue;
            }
            // the cell must permit exiting toward the neighbor AND the
            // neighbor must permit entering from that side
            if !map.is_passable(cell, dir) || !map.is_passable(next, dir.opposite()) {
                continue;
            }
            let tentative = g + 1;
            if tentative >= g_scores.get(&next).copied().unwrap_or(u32::MAX) {
                continue;
            }
            came_from.insert(next, cell);
            g_scores.insert(next, tentative);
            seq += 1;
            open.push((
                Reverse(tentative + next.manhattan_distance(goal)),
                Reverse(seq),
                next,
                tentative,
            ));
        }
    }

    log::debug!("no path from {:?} to {:?}", start, goal);
    None
}

fn reconstruct(start: Cell, goal: Cell, came_from: &FxHashMap<Cell, Cell>) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut cur = goal;
    while let Some(&prev) = came_from.get(&cur) {
        if prev == start {
            break;
        }
        path.push(prev);
        cur = prev;
    }
    path.reverse();
    path
}
