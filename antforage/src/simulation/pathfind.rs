use super::{GameMap, PheromoneField};

use serde::Serialize;
use shared::Position;
use std::collections::{HashMap, HashSet};

/// Route from a colony to one food source, both ends included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodPath {
    pub food: Position,
    pub path: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColonyPaths {
    pub colony_id: u32,
    pub paths: Vec<FoodPath>,
}

/// Breadth-first search from each colony over cells whose intensity is at
/// least `threshold`. A food source counts as reached once it borders the
/// explored region; its own intensity is irrelevant. Food that cannot be
/// reached gets no entry.
pub fn find_paths(
    map: &GameMap,
    field: &PheromoneField,
    threshold: f32,
    colonies: &[(u32, Position)],
    food: &[Position],
) -> Vec<ColonyPaths> {
    colonies
        .iter()
        .map(|&(colony_id, start)| ColonyPaths {
            colony_id,
            paths: search(map, field, threshold, start, food),
        })
        .collect()
}

fn search(
    map: &GameMap,
    field: &PheromoneField,
    threshold: f32,
    start: Position,
    food: &[Position],
) -> Vec<FoodPath> {
    let grid = map.grid();
    let mut targets: Vec<Position> = food.iter().copied().filter(|&f| f != start).collect();
    let mut parents: HashMap<Position, Position> = HashMap::new();
    let mut visited: HashSet<Position> = HashSet::from([start]);
    let mut frontier = vec![start];
    let mut found = Vec::new();

    while !targets.is_empty() && !frontier.is_empty() {
        let mut next = Vec::new();
        for &cell in &frontier {
            for n in grid.neighbors(cell) {
                if visited.contains(&n) || !map.is_passable(n) {
                    continue;
                }
                if let Some(i) = targets.iter().position(|&t| t == n) {
                    targets.swap_remove(i);
                    let mut path = trace_back(&parents, cell);
                    path.push(n);
                    found.push(FoodPath { food: n, path });
                }
                // Marked food cells also carry the search onward.
                if field.intensity(n) >= threshold {
                    visited.insert(n);
                    parents.insert(n, cell);
                    next.push(n);
                }
            }
        }
        frontier = next;
    }
    found
}

/// Walks parent links from `end` back to the start and returns the path in
/// travel order.
fn trace_back(parents: &HashMap<Position, Position>, end: Position) -> Vec<Position> {
    let mut path = vec![end];
    let mut cur = end;
    while let Some(&prev) = parents.get(&cur) {
        path.push(prev);
        cur = prev;
    }
    path.reverse();
    path
}
