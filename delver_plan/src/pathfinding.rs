// Generic A* search over 3D tile coordinates.
//
// The search is parameterised by a `SearchSpace`: neighbour enumeration,
// transition cost, heuristic, and a validity filter. The frontier is a
// `BinaryHeap` min-heap on `f = g + h` (reversed ordering), with ties broken
// by insertion sequence: of two entries with equal f, the one pushed first
// pops first. Best-known g and parent pointers live in `FxHashMap`s keyed by
// coordinate, since the searched volume is sparse and unbounded.
//
// A transition whose cost is at least `IMPASSABLE_COST` is never taken. This
// lets a cost function forbid moves (e.g. into an unsafe footprint) without
// the neighbour function having to know why.
//
// Every search is capped: it fails after `max_explored` node expansions or
// when the frontier empties, whichever comes first.
//
// `DescentSpace` is the space the plan generator routes its entry ramp
// through: 4-way horizontal moves plus horizontal-and-down moves, cost
// biased against descending, heuristic weighting vertical progress, and the
// cost wired to the analyzer's 3×3 footprint check.
//
// See also: `safety.rs` for `is_footprint_safe`, `planner.rs` which turns the
// returned path into ramp and channel operations.
//
// **Critical constraint: determinism.** Identical callback outputs yield
// identical paths. The hash tables are only ever probed by key, never
// iterated, so their ordering cannot leak into results.

use crate::config::PathConfig;
use crate::safety::SafetyAnalyzer;
use crate::terrain::TerrainQuery;
use crate::types::{Direction, TileCoord};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Transition costs at or above this value are treated as impassable.
pub const IMPASSABLE_COST: f32 = 1.0e9;

/// The graph an A* search runs over.
pub trait SearchSpace {
    fn neighbors(&self, node: TileCoord) -> Vec<TileCoord>;
    fn cost(&self, from: TileCoord, to: TileCoord) -> f32;
    fn heuristic(&self, node: TileCoord, goal: TileCoord) -> f32;
    fn is_valid(&self, node: TileCoord) -> bool;
}

/// Adapts four closures into a `SearchSpace`.
pub struct FnSearchSpace<N, C, H, V> {
    pub neighbors: N,
    pub cost: C,
    pub heuristic: H,
    pub is_valid: V,
}

impl<N, C, H, V> SearchSpace for FnSearchSpace<N, C, H, V>
where
    N: Fn(TileCoord) -> Vec<TileCoord>,
    C: Fn(TileCoord, TileCoord) -> f32,
    H: Fn(TileCoord, TileCoord) -> f32,
    V: Fn(TileCoord) -> bool,
{
    fn neighbors(&self, node: TileCoord) -> Vec<TileCoord> {
        (self.neighbors)(node)
    }

    fn cost(&self, from: TileCoord, to: TileCoord) -> f32 {
        (self.cost)(from, to)
    }

    fn heuristic(&self, node: TileCoord, goal: TileCoord) -> f32 {
        (self.heuristic)(node, goal)
    }

    fn is_valid(&self, node: TileCoord) -> bool {
        (self.is_valid)(node)
    }
}

/// The result of a successful A* search.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Coordinates from start to goal (inclusive).
    pub nodes: Vec<TileCoord>,
    /// Accumulated cost at each node; `costs[0]` is 0 and the sequence never
    /// decreases.
    pub costs: Vec<f32>,
    pub total_cost: f32,
    /// Number of nodes expanded before the goal was reached.
    pub explored: usize,
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    node: TileCoord,
    f_score: f32,
    seq: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score, then earliest seq, is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Find the cheapest path from `start` to `goal`.
///
/// Returns `None` if the goal is unreachable, if either endpoint is invalid,
/// or if more than `max_explored` nodes would need expanding.
pub fn find_path<S: SearchSpace + ?Sized>(
    start: TileCoord,
    goal: TileCoord,
    space: &S,
    max_explored: usize,
) -> Option<PathResult> {
    if !space.is_valid(start) || !space.is_valid(goal) {
        return None;
    }
    if start == goal {
        return Some(PathResult {
            nodes: vec![start],
            costs: vec![0.0],
            total_cost: 0.0,
            explored: 0,
        });
    }

    let mut g_score: FxHashMap<TileCoord, f32> = FxHashMap::default();
    let mut came_from: FxHashMap<TileCoord, TileCoord> = FxHashMap::default();
    let mut closed: FxHashSet<TileCoord> = FxHashSet::default();
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;
    let mut explored = 0usize;

    g_score.insert(start, 0.0);
    open.push(OpenEntry {
        node: start,
        f_score: space.heuristic(start, goal),
        seq,
    });

    while let Some(current) = open.pop() {
        let node = current.node;
        if node == goal {
            return Some(reconstruct_path(&came_from, &g_score, start, goal, explored));
        }
        if !closed.insert(node) {
            continue;
        }
        if explored >= max_explored {
            log::debug!("A* from {start} to {goal} gave up after {explored} nodes");
            return None;
        }
        explored += 1;

        let current_g = g_score.get(&node).copied().unwrap_or(f32::INFINITY);
        for neighbor in space.neighbors(node) {
            if closed.contains(&neighbor) || !space.is_valid(neighbor) {
                continue;
            }
            let step = space.cost(node, neighbor);
            if step >= IMPASSABLE_COST {
                continue;
            }
            let tentative_g = current_g + step;
            let known = g_score.get(&neighbor).copied().unwrap_or(f32::INFINITY);
            if tentative_g < known {
                g_score.insert(neighbor, tentative_g);
                came_from.insert(neighbor, node);
                seq += 1;
                open.push(OpenEntry {
                    node: neighbor,
                    f_score: tentative_g + space.heuristic(neighbor, goal),
                    seq,
                });
            }
        }
    }

    None
}

/// Walk parent pointers back from the goal.
fn reconstruct_path(
    came_from: &FxHashMap<TileCoord, TileCoord>,
    g_score: &FxHashMap<TileCoord, f32>,
    start: TileCoord,
    goal: TileCoord,
    explored: usize,
) -> PathResult {
    let mut nodes = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                nodes.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    nodes.reverse();

    // Each node's own accumulated g, not its predecessor's.
    let costs: Vec<f32> = nodes
        .iter()
        .map(|n| g_score.get(n).copied().unwrap_or(0.0))
        .collect();
    let total_cost = costs.last().copied().unwrap_or(0.0);

    PathResult {
        nodes,
        costs,
        total_cost,
        explored,
    }
}

// ---------------------------------------------------------------------------
// Descent space
// ---------------------------------------------------------------------------

/// Search space for the surface-to-depot ramp.
///
/// Nodes are restricted to levels between the goal and the start. Moving
/// into a tile whose footprint is unsafe costs `IMPASSABLE_COST`.
pub struct DescentSpace<'a, T: TerrainQuery + ?Sized> {
    analyzer: &'a SafetyAnalyzer<'a, T>,
    config: &'a PathConfig,
    top_z: i32,
    bottom_z: i32,
}

impl<'a, T: TerrainQuery + ?Sized> DescentSpace<'a, T> {
    pub fn new(
        analyzer: &'a SafetyAnalyzer<'a, T>,
        config: &'a PathConfig,
        start: TileCoord,
        goal: TileCoord,
    ) -> Self {
        Self {
            analyzer,
            config,
            top_z: start.z.max(goal.z),
            bottom_z: start.z.min(goal.z),
        }
    }
}

impl<T: TerrainQuery + ?Sized> SearchSpace for DescentSpace<'_, T> {
    fn neighbors(&self, node: TileCoord) -> Vec<TileCoord> {
        let mut out = Vec::with_capacity(8);
        for dir in Direction::ALL {
            let next = node.step(dir, 1);
            out.push(next);
            out.push(next.offset(0, 0, -1));
        }
        out
    }

    fn cost(&self, from: TileCoord, to: TileCoord) -> f32 {
        let radius = self.analyzer.config().footprint_radius;
        if !self.analyzer.is_footprint_safe(to, radius) {
            return IMPASSABLE_COST;
        }
        if to.z < from.z {
            self.config.descent_cost
        } else {
            self.config.horizontal_cost
        }
    }

    fn heuristic(&self, node: TileCoord, goal: TileCoord) -> f32 {
        let dz = (node.z - goal.z).unsigned_abs() as f32;
        let dxy = ((node.x - goal.x).unsigned_abs() + (node.y - goal.y).unsigned_abs()) as f32;
        self.config.vertical_heuristic_weight * dz + self.config.horizontal_heuristic_weight * dxy
    }

    fn is_valid(&self, node: TileCoord) -> bool {
        self.analyzer.terrain().in_bounds(node) && (self.bottom_z..=self.top_z).contains(&node.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SafetyConfig;
    use crate::terrain::{Material, VoxelTerrain};

    fn grid_neighbors(n: TileCoord) -> Vec<TileCoord> {
        n.horizontal_neighbors().to_vec()
    }

    fn manhattan(a: TileCoord, b: TileCoord) -> f32 {
        a.manhattan_distance(b) as f32
    }

    fn in_grid(n: TileCoord) -> bool {
        (0..10).contains(&n.x) && (0..10).contains(&n.y) && n.z == 0
    }

    fn assert_contiguous(path: &PathResult) {
        for pair in path.nodes.windows(2) {
            assert_eq!(
                pair[0].manhattan_distance(pair[1]),
                1,
                "{} -> {} is not a single step",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn trivial_path() {
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: |_, _| 1.0,
            heuristic: manhattan,
            is_valid: in_grid,
        };
        let a = TileCoord::new(3, 3, 0);
        let path = find_path(a, a, &space, 100).unwrap();
        assert_eq!(path.nodes, vec![a]);
        assert_eq!(path.total_cost, 0.0);
    }

    #[test]
    fn uniform_grid_path_is_manhattan() {
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: |_, _| 1.0,
            heuristic: manhattan,
            is_valid: in_grid,
        };
        let start = TileCoord::new(1, 2, 0);
        let goal = TileCoord::new(8, 7, 0);
        let path = find_path(start, goal, &space, 10_000).unwrap();
        assert_eq!(path.nodes.len() as u32 - 1, start.manhattan_distance(goal));
        assert_eq!(path.total_cost, 12.0);
        assert_eq!(path.nodes.first(), Some(&start));
        assert_eq!(path.nodes.last(), Some(&goal));
        assert_contiguous(&path);
    }

    #[test]
    fn costs_never_decrease_along_path() {
        // Uneven costs: moving east is expensive on odd rows.
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: |a: TileCoord, b: TileCoord| {
                if b.x > a.x && a.y % 2 == 1 { 3.0 } else { 1.0 }
            },
            heuristic: manhattan,
            is_valid: in_grid,
        };
        let path = find_path(TileCoord::new(0, 1, 0), TileCoord::new(9, 9, 0), &space, 10_000)
            .unwrap();
        assert_eq!(path.costs.len(), path.nodes.len());
        assert_eq!(path.costs[0], 0.0);
        for pair in path.costs.windows(2) {
            assert!(pair[1] >= pair[0], "costs decreased: {pair:?}");
        }
        assert_eq!(path.total_cost, *path.costs.last().unwrap());
        assert_contiguous(&path);
    }

    #[test]
    fn impassable_goal_has_no_path() {
        let goal = TileCoord::new(5, 5, 0);
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: move |_, b: TileCoord| if b == goal { IMPASSABLE_COST } else { 1.0 },
            heuristic: manhattan,
            is_valid: in_grid,
        };
        assert!(find_path(TileCoord::new(0, 0, 0), goal, &space, 10_000).is_none());
    }

    #[test]
    fn invalid_goal_neighbours_have_no_path() {
        let goal = TileCoord::new(5, 5, 0);
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: |_, _| 1.0,
            heuristic: manhattan,
            is_valid: move |n: TileCoord| {
                in_grid(n) && (n == goal || n.manhattan_distance(goal) != 1)
            },
        };
        assert!(find_path(TileCoord::new(0, 0, 0), goal, &space, 10_000).is_none());
    }

    #[test]
    fn explored_cap_aborts_search() {
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: |_, _| 1.0,
            heuristic: |_, _| 0.0,
            is_valid: in_grid,
        };
        let start = TileCoord::new(0, 0, 0);
        let goal = TileCoord::new(9, 9, 0);
        assert!(find_path(start, goal, &space, 5).is_none());
        let path = find_path(start, goal, &space, 1_000).unwrap();
        assert!(path.explored <= 100);
    }

    #[test]
    fn ties_resolve_identically() {
        let space = FnSearchSpace {
            neighbors: grid_neighbors,
            cost: |_, _| 1.0,
            heuristic: manhattan,
            is_valid: in_grid,
        };
        let start = TileCoord::new(0, 0, 0);
        let goal = TileCoord::new(6, 6, 0);
        let first = find_path(start, goal, &space, 10_000).unwrap();
        for _ in 0..5 {
            assert_eq!(find_path(start, goal, &space, 10_000).unwrap(), first);
        }
    }

    #[test]
    fn descent_reaches_depth_through_rock() {
        let terrain = VoxelTerrain::with_surface(30, 30, 20, 19);
        let safety = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &safety);
        let path_cfg = PathConfig::default();
        let start = TileCoord::new(10, 15, 19);
        let goal = TileCoord::new(20, 15, 12);
        let space = DescentSpace::new(&analyzer, &path_cfg, start, goal);

        let path = find_path(start, goal, &space, path_cfg.max_explored_nodes).unwrap();
        assert_eq!(path.nodes.last(), Some(&goal));
        for pair in path.nodes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(b.z == a.z || b.z == a.z - 1, "{a} -> {b} climbs or drops too far");
            assert_eq!((a.x - b.x).abs() + (a.y - b.y).abs(), 1);
        }
        // The surface itself is open, so the first move must go down.
        assert_eq!(path.nodes[1].z, start.z - 1);
    }

    #[test]
    fn descent_routes_around_a_cavern() {
        let mut terrain = VoxelTerrain::with_surface(30, 30, 20, 19);
        // Open pocket straddling the straight line at every level.
        for z in 10..19 {
            for y in 13..18 {
                for x in 14..17 {
                    terrain.set_material(TileCoord::new(x, y, z), Material::Open);
                }
            }
        }
        let safety = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &safety);
        let path_cfg = PathConfig::default();
        let start = TileCoord::new(8, 15, 19);
        let goal = TileCoord::new(22, 15, 12);
        let space = DescentSpace::new(&analyzer, &path_cfg, start, goal);

        let path = find_path(start, goal, &space, path_cfg.max_explored_nodes).unwrap();
        for node in &path.nodes[1..] {
            assert!(analyzer.is_footprint_safe(*node, 1), "{node} is unsafe");
        }
    }
}
