// delver_plan — underground settlement planner.
//
// Given a read-only view of a voxel terrain and a surface anchor, this crate
// designs a subterranean base: it picks a safe digging direction, finds a
// covered hub level, routes a ramp down with A*, places a trade depot, a
// central stairwell and template rooms, and later adds demand-driven
// BSP-partitioned levels. The output is a room graph plus an ordered list of
// tile excavation operations; the crate never digs anything itself.
//
// Module overview:
// - `types.rs`:       TileCoord, Direction, RoomId, TileOp / TileOperation.
// - `geometry.rs`:    Rect, the footprint primitive (perimeter, clip, inset).
// - `terrain.rs`:     TerrainQuery trait + VoxelTerrain, a dense grid for tests and the CLI.
// - `config.rs`:      PlannerConfig — every tunable number, JSON-loadable.
// - `safety.rs`:      SafetyAnalyzer — tile hazards, direction scoring, area sweeps, hub level search.
// - `pathfinding.rs`: Generic A* over a SearchSpace + DescentSpace for the entry ramp.
// - `bsp.rs`:         Arena-backed binary space partition tree.
// - `room.rs`:        RoomKind, RoomShape (rect / L / T), Room, RoomFlags.
// - `catalog.rs`:     Room type catalog, demand computation, greedy footprint assignment.
// - `graph.rs`:       FortressGraph (rooms, corridors, stairwells, hub) + persisted projection.
// - `excavation.rs`:  De-duplicated, ordered tile operation list.
// - `builder.rs`:     Room placement and L-shaped corridors.
// - `planner.rs`:     FortressPlanner — `generate` and `expand`.
// - `prng.rs`:        Seeded ChaCha8 generator used by the CLI, tests and benches.
//
// The companion crate `delver_cli` drives this library against synthetic
// terrain and prints a JSON summary.
//
// **Critical constraint: determinism.** Planning is a pure function of
// terrain, config, inputs and the caller's seeded RNG. Iteration order is
// fixed everywhere it reaches the output: `BTreeMap`/`BTreeSet` for keyed
// state, N/S/E/W for directions, FIFO tie-breaking in A*.

pub mod bsp;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod excavation;
pub mod geometry;
pub mod graph;
pub mod pathfinding;
pub mod planner;
pub mod prng;
pub mod room;
pub mod safety;
pub mod terrain;
pub mod types;

pub use config::{ConfigError, PlannerConfig};
pub use geometry::Rect;
pub use graph::{FortressGraph, GraphError, PersistedGraph};
pub use planner::{Expansion, FortressPlanner, Plan, PlanError};
pub use room::{Room, RoomKind, RoomShape};
pub use terrain::{TerrainQuery, VoxelTerrain};
pub use types::{Direction, RoomId, TileCoord, TileOp, TileOperation};
