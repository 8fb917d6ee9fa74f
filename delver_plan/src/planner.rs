// Fortress plan generation and expansion.
//
// `FortressPlanner` borrows a terrain and a config and runs the two public
// entry points:
//
// `generate(anchor, rng)`: a linear pipeline with no backtracking.
// 1. Pick the safest direction from the surface anchor.
// 2. Step `entry_offset` along it for the entry point and `hub_offset`
//    further for the hub; pick the hub level with the enclosed-level search.
// 3. A* over `DescentSpace` from the anchor to the entry column at the depot
//    level, every step gated by the 3×3 footprint check.
// 4. Carve a `ramp_width`-wide ramp along the path: a descending step emits
//    `channel` above and `ramp` below, a level step emits `dig`.
// 5. Place the trade depot on the path terminus.
// 6. Corridor from the depot to the hub.
// 7. Stairwell from the depot level down to the deepest template level.
// 8. Template rooms around the hub, each gated by `check_area_safety`.
//    Unsafe placements are logged and skipped, never moved elsewhere.
// 9. A corridor from the hub to every placed room.
// Any hard failure aborts the whole plan; no partial plan is ever returned.
//
// `expand(graph, population, military, rng)`: recompute demand, take the
// band of the most urgent need, and add a BSP-partitioned level one below
// the deepest room of that band, extending the stairwell down to it.
// Returns zero tiles when nothing is owed or no safe level is found.
//
// See also: `safety.rs`, `pathfinding.rs`, `bsp.rs`, `builder.rs`,
// `catalog.rs`, `graph.rs` for the pieces this drives.
//
// **Critical constraint: determinism.** Output is a pure function of
// terrain, config, anchor/graph, and the caller's seeded RNG.

use crate::bsp::BspTree;
use crate::builder::RoomGraphBuilder;
use crate::catalog::{DemandItem, ZBand, assign_footprints, compute_demand, spec_for};
use crate::config::PlannerConfig;
use crate::excavation::ExcavationList;
use crate::geometry::Rect;
use crate::graph::{CorridorEnd, FortressGraph, Stairwell};
use crate::pathfinding::{DescentSpace, PathResult, find_path};
use crate::room::{RoomKind, RoomShape};
use crate::safety::SafetyAnalyzer;
use crate::terrain::TerrainQuery;
use crate::types::{Direction, RoomId, TileCoord, TileOp, TileOperation};
use log::{debug, info, warn};
use rand::Rng;
use thiserror::Error;

/// Why no plan could be produced.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PlanError {
    #[error("anchor {0} is outside the map")]
    AnchorOutOfBounds(TileCoord),
    #[error("no direction from {origin} is safe enough to dig")]
    NoSafeDirection { origin: TileCoord },
    #[error("no enclosed level for the hub (fallback z={fallback_z} is below the map)")]
    NoEnclosedLevel { fallback_z: i32 },
    #[error("no safe descent path from {from} to {to}")]
    NoDescentPath { from: TileCoord, to: TileCoord },
}

/// The result of a successful generation. Immutable once returned.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    graph: FortressGraph,
    tiles: Vec<TileOperation>,
    hub_center: TileCoord,
    hub_z: i32,
    direction: Direction,
    depot_z: i32,
}

impl Plan {
    pub fn graph(&self) -> &FortressGraph {
        &self.graph
    }

    /// Every excavation operation, in carving order.
    pub fn tiles(&self) -> &[TileOperation] {
        &self.tiles
    }

    /// Hub stairwell centre, at the depot level.
    pub fn hub_center(&self) -> TileCoord {
        self.hub_center
    }

    /// Level of the hub's first template ring.
    pub fn hub_z(&self) -> i32 {
        self.hub_z
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn depot_z(&self) -> i32 {
        self.depot_z
    }

    /// Hand the graph to the caller for expansion or persistence.
    pub fn into_graph(self) -> FortressGraph {
        self.graph
    }
}

/// The result of one expansion round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expansion {
    pub tiles: Vec<TileOperation>,
    pub new_rooms: Vec<RoomId>,
    /// Level the new rooms were placed on. `None` when nothing was placed.
    pub level: Option<i32>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

pub struct FortressPlanner<'a, T: TerrainQuery + ?Sized> {
    terrain: &'a T,
    config: &'a PlannerConfig,
    analyzer: SafetyAnalyzer<'a, T>,
}

impl<'a, T: TerrainQuery + ?Sized> FortressPlanner<'a, T> {
    pub fn new(terrain: &'a T, config: &'a PlannerConfig) -> Self {
        Self {
            terrain,
            config,
            analyzer: SafetyAnalyzer::new(terrain, &config.safety),
        }
    }

    pub fn analyzer(&self) -> &SafetyAnalyzer<'a, T> {
        &self.analyzer
    }

    fn builder(&self) -> RoomGraphBuilder<'a> {
        RoomGraphBuilder::new(&self.config.layout, &self.config.catalog)
    }

    /// Design a fresh settlement entered from the surface tile `anchor`.
    pub fn generate(&self, anchor: TileCoord, rng: &mut impl Rng) -> Result<Plan, PlanError> {
        let layout = &self.config.layout;
        let path_cfg = &self.config.path;

        if !self.terrain.in_bounds(anchor) {
            warn!("plan aborted: anchor {anchor} is outside the map");
            return Err(PlanError::AnchorOutOfBounds(anchor));
        }

        let Some(safest) = self.analyzer.find_safest_direction(anchor) else {
            warn!("plan aborted: no safe direction from {anchor}");
            return Err(PlanError::NoSafeDirection { origin: anchor });
        };
        let direction = safest.direction;
        info!(
            "digging in {direction} from {anchor} (score {:.1})",
            safest.score
        );

        let surface_z = anchor.z;
        let entry = anchor.step(direction, layout.entry_offset);
        let hub_xy = entry.step(direction, layout.hub_offset);
        let hub_z = self.analyzer.find_enclosed_z_level(
            hub_xy,
            surface_z,
            layout.hub_footprint,
            layout.hub_footprint,
        );
        if hub_z < 0 {
            warn!("plan aborted: no enclosed level under {hub_xy}, fallback z={hub_z}");
            return Err(PlanError::NoEnclosedLevel { fallback_z: hub_z });
        }
        let stair_bottom = (hub_z + layout.lowest_template_offset()).max(0);

        let depot_z = (surface_z - path_cfg.descent_levels).max(hub_z);
        let goal = entry.with_z(depot_z);
        let space = DescentSpace::new(&self.analyzer, path_cfg, anchor, goal);
        let Some(path) = find_path(anchor, goal, &space, path_cfg.max_explored_nodes) else {
            warn!("plan aborted: no safe descent from {anchor} to {goal}");
            return Err(PlanError::NoDescentPath {
                from: anchor,
                to: goal,
            });
        };
        info!(
            "descent path: {} steps, cost {:.1}, {} nodes explored",
            path.nodes.len() - 1,
            path.total_cost,
            path.explored
        );

        let mut tiles = ExcavationList::new();
        let mut graph = FortressGraph::new();
        carve_ramp(&path, path_cfg.ramp_width, &mut tiles);

        // Trade depot on the path terminus.
        let depot_rect = Rect::centered(goal.x, goal.y, layout.depot_size, layout.depot_size);
        let depot = graph.add_room(
            RoomKind::TradeDepot,
            TileCoord::new(depot_rect.x, depot_rect.y, depot_z),
            depot_rect.width,
            depot_rect.height,
            RoomShape::Rect,
        );
        tiles.carve_rect(depot_rect, depot_z);

        // Hub and the corridor to it.
        let hub_center = hub_xy.with_z(depot_z);
        graph.set_hub(hub_center);
        let builder = self.builder();
        builder.connect(
            &mut graph,
            CorridorEnd::Room(depot),
            goal,
            CorridorEnd::Hub,
            hub_center,
            &mut tiles,
            rng,
        );

        // Central stairwell.
        let stairwell = Stairwell {
            x: hub_center.x,
            y: hub_center.y,
            size: layout.stairwell_size,
            top_z: depot_z,
            bottom_z: stair_bottom.min(depot_z),
        };
        carve_stairwell(&stairwell, &mut tiles);
        graph.add_stairwell(stairwell);
        debug!(
            "stairwell at ({}, {}) spans z={}..={}",
            stairwell.x, stairwell.y, stairwell.bottom_z, stairwell.top_z
        );

        // Template rooms.
        let mut skipped = 0usize;
        for level in &layout.template {
            let z = hub_z + level.z_offset;
            for room in &level.rooms {
                let rect = Rect::centered(
                    hub_center.x + room.dx,
                    hub_center.y + room.dy,
                    room.width,
                    room.height,
                );
                let origin = TileCoord::new(rect.x, rect.y, z);
                if is_occupied(&graph, z, rect) {
                    warn!("skipping {} at {origin}: overlaps an existing room", room.kind);
                    skipped += 1;
                    continue;
                }
                if !self
                    .analyzer
                    .check_area_safety(origin, rect.width, rect.height, z)
                {
                    warn!("skipping {} at {origin}: area is not safe to dig", room.kind);
                    skipped += 1;
                    continue;
                }
                let id = graph.add_room(room.kind, origin, rect.width, rect.height, RoomShape::Rect);
                tiles.carve_rect(rect, z);
                let (cx, cy) = rect.center();
                builder.connect(
                    &mut graph,
                    CorridorEnd::Hub,
                    hub_center.with_z(z),
                    CorridorEnd::Room(id),
                    TileCoord::new(cx, cy, z),
                    &mut tiles,
                    rng,
                );
            }
        }

        let tiles = tiles.into_vec();
        info!(
            "plan ready: {} rooms ({} skipped), {} tile operations, hub at {hub_center}, depot z={depot_z}",
            graph.room_count(),
            skipped,
            tiles.len()
        );

        Ok(Plan {
            graph,
            tiles,
            hub_center,
            hub_z,
            direction,
            depot_z,
        })
    }

    /// Add one level of demand-driven rooms below the existing ones.
    pub fn expand(
        &self,
        graph: &mut FortressGraph,
        population: u32,
        military: u32,
        rng: &mut impl Rng,
    ) -> Expansion {
        let catalog = &self.config.catalog;
        let expansion_cfg = &self.config.expansion;

        let demand = compute_demand(catalog, &graph.room_counts(), population, military);
        let Some(first) = demand.first() else {
            info!("expansion: no outstanding demand");
            return Expansion::default();
        };
        let band = first.z_band;
        let demand: Vec<DemandItem> = demand.into_iter().filter(|d| d.z_band == band).collect();

        let Some(hub) = graph.hub() else {
            warn!("expansion: graph has no hub");
            return Expansion::default();
        };
        let Some(stair_index) = graph
            .stairwells()
            .iter()
            .position(|s| s.x == hub.x && s.y == hub.y)
        else {
            warn!("expansion: no stairwell under the hub at {hub}");
            return Expansion::default();
        };
        let stairwell = graph.stairwells()[stair_index];

        let Some(z) = self.pick_expansion_level(graph, band, &stairwell) else {
            info!("expansion: no safe level found for {band:?} rooms");
            return Expansion::default();
        };

        // Partition the region around the hub and keep the usable leaves.
        let (w, h, _) = self.terrain.map_bounds();
        let Some(region) = Rect::centered(
            hub.x,
            hub.y,
            expansion_cfg.region_width,
            expansion_cfg.region_height,
        )
        .clip(&Rect::new(0, 0, w, h)) else {
            return Expansion::default();
        };
        let mut tree = BspTree::new(region);
        tree.partition(expansion_cfg.bsp_max_depth, expansion_cfg.bsp_min_leaf, rng);

        let stair_zone =
            Rect::centered(stairwell.x, stairwell.y, stairwell.size + 2, stairwell.size + 2);

        let mut leaf_ids = Vec::new();
        let mut footprints = Vec::new();
        for (leaf_id, leaf) in tree.leaves() {
            if leaf.intersects(&stair_zone) || is_occupied(graph, z, leaf) {
                continue;
            }
            let Some(footprint) = leaf.inset(expansion_cfg.room_margin) else {
                continue;
            };
            let origin = TileCoord::new(footprint.x, footprint.y, z);
            if !self
                .analyzer
                .check_area_safety(origin, footprint.width, footprint.height, z)
            {
                debug!("expansion: leaf at {origin} is not safe to dig");
                continue;
            }
            leaf_ids.push(leaf_id);
            footprints.push(footprint);
        }

        let assignments = assign_footprints(&footprints, &demand, catalog);
        if assignments.is_empty() {
            info!(
                "expansion: none of {} usable leaves on z={z} fit the {band:?} demand",
                footprints.len()
            );
            return Expansion::default();
        }

        let mut tiles = ExcavationList::new();
        if z < stairwell.bottom_z {
            extend_stairs(&stairwell, z, &mut tiles);
            graph.extend_stairwell(stair_index, z);
        }
        let new_rooms = self
            .builder()
            .place_assignments(graph, &assignments, z, hub, &mut tiles, rng);
        for (assignment, &id) in assignments.iter().zip(&new_rooms) {
            tree.assign_room(leaf_ids[assignment.footprint_index], id);
        }

        info!(
            "expansion: {} {band:?} rooms on z={z}, {} tile operations",
            new_rooms.len(),
            tiles.len()
        );
        Expansion {
            tiles: tiles.into_vec(),
            new_rooms,
            level: Some(z),
        }
    }

    /// One level below the deepest room of `band` (or of the whole graph),
    /// probing further down until the stairwell can safely reach it.
    fn pick_expansion_level(
        &self,
        graph: &FortressGraph,
        band: ZBand,
        stairwell: &Stairwell,
    ) -> Option<i32> {
        let catalog = &self.config.catalog;
        let deepest_in_band = graph
            .rooms()
            .filter(|room| spec_for(catalog, room.kind).is_some_and(|s| s.z_band == band))
            .map(|room| room.z())
            .min();
        let target = deepest_in_band
            .or_else(|| graph.lowest_level())
            .unwrap_or(stairwell.bottom_z + 1)
            - 1;

        let footprint = stairwell.footprint();
        let stair_clear = |z: i32| {
            (z..stairwell.bottom_z).all(|level| {
                self.analyzer.check_area_safety(
                    TileCoord::new(footprint.x, footprint.y, level),
                    footprint.width,
                    footprint.height,
                    level,
                )
            })
        };

        let probe = self.config.expansion.level_probe.max(1);
        (target - probe + 1..=target)
            .rev()
            .take_while(|&z| z >= 0)
            .find(|&z| stair_clear(z))
    }
}

/// Carve a ramp along `path`. Each step is widened to `width` tiles across
/// the direction of travel. The start tile is left alone.
fn carve_ramp(path: &PathResult, width: i32, tiles: &mut ExcavationList) {
    let half = (width.max(1) - 1) / 2;
    for pair in path.nodes.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        // Perpendicular to travel on the horizontal plane.
        let (px, py) = (-dy, dx);
        for k in -half..=(width.max(1) - 1 - half) {
            let tile = b.offset(px * k, py * k, 0);
            if b.z < a.z {
                tiles.push(tile.with_z(a.z), TileOp::Channel);
                tiles.push(tile, TileOp::Ramp);
            } else {
                tiles.push(tile, TileOp::Dig);
            }
        }
    }
}

/// Whether `rect` on level `z` overlaps any room already in the graph.
fn is_occupied(graph: &FortressGraph, z: i32, rect: Rect) -> bool {
    graph.rooms_on_level(z).iter().any(|room| {
        room.primary().intersects(&rect) || room.extensions.iter().any(|e| e.intersects(&rect))
    })
}

/// Stairs over the whole shaft: `stair_down` on top, `stair_updown`
/// between, `stair_up` at the bottom.
fn carve_stairwell(stairwell: &Stairwell, tiles: &mut ExcavationList) {
    let (top, bottom) = (stairwell.top_z, stairwell.bottom_z);
    let footprint = stairwell.footprint();
    for z in (bottom..=top).rev() {
        let op = match (z == top, z == bottom) {
            (true, true) => TileOp::Dig,
            (true, false) => TileOp::StairDown,
            (false, true) => TileOp::StairUp,
            (false, false) => TileOp::StairUpDown,
        };
        for tile in footprint.tiles(z) {
            tiles.push(tile, op);
        }
    }
}

/// Continue the shaft from its current bottom down to `new_bottom`. The
/// old bottom becomes a through level.
fn extend_stairs(stairwell: &Stairwell, new_bottom: i32, tiles: &mut ExcavationList) {
    let footprint = stairwell.footprint();
    for z in (new_bottom..=stairwell.bottom_z).rev() {
        let op = if z == new_bottom {
            TileOp::StairUp
        } else {
            TileOp::StairUpDown
        };
        for tile in footprint.tiles(z) {
            tiles.push(tile, op);
        }
    }
}
