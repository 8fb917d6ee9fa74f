// Terrain safety analysis.
//
// Turns raw `TerrainQuery` answers into hazard verdicts the planner can act
// on: a per-tile `TerrainAnalysis` (hazard set, 0–100 score, safe flag,
// reason), per-direction scores for choosing where to dig in from the
// surface, whole-area checks for room and stairwell footprints, and the
// enclosed-level search that picks the hub depth.
//
// Every evaluator here is total. Out-of-bounds coordinates and missing data
// make a tile unsafe rather than failing. Every sweep is capped by a
// `SafetyConfig` limit (`max_scan_distance`, `enclosed_scan_depth`,
// `max_sweep_tiles`) so a single call has bounded cost on any map.
//
// Tile scoring, in evaluation order:
// 1. Out of bounds          -> score 0, unsafe (`OutOfBounds`).
// 2. Tile holds liquid      -> score 0, unsafe (`Liquid`).
// 3. Start at 100; aquifer -50; each adjacent water tile -20; each adjacent
//    magma tile -30; within `map_edge_margin` of the x/y edge -20.
// 4. Any horizontal neighbour open or out of bounds -> unsafe
//    (`LateralBreach`), score unchanged.
// A tile is unsafe when its score falls below `safe_threshold` or a
// fail-fast fires. The reason is the first hazard that made it unsafe.
//
// See also: `terrain.rs` for the query trait, `pathfinding.rs` whose
// `DescentSpace` wires its cost to `is_footprint_safe`, `planner.rs`.

use crate::config::SafetyConfig;
use crate::geometry::Rect;
use crate::terrain::{LiquidKind, TerrainQuery};
use crate::types::{Direction, TileCoord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A condition found while analysing a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    OutOfBounds,
    Liquid,
    Aquifer,
    AdjacentWater,
    AdjacentMagma,
    MapEdge,
    LateralBreach,
}

impl Hazard {
    /// Hazards that make a tile unfit for a room wall regardless of score.
    pub const fn is_fluid(self) -> bool {
        matches!(
            self,
            Hazard::Liquid | Hazard::Aquifer | Hazard::AdjacentWater | Hazard::AdjacentMagma
        )
    }
}

/// Hazard verdict for one tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainAnalysis {
    pub hazards: BTreeSet<Hazard>,
    /// 0–100; higher is safer.
    pub score: u8,
    pub safe: bool,
    /// The first hazard that made the tile unsafe. `None` when safe.
    pub reason: Option<Hazard>,
}

impl TerrainAnalysis {
    fn fail_fast(hazard: Hazard) -> Self {
        Self {
            hazards: BTreeSet::from([hazard]),
            score: 0,
            safe: false,
            reason: Some(hazard),
        }
    }

    pub fn has_fluid_hazard(&self) -> bool {
        self.hazards.iter().any(|h| h.is_fluid())
    }
}

/// Aggregate safety of digging along one direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionScore {
    pub direction: Direction,
    /// 0–100; higher is safer.
    pub score: f32,
    /// Every hazard seen along the scan.
    pub hazards: BTreeSet<Hazard>,
}

/// Result of `find_safest_direction`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafestDirection {
    pub direction: Direction,
    pub score: f32,
    pub hazards: BTreeSet<Hazard>,
    /// Scores of all four directions, in `Direction::ALL` order.
    pub all_scores: [DirectionScore; 4],
}

/// Stateless evaluator over a borrowed terrain.
pub struct SafetyAnalyzer<'a, T: TerrainQuery + ?Sized> {
    terrain: &'a T,
    config: &'a SafetyConfig,
}

impl<'a, T: TerrainQuery + ?Sized> SafetyAnalyzer<'a, T> {
    pub fn new(terrain: &'a T, config: &'a SafetyConfig) -> Self {
        Self { terrain, config }
    }

    pub fn terrain(&self) -> &'a T {
        self.terrain
    }

    pub fn config(&self) -> &'a SafetyConfig {
        self.config
    }

    /// Score one tile. See the module header for the evaluation order.
    pub fn analyze_tile(&self, coord: TileCoord) -> TerrainAnalysis {
        let terrain = self.terrain;
        let cfg = self.config;

        if !terrain.in_bounds(coord) {
            return TerrainAnalysis::fail_fast(Hazard::OutOfBounds);
        }
        if terrain.tile_liquid(coord).is_some() {
            return TerrainAnalysis::fail_fast(Hazard::Liquid);
        }

        let mut hazards = BTreeSet::new();
        let mut score: u8 = 100;
        let mut reason = None;
        let mut penalize = |hazard: Hazard, amount: u8, score: &mut u8| {
            hazards.insert(hazard);
            *score = score.saturating_sub(amount);
            if reason.is_none() && *score < cfg.safe_threshold {
                reason = Some(hazard);
            }
        };

        if terrain.is_aquifer(coord) {
            penalize(Hazard::Aquifer, cfg.aquifer_penalty, &mut score);
        }
        for neighbor in coord.face_neighbors() {
            match terrain.tile_liquid(neighbor).map(|l| l.kind) {
                Some(LiquidKind::Water) => {
                    penalize(Hazard::AdjacentWater, cfg.adjacent_water_penalty, &mut score)
                }
                Some(LiquidKind::Magma) => {
                    penalize(Hazard::AdjacentMagma, cfg.adjacent_magma_penalty, &mut score)
                }
                None => {}
            }
        }
        if self.near_map_edge(coord, cfg.map_edge_margin) {
            penalize(Hazard::MapEdge, cfg.map_edge_penalty, &mut score);
        }

        let breached = coord
            .horizontal_neighbors()
            .iter()
            .any(|&n| !terrain.in_bounds(n) || terrain.is_open_space(n));
        if breached {
            hazards.insert(Hazard::LateralBreach);
            reason.get_or_insert(Hazard::LateralBreach);
        }

        TerrainAnalysis {
            hazards,
            score,
            safe: reason.is_none(),
            reason,
        }
    }

    fn near_map_edge(&self, coord: TileCoord, margin: i32) -> bool {
        let (w, h, _) = self.terrain.map_bounds();
        coord.x < margin || coord.y < margin || coord.x >= w - margin || coord.y >= h - margin
    }

    /// Score digging `distance` tiles along `dir` from `origin`.
    ///
    /// Nearer tiles weigh more: the tile at step `s` is weighted
    /// `(distance - s + 1) / distance`. The score is 100 minus the weighted
    /// mean per-tile penalty, minus `boundary_penalty` when the scan ends
    /// within `boundary_margin` of the map edge, clamped to [0, 100].
    pub fn score_direction(&self, origin: TileCoord, dir: Direction, distance: i32) -> DirectionScore {
        let cfg = self.config;
        let distance = distance.clamp(1, cfg.max_scan_distance.max(1));
        let mut hazards = BTreeSet::new();
        let mut weighted_penalty = 0.0f32;
        let mut total_weight = 0.0f32;

        for step in 1..=distance {
            let weight = (distance - step + 1) as f32 / distance as f32;
            let column = origin.step(dir, step);
            for depth in 0..cfg.direction_scan_depths.max(1) {
                let analysis = self.analyze_tile(column.offset(0, 0, -depth));
                weighted_penalty += weight * f32::from(100 - analysis.score);
                total_weight += weight;
                hazards.extend(analysis.hazards);
            }
        }

        let mut score = 100.0 - weighted_penalty / total_weight;
        let endpoint = origin.step(dir, distance);
        if self.near_map_edge(endpoint, cfg.boundary_margin) {
            score -= cfg.boundary_penalty;
        }

        DirectionScore {
            direction: dir,
            score: score.clamp(0.0, 100.0),
            hazards,
        }
    }

    /// Evaluate N, S, E, W in that order and return the strictly best one.
    /// Ties keep the earlier direction. `None` when even the best scores
    /// below `min_direction_score`.
    pub fn find_safest_direction(&self, origin: TileCoord) -> Option<SafestDirection> {
        let distance = self.config.direction_scan_distance;
        let all_scores =
            Direction::ALL.map(|dir| self.score_direction(origin, dir, distance));

        let mut best = &all_scores[0];
        for candidate in &all_scores[1..] {
            if candidate.score > best.score {
                best = candidate;
            }
        }

        log::debug!(
            "direction scores from {origin}: {}",
            all_scores
                .iter()
                .map(|s| format!("{}={:.1}", s.direction, s.score))
                .collect::<Vec<_>>()
                .join(" ")
        );

        if best.score < self.config.min_direction_score {
            return None;
        }
        Some(SafestDirection {
            direction: best.direction,
            score: best.score,
            hazards: best.hazards.clone(),
            all_scores: all_scores.clone(),
        })
    }

    /// Whether a `width`×`height` area with north-west corner at
    /// `(origin.x, origin.y)` can be dug safely on level `z`.
    ///
    /// Samples every perimeter tile plus the centre. Each sample must be a
    /// diggable solid wall, analysed safe, free of fluid hazards, and not
    /// touching an aquifer on any face.
    pub fn check_area_safety(&self, origin: TileCoord, width: i32, height: i32, z: i32) -> bool {
        let rect = Rect::new(origin.x, origin.y, width, height);
        if rect.is_empty() || rect.perimeter_len() + 1 > self.config.max_sweep_tiles {
            return false;
        }
        let (cx, cy) = rect.center();
        let center = TileCoord::new(cx, cy, z);

        rect.perimeter(z)
            .into_iter()
            .chain(std::iter::once(center))
            .all(|tile| self.is_tile_diggable_safely(tile))
    }

    fn is_tile_diggable_safely(&self, tile: TileCoord) -> bool {
        if !self.terrain.in_bounds(tile)
            || !self.terrain.is_solid_wall(tile)
            || !self.terrain.is_diggable(tile)
        {
            return false;
        }
        let analysis = self.analyze_tile(tile);
        analysis.safe
            && !analysis.has_fluid_hazard()
            && !tile.face_neighbors().iter().any(|&n| self.terrain.is_aquifer(n))
    }

    /// Whether a tile is covered from above: looking up at most
    /// `enclosure_probe_levels` levels, a solid tile appears before any
    /// tile open to the sky.
    fn is_enclosed(&self, coord: TileCoord) -> bool {
        for dz in 1..=self.config.enclosure_probe_levels {
            let above = coord.offset(0, 0, dz);
            if !self.terrain.in_bounds(above) || self.terrain.is_outside(above) {
                return false;
            }
            if self.terrain.is_solid_wall(above) {
                return true;
            }
        }
        false
    }

    /// Pick the hub level for a `width`×`height` footprint centred on
    /// `center`, scanning down from `surface_z - enclosed_scan_start_offset`.
    ///
    /// A level qualifies when the centre and the four footprint corners are
    /// enclosed from above and the footprint passes `check_area_safety`.
    /// Falls back to `surface_z - enclosed_fallback_offset`.
    pub fn find_enclosed_z_level(
        &self,
        center: TileCoord,
        surface_z: i32,
        width: i32,
        height: i32,
    ) -> i32 {
        let cfg = self.config;
        let footprint = Rect::new(center.x - width / 2, center.y - height / 2, width, height);
        let start = surface_z - cfg.enclosed_scan_start_offset;

        for z in (start - cfg.enclosed_scan_depth + 1..=start).rev() {
            if z < 0 {
                break;
            }
            let mut samples = vec![(center.x, center.y)];
            samples.extend(footprint.corners());
            let enclosed = samples
                .iter()
                .all(|&(x, y)| self.is_enclosed(TileCoord::new(x, y, z)));
            if enclosed
                && self.check_area_safety(
                    TileCoord::new(footprint.x, footprint.y, z),
                    width,
                    height,
                    z,
                )
            {
                log::debug!("enclosed level for hub at {center}: z={z}");
                return z;
            }
        }

        let fallback = surface_z - cfg.enclosed_fallback_offset;
        log::debug!("no enclosed level under {center}; falling back to z={fallback}");
        fallback
    }

    /// Whether every tile of the `(2r+1)`² square around `center` is safe.
    pub fn is_footprint_safe(&self, center: TileCoord, radius: i32) -> bool {
        (-radius..=radius).all(|dy| {
            (-radius..=radius).all(|dx| self.analyze_tile(center.offset(dx, dy, 0)).safe)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{Liquid, Material, VoxelTerrain};

    const WATER: Liquid = Liquid {
        level: 7,
        kind: LiquidKind::Water,
    };
    const MAGMA: Liquid = Liquid {
        level: 7,
        kind: LiquidKind::Magma,
    };

    fn solid(size: i32, depth: i32) -> VoxelTerrain {
        VoxelTerrain::with_surface(size, size, depth, depth - 1)
    }

    #[test]
    fn interior_rock_is_perfectly_safe() {
        let terrain = solid(21, 12);
        let cfg = SafetyConfig::default();
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(TileCoord::new(10, 10, 5));
        assert_eq!(a.score, 100);
        assert!(a.safe);
        assert!(a.hazards.is_empty());
        assert_eq!(a.reason, None);
    }

    #[test]
    fn out_of_bounds_fails_fast() {
        let terrain = solid(10, 10);
        let cfg = SafetyConfig::default();
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(TileCoord::new(-1, 3, 3));
        assert_eq!(a.score, 0);
        assert!(!a.safe);
        assert_eq!(a.reason, Some(Hazard::OutOfBounds));
    }

    #[test]
    fn liquid_tile_fails_fast() {
        let mut terrain = solid(21, 12);
        let c = TileCoord::new(10, 10, 5);
        terrain.set_liquid(c, Some(MAGMA));
        let cfg = SafetyConfig::default();
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(c);
        assert_eq!(a.score, 0);
        assert_eq!(a.reason, Some(Hazard::Liquid));
    }

    #[test]
    fn penalties_accumulate_and_saturate() {
        let mut terrain = solid(21, 12);
        let c = TileCoord::new(10, 10, 5);
        let cfg = SafetyConfig::default();

        terrain.set_aquifer(c, true);
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(c);
        assert_eq!(a.score, 50);
        assert_eq!(a.reason, Some(Hazard::Aquifer));

        terrain.set_liquid(c.offset(0, 0, 1), Some(WATER));
        terrain.set_liquid(c.offset(0, 0, -1), Some(MAGMA));
        let b = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(c);
        assert_eq!(b.score, 0);
        assert!(b.hazards.contains(&Hazard::AdjacentWater));
        assert!(b.hazards.contains(&Hazard::AdjacentMagma));
        assert_eq!(b.reason, Some(Hazard::Aquifer));
    }

    #[test]
    fn single_adjacent_water_stays_above_threshold() {
        let mut terrain = solid(21, 12);
        let c = TileCoord::new(10, 10, 5);
        terrain.set_liquid(c.offset(0, 0, -1), Some(WATER));
        let cfg = SafetyConfig::default();
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(c);
        assert_eq!(a.score, 80);
        assert!(a.safe);
        assert!(a.has_fluid_hazard());
    }

    #[test]
    fn open_neighbour_is_a_lateral_breach() {
        let mut terrain = solid(21, 12);
        let c = TileCoord::new(10, 10, 5);
        terrain.set_material(c.step(Direction::West, 1), Material::Open);
        let cfg = SafetyConfig::default();
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(c);
        assert_eq!(a.score, 100);
        assert!(!a.safe);
        assert_eq!(a.reason, Some(Hazard::LateralBreach));
    }

    #[test]
    fn edge_tiles_are_penalised() {
        let terrain = solid(21, 12);
        let cfg = SafetyConfig::default();
        let a = SafetyAnalyzer::new(&terrain, &cfg).analyze_tile(TileCoord::new(1, 10, 5));
        assert_eq!(a.score, 80);
        assert!(a.hazards.contains(&Hazard::MapEdge));
        assert!(a.safe);
    }

    #[test]
    fn area_with_hazard_on_perimeter_is_unsafe() {
        let cfg = SafetyConfig::default();
        let z = 5;
        let origin = TileCoord::new(6, 6, z);
        let clean = solid(21, 12);
        assert!(SafetyAnalyzer::new(&clean, &cfg).check_area_safety(origin, 5, 5, z));

        // Water, magma, or aquifer next to any perimeter tile sinks the area.
        let perimeter = Rect::new(6, 6, 5, 5).perimeter(z);
        for (i, tile) in perimeter.iter().enumerate() {
            let mut terrain = clean.clone();
            match i % 3 {
                0 => terrain.set_liquid(tile.offset(0, 0, 1), Some(WATER)),
                1 => terrain.set_liquid(tile.offset(0, 0, -1), Some(MAGMA)),
                _ => terrain.set_aquifer(tile.offset(0, 0, -1), true),
            }
            let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
            assert!(
                !analyzer.check_area_safety(origin, 5, 5, z),
                "hazard at perimeter tile {tile} went unnoticed"
            );
        }
    }

    #[test]
    fn aquifer_beside_perimeter_is_unsafe() {
        let cfg = SafetyConfig::default();
        let z = 5;
        let origin = TileCoord::new(6, 6, z);
        let mut terrain = solid(21, 12);
        // Just west of the north-west corner, outside the area itself.
        let beside = TileCoord::new(5, 6, z);
        terrain.set_aquifer(beside, true);
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        assert!(analyzer.analyze_tile(origin).safe);
        assert!(!analyzer.check_area_safety(origin, 5, 5, z));
        // One tile further away no longer touches the area.
        let mut terrain = solid(21, 12);
        terrain.set_aquifer(beside.offset(-1, 0, 0), true);
        assert!(SafetyAnalyzer::new(&terrain, &cfg).check_area_safety(origin, 5, 5, z));
    }

    #[test]
    fn nearer_hazard_costs_more() {
        let cfg = SafetyConfig::default();
        let origin = TileCoord::new(20, 20, 19);
        let distance = 10;
        let score_with_water_at = |step: i32| {
            let mut terrain = solid(41, 20);
            terrain.set_liquid(origin.step(Direction::East, step).offset(0, 0, -1), Some(WATER));
            SafetyAnalyzer::new(&terrain, &cfg)
                .score_direction(origin, Direction::East, distance)
                .score
        };
        let near = score_with_water_at(1);
        let far = score_with_water_at(distance);
        assert!(near < far, "near={near} far={far}");
        assert!(far < 100.0);
    }

    #[test]
    fn scan_ending_at_map_edge_pays_boundary_penalty() {
        let cfg = SafetyConfig {
            map_edge_margin: 0,
            ..SafetyConfig::default()
        };
        let terrain = solid(41, 20);
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        let origin = TileCoord::new(20, 20, 19);
        // Ends at x=38, inside the last `boundary_margin` columns.
        let toward_edge = analyzer.score_direction(origin, Direction::East, 18);
        let interior = analyzer.score_direction(origin, Direction::East, 10);
        assert_eq!(interior.score, 100.0);
        assert_eq!(toward_edge.score, 100.0 - cfg.boundary_penalty);
    }

    #[test]
    fn oversized_area_is_rejected() {
        let terrain = solid(21, 12);
        let cfg = SafetyConfig {
            max_sweep_tiles: 8,
            ..SafetyConfig::default()
        };
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        assert!(!analyzer.check_area_safety(TileCoord::new(6, 6, 5), 5, 5, 5));
        assert!(analyzer.check_area_safety(TileCoord::new(6, 6, 5), 2, 2, 5));
    }

    #[test]
    fn uniform_terrain_prefers_north_on_ties() {
        let terrain = solid(41, 20);
        let cfg = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        let best = analyzer
            .find_safest_direction(TileCoord::new(20, 20, 19))
            .unwrap();
        assert_eq!(best.direction, Direction::North);
        for score in &best.all_scores {
            assert_eq!(score.score, best.score);
        }
    }

    #[test]
    fn safest_direction_is_deterministic() {
        let mut terrain = solid(41, 20);
        terrain.set_liquid(TileCoord::new(20, 15, 17), Some(WATER));
        terrain.set_aquifer(TileCoord::new(24, 20, 16), true);
        let cfg = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        let origin = TileCoord::new(20, 20, 19);
        let first = analyzer.find_safest_direction(origin).unwrap();
        for _ in 0..5 {
            assert_eq!(analyzer.find_safest_direction(origin).unwrap(), first);
        }
        assert_eq!(first.direction, Direction::South);
    }

    #[test]
    fn flooded_surroundings_yield_no_direction() {
        let mut terrain = solid(41, 20);
        let origin = TileCoord::new(20, 20, 19);
        for dir in Direction::ALL {
            for step in 1..=20 {
                for depth in 0..4 {
                    terrain.set_liquid(origin.step(dir, step).offset(0, 0, -depth), Some(WATER));
                }
            }
        }
        let cfg = SafetyConfig::default();
        assert!(
            SafetyAnalyzer::new(&terrain, &cfg)
                .find_safest_direction(origin)
                .is_none()
        );
    }

    #[test]
    fn enclosed_level_starts_below_surface() {
        let terrain = solid(41, 40);
        let cfg = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        let surface = 39;
        let z = analyzer.find_enclosed_z_level(TileCoord::new(20, 20, surface), surface, 15, 15);
        assert_eq!(z, surface - 3);
    }

    #[test]
    fn open_shaft_pushes_hub_deeper() {
        let mut terrain = solid(41, 40);
        let surface = 39;
        // A shaft open to the sky through the footprint's centre, 8 levels deep.
        for z in surface - 8..surface {
            terrain.set_material(TileCoord::new(20, 20, z), Material::Open);
        }
        let cfg = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        let z = analyzer.find_enclosed_z_level(TileCoord::new(20, 20, surface), surface, 15, 15);
        assert!(z < surface - 8, "hub at z={z} is inside the shaft");
    }

    #[test]
    fn enclosed_level_falls_back() {
        let mut terrain = solid(21, 30);
        let surface = 29;
        for y in 0..21 {
            for x in 0..21 {
                for z in 0..surface {
                    terrain.set_aquifer(TileCoord::new(x, y, z), true);
                }
            }
        }
        let cfg = SafetyConfig::default();
        let analyzer = SafetyAnalyzer::new(&terrain, &cfg);
        let z = analyzer.find_enclosed_z_level(TileCoord::new(10, 10, surface), surface, 5, 5);
        assert_eq!(z, surface - 10);
    }

    #[test]
    fn footprint_catches_breach_anywhere_in_square() {
        let mut terrain = solid(21, 12);
        let center = TileCoord::new(10, 10, 5);
        let cfg = SafetyConfig::default();
        assert!(SafetyAnalyzer::new(&terrain, &cfg).is_footprint_safe(center, 1));
        terrain.set_material(center.offset(2, 1, 0), Material::Open);
        assert!(!SafetyAnalyzer::new(&terrain, &cfg).is_footprint_safe(center, 1));
    }
}
