// Data-driven planner configuration.
//
// All tunable planning parameters live here in `PlannerConfig`, loadable
// from JSON. The planner never uses magic numbers; it reads from the config.
// This allows layout and hazard tuning without recompilation.
//
// Parameters are grouped into nested sections, each `#[serde(default)]` so a
// JSON file only needs to name the values it overrides:
// - `SafetyConfig`:    tile scoring penalties, scan distances and sweep caps.
// - `PathConfig`:      A* explored-node cap and descent cost/heuristic weights.
// - `LayoutConfig`:    entry/hub offsets, depot and stairwell sizes, the
//                      fixed room template, shape embellishment odds.
// - `ExpansionConfig`: BSP region, depth and leaf size for expansion rounds.
// - `catalog`:         the room-type catalog (see `catalog.rs`).
//
// See also: `planner.rs` which owns a `&PlannerConfig` for the duration of a
// generation or expansion call, `safety.rs` which reads `SafetyConfig`.
//
// **Critical constraint: determinism.** Config values feed directly into
// planning. Identical terrain, config, and seed must yield identical plans.

use crate::catalog::{RoomTypeSpec, default_catalog};
use crate::room::RoomKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Safety
// ---------------------------------------------------------------------------

/// Hazard scoring and sweep limits for `SafetyAnalyzer`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Tiles scoring below this are unsafe.
    pub safe_threshold: u8,
    pub aquifer_penalty: u8,
    /// Applied once per face-adjacent water tile.
    pub adjacent_water_penalty: u8,
    /// Applied once per face-adjacent magma tile.
    pub adjacent_magma_penalty: u8,
    pub map_edge_penalty: u8,
    /// Tiles closer than this to the x/y map edge take `map_edge_penalty`.
    pub map_edge_margin: i32,
    /// How far `find_safest_direction` looks along each direction.
    pub direction_scan_distance: i32,
    /// Hard cap on any single direction scan.
    pub max_scan_distance: i32,
    /// Number of levels sampled per direction step (0, −1, …).
    pub direction_scan_depths: i32,
    /// A scan whose endpoint lies this close to the map edge takes
    /// `boundary_penalty`.
    pub boundary_margin: i32,
    pub boundary_penalty: f32,
    /// `find_safest_direction` returns nothing below this score.
    pub min_direction_score: f32,
    /// Levels searched upward when deciding whether a tile is enclosed.
    pub enclosure_probe_levels: i32,
    /// The enclosed-level scan starts this many levels below the surface.
    pub enclosed_scan_start_offset: i32,
    /// The enclosed-level scan gives up after this many levels.
    pub enclosed_scan_depth: i32,
    /// Hub depth below the surface when no enclosed level is found.
    pub enclosed_fallback_offset: i32,
    /// Areas with more sampled tiles than this are rejected outright.
    pub max_sweep_tiles: usize,
    /// Half-width of the ramp footprint checked by the descent search.
    pub footprint_radius: i32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            safe_threshold: 70,
            aquifer_penalty: 50,
            adjacent_water_penalty: 20,
            adjacent_magma_penalty: 30,
            map_edge_penalty: 20,
            map_edge_margin: 3,
            direction_scan_distance: 20,
            max_scan_distance: 64,
            direction_scan_depths: 4,
            boundary_margin: 5,
            boundary_penalty: 25.0,
            min_direction_score: 30.0,
            enclosure_probe_levels: 10,
            enclosed_scan_start_offset: 3,
            enclosed_scan_depth: 40,
            enclosed_fallback_offset: 10,
            max_sweep_tiles: 4096,
            footprint_radius: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Pathfinding
// ---------------------------------------------------------------------------

/// Descent search parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// A* gives up after expanding this many nodes.
    pub max_explored_nodes: usize,
    /// Target descent below the surface for the entry ramp.
    pub descent_levels: i32,
    pub horizontal_cost: f32,
    /// Cost of a horizontal-and-down step. Higher values flatten the ramp.
    pub descent_cost: f32,
    pub vertical_heuristic_weight: f32,
    pub horizontal_heuristic_weight: f32,
    /// Width of the carved ramp, perpendicular to travel.
    pub ramp_width: i32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_explored_nodes: 20_000,
            descent_levels: 20,
            horizontal_cost: 1.0,
            descent_cost: 1.5,
            vertical_heuristic_weight: 2.0,
            horizontal_heuristic_weight: 1.0,
            ramp_width: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// One fixed room of the initial template, positioned relative to the hub.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRoom {
    pub kind: RoomKind,
    /// Room centre offset from the hub centre.
    pub dx: i32,
    pub dy: i32,
    pub width: i32,
    pub height: i32,
}

impl TemplateRoom {
    pub const fn new(kind: RoomKind, dx: i32, dy: i32, width: i32, height: i32) -> Self {
        Self {
            kind,
            dx,
            dy,
            width,
            height,
        }
    }
}

/// The rooms placed on one template level, `z_offset` levels from the hub.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLevel {
    pub z_offset: i32,
    pub rooms: Vec<TemplateRoom>,
}

/// Fixed geometry of the initial plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance from the anchor to the entry point along the chosen direction.
    pub entry_offset: i32,
    /// Distance from the entry point to the hub centre.
    pub hub_offset: i32,
    /// Side of the square footprint probed when choosing the hub level.
    pub hub_footprint: i32,
    pub depot_size: i32,
    pub stairwell_size: i32,
    pub template: Vec<TemplateLevel>,
    /// Rooms at least this wide and tall may get an L or T extension.
    pub shape_min_size: i32,
    pub shape_chance: f64,
    /// Share of shaped rooms that get an L rather than a T.
    pub l_shape_share: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            entry_offset: 10,
            hub_offset: 6,
            hub_footprint: 15,
            depot_size: 5,
            stairwell_size: 3,
            template: default_template(),
            shape_min_size: 5,
            shape_chance: 0.3,
            l_shape_share: 0.6,
        }
    }
}

impl LayoutConfig {
    /// The deepest template offset (≤ 0). The stairwell reaches this level.
    pub fn lowest_template_offset(&self) -> i32 {
        self.template
            .iter()
            .map(|level| level.z_offset)
            .min()
            .unwrap_or(0)
            .min(0)
    }
}

/// Entry level, then four levels of residential, industrial, mixed and deep
/// rooms around the hub.
pub fn default_template() -> Vec<TemplateLevel> {
    use RoomKind::*;
    let ring = |kind: RoomKind, offset: i32, size: i32| {
        vec![
            TemplateRoom::new(kind, offset, 0, size, size),
            TemplateRoom::new(kind, -offset, 0, size, size),
            TemplateRoom::new(kind, 0, offset, size, size),
            TemplateRoom::new(kind, 0, -offset, size, size),
        ]
    };
    vec![
        TemplateLevel {
            z_offset: 0,
            rooms: vec![
                TemplateRoom::new(Stockpile, 0, 6, 5, 5),
                TemplateRoom::new(DiningHall, 7, 0, 7, 5),
                TemplateRoom::new(Well, -5, 0, 3, 3),
                TemplateRoom::new(Workshop, 0, -6, 5, 5),
            ],
        },
        TemplateLevel {
            z_offset: -1,
            rooms: ring(Bedroom, 6, 3),
        },
        TemplateLevel {
            z_offset: -2,
            rooms: ring(Workshop, 6, 5),
        },
        TemplateLevel {
            z_offset: -3,
            rooms: vec![
                TemplateRoom::new(Hospital, 0, 7, 5, 5),
                TemplateRoom::new(Barracks, 7, 0, 7, 5),
                TemplateRoom::new(Stockpile, 0, -7, 5, 5),
                TemplateRoom::new(Tavern, -7, 0, 7, 5),
            ],
        },
        TemplateLevel {
            z_offset: -4,
            rooms: vec![
                TemplateRoom::new(Temple, 0, -7, 7, 7),
                TemplateRoom::new(Tomb, 7, 0, 5, 5),
                TemplateRoom::new(Library, -7, 0, 5, 5),
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// BSP-driven expansion parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Size of the square-ish region partitioned around the hub.
    pub region_width: i32,
    pub region_height: i32,
    pub bsp_max_depth: u32,
    pub bsp_min_leaf: i32,
    /// Leaves are shrunk by this much on every side to leave walls.
    pub room_margin: i32,
    /// Levels probed below the target level for a safe stairwell.
    pub level_probe: i32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            region_width: 30,
            region_height: 30,
            bsp_max_depth: 4,
            bsp_min_leaf: 6,
            room_margin: 1,
            level_probe: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level planner configuration. Loaded from JSON, never mutated during a
/// planning call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub safety: SafetyConfig,
    pub path: PathConfig,
    pub layout: LayoutConfig,
    pub expansion: ExpansionConfig,
    pub catalog: Vec<RoomTypeSpec>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            safety: SafetyConfig::default(),
            path: PathConfig::default(),
            layout: LayoutConfig::default(),
            expansion: ExpansionConfig::default(),
            catalog: default_catalog(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = PlannerConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = PlannerConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "safety": { "safe_threshold": 60 },
            "path": { "max_explored_nodes": 500 },
            "layout": { "entry_offset": 4 }
        }"#;
        let config = PlannerConfig::from_json(json).unwrap();
        assert_eq!(config.safety.safe_threshold, 60);
        assert_eq!(config.safety.aquifer_penalty, 50);
        assert_eq!(config.path.max_explored_nodes, 500);
        assert_eq!(config.path.descent_levels, 20);
        assert_eq!(config.layout.entry_offset, 4);
        assert_eq!(config.layout.template.len(), 5);
        assert_eq!(config.catalog, default_catalog());
    }

    #[test]
    fn bad_json_is_parse_error() {
        let err = PlannerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PlannerConfig::load("/nonexistent/delver/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn template_reaches_four_levels_down() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.lowest_template_offset(), -4);
        let offsets: Vec<i32> = layout.template.iter().map(|l| l.z_offset).collect();
        assert_eq!(offsets, vec![0, -1, -2, -3, -4]);
    }
}
