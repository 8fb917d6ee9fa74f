// Terrain query collaborator and a dense voxel implementation.
//
// The planner never reads raw world data directly. Everything it knows about
// the ground comes through the `TerrainQuery` trait: liquid, aquifers, open
// space versus solid wall, whether a tile is open to the sky, and the map
// bounds. Host worlds implement the trait over their own storage.
//
// `VoxelTerrain` is the reference implementation used by tests, benchmarks,
// and the CLI. It stores a flat `Vec<TerrainCell>` indexed by
// `x + y * width + z * width * height`, giving O(1) reads and writes.
// Out-of-bounds reads return a conservative cell: solid rock that is not
// diggable, so nothing outside the map ever looks like safe, open, or
// excavatable ground. Out-of-bounds writes are no-ops.
//
// See also: `safety.rs` which derives hazard scores from these queries,
// `planner.rs` which holds a `&dyn`-compatible reference to the terrain.
//
// **Critical constraint: determinism.** Queries must be pure functions of
// terrain state. The planner assumes repeated calls return the same answer.

use crate::types::TileCoord;
use serde::{Deserialize, Serialize};

/// Which fluid occupies a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidKind {
    Water,
    Magma,
}

/// Fluid present in a tile. Level runs 1–7; a dry tile reports `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquid {
    pub level: u8,
    pub kind: LiquidKind,
}

/// Read-only view of the world the planner consults.
///
/// Implementations must treat out-of-bounds coordinates sensibly; the
/// analyzer checks `in_bounds` first, but neighbour probes near the edge
/// still reach past it.
pub trait TerrainQuery {
    /// Liquid in the tile, or `None` when dry. A level of 0 counts as dry.
    fn tile_liquid(&self, coord: TileCoord) -> Option<Liquid>;

    fn is_aquifer(&self, coord: TileCoord) -> bool;

    /// Empty, walkable-or-fallable space (air, dug floor, ramps).
    fn is_open_space(&self, coord: TileCoord) -> bool;

    /// Natural or constructed wall.
    fn is_solid_wall(&self, coord: TileCoord) -> bool;

    /// Whether the tile can be dug out. Defaults to any solid wall.
    fn is_diggable(&self, coord: TileCoord) -> bool {
        self.is_solid_wall(coord)
    }

    /// Open to the sky: nothing solid between this tile and the top of the map.
    fn is_outside(&self, coord: TileCoord) -> bool;

    /// `(width, height, depth)`. Valid coordinates are `0..width`,
    /// `0..height`, `0..depth`.
    fn map_bounds(&self) -> (i32, i32, i32);

    fn in_bounds(&self, coord: TileCoord) -> bool {
        let (w, h, d) = self.map_bounds();
        (0..w).contains(&coord.x) && (0..h).contains(&coord.y) && (0..d).contains(&coord.z)
    }
}

// ---------------------------------------------------------------------------
// VoxelTerrain
// ---------------------------------------------------------------------------

/// What a tile is made of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Empty air.
    #[default]
    Open,
    /// Open space with a walkable floor beneath (surface ground, dug tiles).
    Floor,
    Rock,
    Soil,
    /// Player-built wall. Solid, but the planner must not dig it.
    Constructed,
}

impl Material {
    pub const fn is_solid(self) -> bool {
        matches!(self, Material::Rock | Material::Soil | Material::Constructed)
    }

    pub const fn is_diggable(self) -> bool {
        matches!(self, Material::Rock | Material::Soil)
    }
}

/// One tile of `VoxelTerrain`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainCell {
    pub material: Material,
    pub liquid: Option<Liquid>,
    pub aquifer: bool,
}

impl TerrainCell {
    /// What out-of-bounds reads see.
    const BOUNDARY: TerrainCell = TerrainCell {
        material: Material::Constructed,
        liquid: None,
        aquifer: false,
    };
}

/// Dense 3D terrain grid.
#[derive(Clone, Debug, Default)]
pub struct VoxelTerrain {
    /// Flat storage: index = x + y * width + z * width * height.
    cells: Vec<TerrainCell>,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl VoxelTerrain {
    /// Create a terrain filled with open air.
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        let total = (width.max(0) as usize) * (height.max(0) as usize) * (depth.max(0) as usize);
        Self {
            cells: vec![TerrainCell::default(); total],
            width,
            height,
            depth,
        }
    }

    /// Rock below `surface_z`, walkable floor at `surface_z`, open air above.
    pub fn with_surface(width: i32, height: i32, depth: i32, surface_z: i32) -> Self {
        let mut terrain = Self::new(width, height, depth);
        for z in 0..depth {
            let material = match z.cmp(&surface_z) {
                std::cmp::Ordering::Less => Material::Rock,
                std::cmp::Ordering::Equal => Material::Floor,
                std::cmp::Ordering::Greater => Material::Open,
            };
            for y in 0..height {
                for x in 0..width {
                    terrain.set_material(TileCoord::new(x, y, z), material);
                }
            }
        }
        terrain
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            let w = self.width as usize;
            let h = self.height as usize;
            Some(coord.x as usize + coord.y as usize * w + coord.z as usize * w * h)
        } else {
            None
        }
    }

    /// Read a cell. Out-of-bounds coordinates see an undiggable boundary.
    pub fn get(&self, coord: TileCoord) -> TerrainCell {
        self.index(coord)
            .map(|i| self.cells[i])
            .unwrap_or(TerrainCell::BOUNDARY)
    }

    fn cell_mut(&mut self, coord: TileCoord) -> Option<&mut TerrainCell> {
        self.index(coord).map(|i| &mut self.cells[i])
    }

    pub fn set_material(&mut self, coord: TileCoord, material: Material) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.material = material;
        }
    }

    /// Flood a tile. Passing `None` (or level 0) dries it.
    pub fn set_liquid(&mut self, coord: TileCoord, liquid: Option<Liquid>) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.liquid = liquid.filter(|l| l.level > 0);
            if cell.liquid.is_some() && cell.material.is_solid() {
                cell.material = Material::Open;
            }
        }
    }

    pub fn set_aquifer(&mut self, coord: TileCoord, aquifer: bool) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.aquifer = aquifer;
        }
    }

    /// Whether the tile has been dug out to a walkable floor.
    pub fn is_floor(&self, coord: TileCoord) -> bool {
        self.get(coord).material == Material::Floor
    }

    /// Mark every tile of an operation list as dug. Used to simulate the
    /// excavation collaborator in tests and the CLI.
    pub fn dig_all(&mut self, coords: impl IntoIterator<Item = TileCoord>) {
        for coord in coords {
            if self.get(coord).material.is_diggable() {
                self.set_material(coord, Material::Floor);
            }
        }
    }
}

impl TerrainQuery for VoxelTerrain {
    fn tile_liquid(&self, coord: TileCoord) -> Option<Liquid> {
        self.get(coord).liquid.filter(|l| l.level > 0)
    }

    fn is_aquifer(&self, coord: TileCoord) -> bool {
        self.get(coord).aquifer
    }

    fn is_open_space(&self, coord: TileCoord) -> bool {
        !self.get(coord).material.is_solid()
    }

    fn is_solid_wall(&self, coord: TileCoord) -> bool {
        self.get(coord).material.is_solid()
    }

    fn is_diggable(&self, coord: TileCoord) -> bool {
        self.get(coord).material.is_diggable()
    }

    fn is_outside(&self, coord: TileCoord) -> bool {
        if !self.in_bounds(coord) || self.is_solid_wall(coord) {
            return false;
        }
        (coord.z + 1..self.depth).all(|z| !self.is_solid_wall(coord.with_z(z)))
    }

    fn map_bounds(&self) -> (i32, i32, i32) {
        (self.width, self.height, self.depth)
    }
}
