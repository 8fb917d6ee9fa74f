// Core types shared across the planner.
//
// Defines the tile coordinate (`TileCoord`), cardinal directions, room IDs,
// and the excavation operation vocabulary emitted in a plan. All types derive
// `Serialize` and `Deserialize` so plans and persisted graphs can round-trip
// through JSON.
//
// The coordinate system follows the host world's conventions:
// - X: east  (positive) / west  (negative)
// - Y: south (positive) / north (negative)
// - Z: up    (positive) / down  (negative) — z is the level, deeper is smaller.
//
// **Critical constraint: determinism.** Every type here has a total order so
// it can key a `BTreeMap`/`BTreeSet`. Direction iteration order (N, S, E, W)
// is part of the planner's tie-breaking contract.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A tile position in the 3D world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Return this coordinate shifted by `(dx, dy, dz)`.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Step `distance` tiles along a cardinal direction, same level.
    pub fn step(self, dir: Direction, distance: i32) -> Self {
        let (dx, dy) = dir.offset();
        self.offset(dx * distance, dy * distance, 0)
    }

    /// Same x/y, different level.
    pub const fn with_z(self, z: i32) -> Self {
        Self::new(self.x, self.y, z)
    }

    /// Manhattan distance between two coordinates.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs()
    }

    /// The 6 face-adjacent coordinates (±x, ±y, ±z).
    pub fn face_neighbors(self) -> [TileCoord; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }

    /// The 4 horizontal neighbours, in `Direction::ALL` order.
    pub fn horizontal_neighbors(self) -> [TileCoord; 4] {
        Direction::ALL.map(|dir| self.step(dir, 1))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A cardinal direction on the horizontal plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Fixed evaluation order. Ties in direction scoring keep the earliest.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit `(dx, dy)` for one step in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    /// Lower-case name, as used in logs and CLI arguments.
    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    /// Parse a lower-case direction name (or its initial).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// IDs
// ---------------------------------------------------------------------------

/// Compact identifier for a placed room. Allocated sequentially by
/// `FortressGraph`, never reused within a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Excavation output
// ---------------------------------------------------------------------------

/// A single designation for the excavation collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileOp {
    Dig,
    Channel,
    Ramp,
    StairUp,
    StairDown,
    #[serde(rename = "stair_updown")]
    StairUpDown,
}

/// One entry of a plan's flat operation list. Entries are independently
/// applicable; ramp/channel pairs for the same descending step are ideally
/// applied together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileOperation {
    #[serde(flatten)]
    pub coord: TileCoord,
    pub op: TileOp,
}

impl TileOperation {
    pub const fn new(coord: TileCoord, op: TileOp) -> Self {
        Self { coord, op }
    }
}
