// Placed rooms and their shapes.
//
// A `Room` is a primary rectangle on one level plus up to two extension
// rectangles produced by shape embellishment (an L at a corner or a T on a
// side). Extensions are stored separately from the primary rectangle;
// `Room::tiles()` unions them with duplicates suppressed, so a room's area
// is primary + extensions − overlap.
//
// Lifecycle flags start false. `dig_complete` is latched by
// `FortressGraph::is_room_dug`; the other two are set only through the
// graph's `mark_zone_created` / `mark_furniture_placed` mutators.
//
// See also: `catalog.rs` for per-kind size and demand rules, `graph.rs`
// which owns rooms by `RoomId`, `builder.rs` which picks shapes.

use crate::geometry::Rect;
use crate::types::{Direction, RoomId, TileCoord};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// What a room is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    TradeDepot,
    Corridor,
    Stairwell,
    DiningHall,
    Bedroom,
    Stockpile,
    Workshop,
    Well,
    Hospital,
    Barracks,
    Tavern,
    Temple,
    Library,
    Tomb,
}

impl RoomKind {
    pub const ALL: [RoomKind; 14] = [
        RoomKind::TradeDepot,
        RoomKind::Corridor,
        RoomKind::Stairwell,
        RoomKind::DiningHall,
        RoomKind::Bedroom,
        RoomKind::Stockpile,
        RoomKind::Workshop,
        RoomKind::Well,
        RoomKind::Hospital,
        RoomKind::Barracks,
        RoomKind::Tavern,
        RoomKind::Temple,
        RoomKind::Library,
        RoomKind::Tomb,
    ];

    /// Stable numeric id used by the persisted projection.
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            RoomKind::TradeDepot => "trade_depot",
            RoomKind::Corridor => "corridor",
            RoomKind::Stairwell => "stairwell",
            RoomKind::DiningHall => "dining_hall",
            RoomKind::Bedroom => "bedroom",
            RoomKind::Stockpile => "stockpile",
            RoomKind::Workshop => "workshop",
            RoomKind::Well => "well",
            RoomKind::Hospital => "hospital",
            RoomKind::Barracks => "barracks",
            RoomKind::Tavern => "tavern",
            RoomKind::Temple => "temple",
            RoomKind::Library => "library",
            RoomKind::Tomb => "tomb",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A corner of a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::NorthEast,
        Corner::NorthWest,
        Corner::SouthEast,
        Corner::SouthWest,
    ];
}

/// Outline of a room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomShape {
    #[default]
    Rect,
    /// Extension off the given corner, flush with its east/west edge.
    L(Corner),
    /// Extension centred on the given side.
    T(Direction),
}

impl RoomShape {
    /// The extension rectangle this shape attaches to `primary`: half its
    /// width by half its height (at least 1×1). `None` for plain rects.
    pub fn extension_rect(self, primary: Rect) -> Option<Rect> {
        let ew = (primary.width / 2).max(1);
        let eh = (primary.height / 2).max(1);
        let (x0, y0, w, h) = (primary.x, primary.y, primary.width, primary.height);
        let rect = match self {
            RoomShape::Rect => return None,
            RoomShape::L(corner) => {
                let x = match corner {
                    Corner::NorthEast | Corner::SouthEast => x0 + w - ew,
                    Corner::NorthWest | Corner::SouthWest => x0,
                };
                let y = match corner {
                    Corner::NorthEast | Corner::NorthWest => y0 - eh,
                    Corner::SouthEast | Corner::SouthWest => y0 + h,
                };
                Rect::new(x, y, ew, eh)
            }
            RoomShape::T(side) => match side {
                Direction::North => Rect::new(x0 + (w - ew) / 2, y0 - eh, ew, eh),
                Direction::South => Rect::new(x0 + (w - ew) / 2, y0 + h, ew, eh),
                Direction::East => Rect::new(x0 + w, y0 + (h - eh) / 2, ew, eh),
                Direction::West => Rect::new(x0 - ew, y0 + (h - eh) / 2, ew, eh),
            },
        };
        Some(rect)
    }
}

/// Lifecycle flags, all false when a room is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomFlags {
    pub dig_complete: bool,
    pub zone_created: bool,
    pub furniture_placed: bool,
}

impl RoomFlags {
    const DIG_COMPLETE: u8 = 1 << 0;
    const ZONE_CREATED: u8 = 1 << 1;
    const FURNITURE_PLACED: u8 = 1 << 2;

    pub fn to_bits(self) -> u8 {
        let mut bits = 0;
        if self.dig_complete {
            bits |= Self::DIG_COMPLETE;
        }
        if self.zone_created {
            bits |= Self::ZONE_CREATED;
        }
        if self.furniture_placed {
            bits |= Self::FURNITURE_PLACED;
        }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            dig_complete: bits & Self::DIG_COMPLETE != 0,
            zone_created: bits & Self::ZONE_CREATED != 0,
            furniture_placed: bits & Self::FURNITURE_PLACED != 0,
        }
    }
}

/// A placed room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    /// North-west corner of the primary rectangle; `origin.z` is the level.
    pub origin: TileCoord,
    pub width: i32,
    pub height: i32,
    pub shape: RoomShape,
    pub extensions: SmallVec<[Rect; 2]>,
    pub adjacency: BTreeSet<RoomId>,
    pub flags: RoomFlags,
}

impl Room {
    /// A plain rectangular room with no extensions and cleared flags.
    pub fn new(id: RoomId, kind: RoomKind, origin: TileCoord, width: i32, height: i32) -> Self {
        Self {
            id,
            kind,
            origin,
            width,
            height,
            shape: RoomShape::Rect,
            extensions: SmallVec::new(),
            adjacency: BTreeSet::new(),
            flags: RoomFlags::default(),
        }
    }

    pub fn z(&self) -> i32 {
        self.origin.z
    }

    pub fn primary(&self) -> Rect {
        Rect::new(self.origin.x, self.origin.y, self.width, self.height)
    }

    /// Centre tile of the primary rectangle.
    pub fn center(&self) -> TileCoord {
        let (x, y) = self.primary().center();
        TileCoord::new(x, y, self.z())
    }

    /// Attach `shape`'s extension. Replaces any previous shape.
    pub fn apply_shape(&mut self, shape: RoomShape) {
        self.shape = shape;
        self.extensions.clear();
        if let Some(ext) = shape.extension_rect(self.primary()) {
            self.extensions.push(ext);
        }
    }

    /// Every tile of the room: primary rectangle first, then extension tiles
    /// not already covered.
    pub fn tiles(&self) -> Vec<TileCoord> {
        let z = self.z();
        let mut seen = BTreeSet::new();
        std::iter::once(self.primary())
            .chain(self.extensions.iter().copied())
            .flat_map(|rect| rect.tiles(z).collect::<Vec<_>>())
            .filter(|tile| seen.insert(*tile))
            .collect()
    }

    pub fn area(&self) -> usize {
        self.tiles().len()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.primary().contains(x, y) || self.extensions.iter().any(|r| r.contains(x, y))
    }
}
