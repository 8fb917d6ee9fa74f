// The fortress room graph and its persisted projection.
//
// `FortressGraph` is the structure a plan produces and an expansion appends
// to: rooms keyed by `RoomId` in a `BTreeMap`, corridors (each an explicit
// tile path between two endpoints), vertical stairwells, a per-level index,
// the hub point, and the id counter. Room ids are allocated sequentially by
// the graph and never reused. Nothing is ever removed.
//
// Every corridor endpoint is either an existing room or the hub. `connect`
// refuses anything else. Room-to-room corridors are recorded as symmetric
// adjacency on both rooms.
//
// Lifecycle flags on rooms change only through `mark_zone_created`,
// `mark_furniture_placed`, and the latching `is_room_dug` query.
//
// `PersistedGraph` is the flat, serialisable projection: per room the id,
// kind id and name, origin, dimensions, shape and variant, extensions and
// flag bits; corridor tile lists; stairwells; the hub. Restoring it yields
// identical geometry without re-running generation. BSP trees and A*
// internals are never part of it.
//
// See also: `room.rs` for `Room`, `builder.rs` which fills the graph,
// `planner.rs` which owns a graph per generation.
//
// **Critical constraint: determinism.** `BTreeMap` everywhere; iteration
// order is room id order.

use crate::geometry::Rect;
use crate::room::{Corner, Room, RoomFlags, RoomKind, RoomShape};
use crate::types::{Direction, RoomId, TileCoord};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

/// Fraction (percent) of a room's tiles that must be floor for it to count
/// as dug.
const DUG_THRESHOLD_PERCENT: usize = 80;

/// One end of a corridor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorridorEnd {
    Room(RoomId),
    Hub,
}

/// A dug passage between two endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corridor {
    pub from: CorridorEnd,
    pub to: CorridorEnd,
    pub tiles: Vec<TileCoord>,
}

/// A square vertical shaft of stairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stairwell {
    /// Centre column.
    pub x: i32,
    pub y: i32,
    pub size: i32,
    pub top_z: i32,
    pub bottom_z: i32,
}

impl Stairwell {
    /// Number of levels the shaft spans, inclusive.
    pub fn span(&self) -> i32 {
        self.top_z - self.bottom_z + 1
    }

    pub fn footprint(&self) -> Rect {
        Rect::centered(self.x, self.y, self.size, self.size)
    }
}

/// Failure to restore a persisted graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown room kind id {0}")]
    UnknownRoomKind(u8),
    #[error("unknown room shape {shape:?} with variant {variant:?}")]
    UnknownShape {
        shape: String,
        variant: Option<String>,
    },
    #[error("corridor endpoint {0:?} is not a room in the graph")]
    DanglingCorridor(CorridorEnd),
    #[error("invalid persisted graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The plan's structure: rooms, corridors, stairwells, and the hub.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FortressGraph {
    rooms: BTreeMap<RoomId, Room>,
    corridors: Vec<Corridor>,
    stairwells: Vec<Stairwell>,
    levels: BTreeMap<i32, Vec<RoomId>>,
    next_room_id: u32,
    hub: Option<TileCoord>,
}

impl FortressGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a room with cleared flags and return its fresh id.
    pub fn add_room(
        &mut self,
        kind: RoomKind,
        origin: TileCoord,
        width: i32,
        height: i32,
        shape: RoomShape,
    ) -> RoomId {
        let id = RoomId(self.next_room_id);
        self.next_room_id += 1;
        let mut room = Room::new(id, kind, origin, width, height);
        room.apply_shape(shape);
        self.insert_room(room);
        id
    }

    fn insert_room(&mut self, room: Room) {
        self.levels.entry(room.z()).or_default().push(room.id);
        self.rooms.insert(room.id, room);
    }

    fn end_exists(&self, end: CorridorEnd) -> bool {
        match end {
            CorridorEnd::Room(id) => self.rooms.contains_key(&id),
            CorridorEnd::Hub => self.hub.is_some(),
        }
    }

    /// Record a corridor. Returns `false` (recording nothing) if either
    /// endpoint is not in the graph.
    pub fn connect(&mut self, from: CorridorEnd, to: CorridorEnd, tiles: Vec<TileCoord>) -> bool {
        if !self.end_exists(from) || !self.end_exists(to) {
            log::warn!("refusing corridor {from:?} -> {to:?}: unknown endpoint");
            return false;
        }
        if let (CorridorEnd::Room(a), CorridorEnd::Room(b)) = (from, to) {
            if let Some(room) = self.rooms.get_mut(&a) {
                room.adjacency.insert(b);
            }
            if let Some(room) = self.rooms.get_mut(&b) {
                room.adjacency.insert(a);
            }
        }
        self.corridors.push(Corridor { from, to, tiles });
        true
    }

    pub fn add_stairwell(&mut self, stairwell: Stairwell) {
        self.stairwells.push(stairwell);
    }

    /// Lower the bottom of the stairwell at index `index`.
    pub(crate) fn extend_stairwell(&mut self, index: usize, bottom_z: i32) {
        if let Some(stairwell) = self.stairwells.get_mut(index) {
            stairwell.bottom_z = stairwell.bottom_z.min(bottom_z);
        }
    }

    pub fn set_hub(&mut self, hub: TileCoord) {
        self.hub = Some(hub);
    }

    pub fn hub(&self) -> Option<TileCoord> {
        self.hub
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// All rooms in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn corridors(&self) -> &[Corridor] {
        &self.corridors
    }

    pub fn stairwells(&self) -> &[Stairwell] {
        &self.stairwells
    }

    pub fn rooms_by_type(&self, kind: RoomKind) -> Vec<&Room> {
        self.rooms.values().filter(|r| r.kind == kind).collect()
    }

    pub fn rooms_on_level(&self, z: i32) -> Vec<&Room> {
        self.levels
            .get(&z)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rooms.get(id))
            .collect()
    }

    /// Number of rooms of each kind present.
    pub fn room_counts(&self) -> BTreeMap<RoomKind, u32> {
        let mut counts = BTreeMap::new();
        for room in self.rooms.values() {
            *counts.entry(room.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Deepest level holding a room.
    pub fn lowest_level(&self) -> Option<i32> {
        self.levels.keys().next().copied()
    }

    pub fn mark_zone_created(&mut self, id: RoomId) -> bool {
        match self.rooms.get_mut(&id) {
            Some(room) => {
                room.flags.zone_created = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_furniture_placed(&mut self, id: RoomId) -> bool {
        match self.rooms.get_mut(&id) {
            Some(room) => {
                room.flags.furniture_placed = true;
                true
            }
            None => false,
        }
    }

    /// Whether at least 80% of the room's tiles report floor. Once true,
    /// `dig_complete` latches and later calls skip the tile scan.
    pub fn is_room_dug(&mut self, id: RoomId, is_floor: impl Fn(TileCoord) -> bool) -> bool {
        let Some(room) = self.rooms.get_mut(&id) else {
            return false;
        };
        if room.flags.dig_complete {
            return true;
        }
        let tiles = room.tiles();
        if tiles.is_empty() {
            return false;
        }
        let dug = tiles.iter().filter(|&&t| is_floor(t)).count();
        if dug * 100 >= tiles.len() * DUG_THRESHOLD_PERCENT {
            room.flags.dig_complete = true;
        }
        room.flags.dig_complete
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn to_persisted(&self) -> PersistedGraph {
        PersistedGraph {
            rooms: self.rooms.values().map(PersistedRoom::from_room).collect(),
            corridors: self.corridors.clone(),
            stairwells: self.stairwells.clone(),
            hub: self.hub,
            next_room_id: self.next_room_id,
        }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(&self.to_persisted())?)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        PersistedGraph::from_json(json)?.restore()
    }
}

/// Flat serialisable form of one room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRoom {
    pub id: u32,
    pub kind_id: u8,
    pub kind_name: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
    /// `"rect"`, `"l"` or `"t"`.
    pub shape: String,
    /// Corner for L shapes, side for T shapes.
    pub variant: Option<String>,
    pub extensions: Vec<Rect>,
    pub adjacency: Vec<u32>,
    pub flags: u8,
}

impl PersistedRoom {
    fn from_room(room: &Room) -> Self {
        let (shape, variant) = shape_names(room.shape);
        Self {
            id: room.id.0,
            kind_id: room.kind.id(),
            kind_name: room.kind.name().to_string(),
            x: room.origin.x,
            y: room.origin.y,
            z: room.origin.z,
            width: room.width,
            height: room.height,
            shape: shape.to_string(),
            variant: variant.map(str::to_string),
            extensions: room.extensions.to_vec(),
            adjacency: room.adjacency.iter().map(|id| id.0).collect(),
            flags: room.flags.to_bits(),
        }
    }

    fn restore(&self) -> Result<Room, GraphError> {
        let kind = RoomKind::from_id(self.kind_id).ok_or(GraphError::UnknownRoomKind(self.kind_id))?;
        let shape = parse_shape(&self.shape, self.variant.as_deref()).ok_or_else(|| {
            GraphError::UnknownShape {
                shape: self.shape.clone(),
                variant: self.variant.clone(),
            }
        })?;
        Ok(Room {
            id: RoomId(self.id),
            kind,
            origin: TileCoord::new(self.x, self.y, self.z),
            width: self.width,
            height: self.height,
            shape,
            extensions: SmallVec::from_vec(self.extensions.clone()),
            adjacency: self.adjacency.iter().map(|&id| RoomId(id)).collect(),
            flags: RoomFlags::from_bits(self.flags),
        })
    }
}

fn corner_name(corner: Corner) -> &'static str {
    match corner {
        Corner::NorthEast => "north_east",
        Corner::NorthWest => "north_west",
        Corner::SouthEast => "south_east",
        Corner::SouthWest => "south_west",
    }
}

fn shape_names(shape: RoomShape) -> (&'static str, Option<&'static str>) {
    match shape {
        RoomShape::Rect => ("rect", None),
        RoomShape::L(corner) => ("l", Some(corner_name(corner))),
        RoomShape::T(side) => ("t", Some(side.name())),
    }
}

fn parse_shape(shape: &str, variant: Option<&str>) -> Option<RoomShape> {
    match (shape, variant) {
        ("rect", None) => Some(RoomShape::Rect),
        ("l", Some(v)) => Corner::ALL
            .into_iter()
            .find(|&c| corner_name(c) == v)
            .map(RoomShape::L),
        ("t", Some(v)) => Direction::from_name(v).map(RoomShape::T),
        _ => None,
    }
}

/// Serialisable projection of a `FortressGraph`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub rooms: Vec<PersistedRoom>,
    pub corridors: Vec<Corridor>,
    pub stairwells: Vec<Stairwell>,
    pub hub: Option<TileCoord>,
    pub next_room_id: u32,
}

impl PersistedGraph {
    /// Rebuild the live graph. Fails on unknown kinds or shapes, or a
    /// corridor whose endpoint is missing.
    pub fn restore(&self) -> Result<FortressGraph, GraphError> {
        let mut graph = FortressGraph {
            hub: self.hub,
            stairwells: self.stairwells.clone(),
            ..FortressGraph::default()
        };
        for persisted in &self.rooms {
            graph.insert_room(persisted.restore()?);
        }
        let max_id = graph.rooms.keys().next_back().map_or(0, |id| id.0 + 1);
        graph.next_room_id = self.next_room_id.max(max_id);

        for corridor in &self.corridors {
            for end in [corridor.from, corridor.to] {
                if !graph.end_exists(end) {
                    return Err(GraphError::DanglingCorridor(end));
                }
            }
            graph.corridors.push(corridor.clone());
        }
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }
}
