// Room graph construction: shapes, corridors, and leaf-to-room placement.
//
// `RoomGraphBuilder` turns footprints into rooms in a `FortressGraph`. It
// owns the random choices of layout: whether a room gets an L or T
// extension, which corner or side, and which axis a corridor runs first.
// Everything else (what to build where) comes from the caller.
//
// Shape embellishment: a room whose fitted primary rectangle is at least
// `shape_min_size` on both sides gets an extension with probability
// `shape_chance`; of those, `l_shape_share` are L-shaped (random corner), the
// rest T-shaped (random side). The extension is half the primary's width by
// half its height. The primary is shrunk and pushed away from the extension
// so the pair fits the footprint; if it still does not fit, or the primary
// would drop below the catalog minimum, the room stays a plain rectangle.
//
// Corridors are L-shaped: one axis fully traversed, then the other. The
// tile path is inclusive of both endpoints and 4-connected.
//
// See also: `catalog.rs` for footprint assignment, `graph.rs` for the graph
// being filled, `planner.rs` which drives the builder.

use crate::catalog::{Assignment, RoomTypeSpec, spec_for};
use crate::config::LayoutConfig;
use crate::excavation::ExcavationList;
use crate::geometry::Rect;
use crate::graph::{CorridorEnd, FortressGraph};
use crate::room::{Corner, RoomShape};
use crate::types::{Direction, RoomId, TileCoord};
use rand::Rng;

/// An L-shaped path from `from` to `to` on `from.z`. With
/// `horizontal_first` the x axis is walked first, then y.
pub fn l_corridor(from: TileCoord, to: TileCoord, horizontal_first: bool) -> Vec<TileCoord> {
    let mut tiles = vec![from];
    let mut cur = from;
    let mut walk = |cur: &mut TileCoord, target: i32, x_axis: bool| {
        loop {
            let pos = if x_axis { cur.x } else { cur.y };
            if pos == target {
                break;
            }
            let step = (target - pos).signum();
            *cur = if x_axis {
                cur.offset(step, 0, 0)
            } else {
                cur.offset(0, step, 0)
            };
            tiles.push(*cur);
        }
    };
    if horizontal_first {
        walk(&mut cur, to.x, true);
        walk(&mut cur, to.y, false);
    } else {
        walk(&mut cur, to.y, false);
        walk(&mut cur, to.x, true);
    }
    tiles
}

/// Places rooms and corridors into a graph.
pub struct RoomGraphBuilder<'a> {
    layout: &'a LayoutConfig,
    catalog: &'a [RoomTypeSpec],
}

impl<'a> RoomGraphBuilder<'a> {
    pub fn new(layout: &'a LayoutConfig, catalog: &'a [RoomTypeSpec]) -> Self {
        Self { layout, catalog }
    }

    /// Roll for an embellishment on a `width`×`height` room.
    pub fn pick_shape(&self, width: i32, height: i32, rng: &mut impl Rng) -> RoomShape {
        let min = self.layout.shape_min_size;
        if width < min || height < min || !rng.gen_bool(self.layout.shape_chance.clamp(0.0, 1.0)) {
            return RoomShape::Rect;
        }
        if rng.gen_bool(self.layout.l_shape_share.clamp(0.0, 1.0)) {
            RoomShape::L(Corner::ALL[rng.gen_range(0..Corner::ALL.len())])
        } else {
            RoomShape::T(Direction::ALL[rng.gen_range(0..Direction::ALL.len())])
        }
    }

    /// Fit a room of `spec`'s kind into `footprint`: the primary rectangle
    /// (clipped to the kind's maximum size) and its shape.
    pub fn fit_room(&self, footprint: Rect, spec: &RoomTypeSpec, rng: &mut impl Rng) -> (Rect, RoomShape) {
        let width = footprint.width.min(spec.max_width);
        let height = footprint.height.min(spec.max_height);
        let plain = Rect::new(
            footprint.x + (footprint.width - width) / 2,
            footprint.y + (footprint.height - height) / 2,
            width,
            height,
        );

        let shape = self.pick_shape(width, height, rng);
        if shape == RoomShape::Rect {
            return (plain, shape);
        }
        match fit_shaped(footprint, width, height, shape, spec) {
            Some(primary) => (primary, shape),
            None => (plain, RoomShape::Rect),
        }
    }

    /// Add a room per assignment on level `z`, carve it, and connect the
    /// hub to the first room and each room to the next. Returns the new ids
    /// in placement order.
    pub fn place_assignments(
        &self,
        graph: &mut FortressGraph,
        assignments: &[Assignment],
        z: i32,
        hub: TileCoord,
        tiles: &mut ExcavationList,
        rng: &mut impl Rng,
    ) -> Vec<RoomId> {
        let mut placed = Vec::with_capacity(assignments.len());
        let (mut prev_end, mut prev_tile) = (CorridorEnd::Hub, hub.with_z(z));

        for assignment in assignments {
            let Some(spec) = spec_for(self.catalog, assignment.kind) else {
                log::warn!("no catalog entry for {}; skipping", assignment.kind);
                continue;
            };
            let (primary, shape) = self.fit_room(assignment.footprint, spec, rng);
            let origin = TileCoord::new(primary.x, primary.y, z);
            let id = graph.add_room(assignment.kind, origin, primary.width, primary.height, shape);
            let Some(room) = graph.room(id) else {
                continue;
            };
            tiles.dig_all(room.tiles());
            let center = room.center();
            log::debug!(
                "placed {} {id} at {origin} ({}x{}, {:?})",
                assignment.kind,
                primary.width,
                primary.height,
                shape
            );

            self.connect(graph, prev_end, prev_tile, CorridorEnd::Room(id), center, tiles, rng);
            (prev_end, prev_tile) = (CorridorEnd::Room(id), center);
            placed.push(id);
        }
        placed
    }

    /// Carve an L corridor with a random axis order and record it.
    #[allow(clippy::too_many_arguments)]
    pub fn connect(
        &self,
        graph: &mut FortressGraph,
        from: CorridorEnd,
        from_tile: TileCoord,
        to: CorridorEnd,
        to_tile: TileCoord,
        tiles: &mut ExcavationList,
        rng: &mut impl Rng,
    ) {
        let path = l_corridor(from_tile, to_tile, rng.gen_bool(0.5));
        tiles.dig_all(path.iter().copied());
        graph.connect(from, to, path);
    }
}

/// Primary rectangle for a shaped room inside `footprint`, or `None` if the
/// shape cannot fit without shrinking below the catalog minimum.
fn fit_shaped(
    footprint: Rect,
    max_width: i32,
    max_height: i32,
    shape: RoomShape,
    spec: &RoomTypeSpec,
) -> Option<Rect> {
    // Largest side `s` with `s + max(1, s / 2)` within `limit`.
    let with_extension = |max_side: i32, limit: i32| {
        (1..=max_side).rev().find(|&s| s + (s / 2).max(1) <= limit)
    };

    let (extends_x, toward) = match shape {
        RoomShape::Rect => return Some(footprint),
        RoomShape::L(Corner::NorthEast | Corner::NorthWest) => (false, Direction::North),
        RoomShape::L(Corner::SouthEast | Corner::SouthWest) => (false, Direction::South),
        RoomShape::T(dir @ (Direction::North | Direction::South)) => (false, dir),
        RoomShape::T(dir) => (true, dir),
    };

    let (width, height) = if extends_x {
        (with_extension(max_width, footprint.width)?, max_height)
    } else {
        (max_width, with_extension(max_height, footprint.height)?)
    };
    if width < spec.min_width || height < spec.min_height {
        return None;
    }

    let centred_x = footprint.x + (footprint.width - width) / 2;
    let centred_y = footprint.y + (footprint.height - height) / 2;
    let (x, y) = match toward {
        Direction::North => (centred_x, footprint.bottom() - height),
        Direction::South => (centred_x, footprint.y),
        Direction::East => (footprint.x, centred_y),
        Direction::West => (footprint.right() - width, centred_y),
    };
    let primary = Rect::new(x, y, width, height);
    let extension = shape.extension_rect(primary)?;
    footprint.contains_rect(&extension).then_some(primary)
}
