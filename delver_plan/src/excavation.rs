// Ordered, de-duplicated excavation operation list.
//
// Plans accumulate tile operations from many sources (ramp, depot,
// corridors, stairwell, rooms) that overlap where they meet. The list keeps
// first-insertion order and holds at most one operation per coordinate.
// When a plain `Dig` and a structural operation (ramp, channel, stairs)
// land on the same tile, the structural one wins and takes the `Dig`'s
// slot. A `Channel` likewise replaces a `Ramp`, so a ramp that turns keeps
// the opening above its next step. Any other repeat is dropped.
//
// See also: `planner.rs` which builds one list per generation or expansion
// call, `types.rs` for `TileOperation`.

use crate::geometry::Rect;
use crate::types::{TileCoord, TileOp, TileOperation};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct ExcavationList {
    ops: Vec<TileOperation>,
    /// Coordinate -> index into `ops`.
    index: FxHashMap<TileCoord, usize>,
}

impl ExcavationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Add one operation. Returns `true` if the list changed.
    pub fn push(&mut self, coord: TileCoord, op: TileOp) -> bool {
        match self.index.get(&coord) {
            Some(&i) => {
                if replaces(self.ops[i].op, op) {
                    self.ops[i].op = op;
                    true
                } else {
                    false
                }
            }
            None => {
                self.index.insert(coord, self.ops.len());
                self.ops.push(TileOperation::new(coord, op));
                true
            }
        }
    }

    /// Dig every tile in `coords`.
    pub fn dig_all(&mut self, coords: impl IntoIterator<Item = TileCoord>) {
        for coord in coords {
            self.push(coord, TileOp::Dig);
        }
    }

    /// Dig a whole rectangle on level `z`.
    pub fn carve_rect(&mut self, rect: Rect, z: i32) {
        self.dig_all(rect.tiles(z));
    }

    pub fn op_at(&self, coord: TileCoord) -> Option<TileOp> {
        self.index.get(&coord).map(|&i| self.ops[i].op)
    }

    pub fn into_vec(self) -> Vec<TileOperation> {
        self.ops
    }
}

fn replaces(existing: TileOp, new: TileOp) -> bool {
    match existing {
        TileOp::Dig => new != TileOp::Dig,
        TileOp::Ramp => new == TileOp::Channel,
        _ => false,
    }
}
