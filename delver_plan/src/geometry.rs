// Axis-aligned rectangles on one level.
//
// `Rect` is the footprint primitive shared by the BSP partitioner, room
// shapes, and area safety checks. Coordinates are inclusive at the origin
// and exclusive at `x + width` / `y + height`; a rect with zero width or
// height is empty.
//
// See also: `bsp.rs` which splits rects, `room.rs` which unions a primary
// rect with its extensions, `safety.rs` which walks rect perimeters.

use crate::types::TileCoord;
use serde::{Deserialize, Serialize};

/// A horizontal rectangle, origin at the north-west corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A `width`×`height` rect whose center tile is `(cx, cy)`. Even sizes
    /// put the extra row/column on the south/east side.
    pub const fn centered(cx: i32, cy: i32, width: i32, height: i32) -> Self {
        Self::new(cx - (width - 1) / 2, cy - (height - 1) / 2, width, height)
    }

    pub const fn area(&self) -> i32 {
        self.width * self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub const fn center(&self) -> (i32, i32) {
        (self.x + (self.width - 1) / 2, self.y + (self.height - 1) / 2)
    }

    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// `true` if `other` lies entirely inside this rect.
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub const fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The overlap of two rects, if any.
    pub fn clip(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let clipped = Rect::new(
            x,
            y,
            self.right().min(other.right()) - x,
            self.bottom().min(other.bottom()) - y,
        );
        (!clipped.is_empty()).then_some(clipped)
    }

    /// Shrink by `margin` on every side. Returns `None` if nothing is left.
    pub fn inset(&self, margin: i32) -> Option<Rect> {
        let inner = Rect::new(
            self.x + margin,
            self.y + margin,
            self.width - 2 * margin,
            self.height - 2 * margin,
        );
        (!inner.is_empty()).then_some(inner)
    }

    /// The four corner tiles (NW, NE, SW, SE). Degenerate rects repeat tiles.
    pub fn corners(&self) -> [(i32, i32); 4] {
        let (x1, y1) = (self.right() - 1, self.bottom() - 1);
        [(self.x, self.y), (x1, self.y), (self.x, y1), (x1, y1)]
    }

    /// All tiles of the rect at level `z`, row-major.
    pub fn tiles(&self, z: i32) -> impl Iterator<Item = TileCoord> + '_ {
        (self.y..self.bottom())
            .flat_map(move |y| (self.x..self.right()).map(move |x| TileCoord::new(x, y, z)))
    }

    /// Perimeter tiles at level `z`, each exactly once, clockwise from the
    /// north-west corner.
    pub fn perimeter(&self, z: i32) -> Vec<TileCoord> {
        if self.is_empty() {
            return Vec::new();
        }
        let (x1, y1) = (self.right() - 1, self.bottom() - 1);
        let mut out = Vec::with_capacity(self.perimeter_len());
        for x in self.x..=x1 {
            out.push(TileCoord::new(x, self.y, z));
        }
        for y in self.y + 1..=y1 {
            out.push(TileCoord::new(x1, y, z));
        }
        if y1 > self.y {
            for x in (self.x..x1).rev() {
                out.push(TileCoord::new(x, y1, z));
            }
        }
        if x1 > self.x {
            for y in (self.y + 1..y1).rev() {
                out.push(TileCoord::new(self.x, y, z));
            }
        }
        out
    }

    /// Number of distinct perimeter tiles.
    pub const fn perimeter_len(&self) -> usize {
        if self.is_empty() {
            0
        } else if self.width == 1 || self.height == 1 {
            self.area() as usize
        } else {
            (2 * (self.width + self.height) - 4) as usize
        }
    }
}
